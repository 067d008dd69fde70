// Service endpoints
//
// Panel-wide configuration and the SNAT roaming offset validator.

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{OffsetCheck, OffsetCheckRequest, ServiceConfig};

impl ApiClient {
    /// `GET /service/config`
    pub async fn service_config(&self) -> Result<ServiceConfig, Error> {
        let url = self.url(&["service", "config"])?;
        self.get(url).await
    }

    /// `GET /service/snatroamingoffsetvalid`
    ///
    /// A rejected offset comes back as [`Error::Api`] with status 400;
    /// [`Error::invalid_param`] names the offending field.
    pub async fn check_snat_roaming_offset(
        &self,
        request: &OffsetCheckRequest,
    ) -> Result<OffsetCheck, Error> {
        let url = self.url(&["service", "snatroamingoffsetvalid"])?;
        self.get_with_query(url, request).await
    }
}
