// Interface endpoints
//
// CRUD and enable/disable for top-level WireGuard interfaces.

use serde::Serialize;
use serde_json::json;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::Interface;

impl ApiClient {
    /// `GET /interfaces`
    pub async fn list_interfaces(&self) -> Result<Vec<Interface>, Error> {
        let url = self.url(&["interfaces"])?;
        self.get(url).await
    }

    /// `GET /interfaces/{id}`
    pub async fn get_interface(&self, interface_id: &str) -> Result<Interface, Error> {
        let url = self.url(&["interfaces", interface_id])?;
        self.get(url).await
    }

    /// `POST /interfaces`
    ///
    /// The body is forwarded as-is; the panel validates it and answers
    /// with the stored interface.
    pub async fn create_interface(
        &self,
        body: &(impl Serialize + Sync),
    ) -> Result<Interface, Error> {
        let url = self.url(&["interfaces"])?;
        self.post(url, body).await
    }

    /// `PUT /interfaces/{id}`
    pub async fn update_interface(
        &self,
        interface_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Interface, Error> {
        let url = self.url(&["interfaces", interface_id])?;
        self.put(url, body).await
    }

    /// `DELETE /interfaces/{id}`
    pub async fn delete_interface(&self, interface_id: &str) -> Result<(), Error> {
        let url = self.url(&["interfaces", interface_id])?;
        self.delete(url).await
    }

    /// `POST /interfaces/{id}/set-enable`
    pub async fn set_interface_enabled(
        &self,
        interface_id: &str,
        enabled: bool,
    ) -> Result<(), Error> {
        let url = self.url(&["interfaces", interface_id, "set-enable"])?;
        self.post_no_response(url, &json!({ "enabled": enabled }))
            .await
    }
}
