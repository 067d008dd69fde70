// Session authentication
//
// Cookie-based login/logout. The login endpoint sets a session cookie in
// the client's jar; every later request carries it automatically.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;

impl ApiClient {
    /// `POST /service/login`
    ///
    /// Bad credentials come back as [`Error::Authentication`].
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.url(&["service", "login"])?;
        debug!(username, "logging in");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });
        self.post_no_response(url, &body).await?;

        debug!("login successful");
        Ok(())
    }

    /// `POST /service/logout`
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.url(&["service", "logout"])?;
        debug!("logging out");
        self.post_no_response(url, &json!({})).await
    }

    /// `PUT /service/password`
    pub async fn change_password(
        &self,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<(), Error> {
        let url = self.url(&["service", "password"])?;
        let body = json!({
            "currentPassword": current.expose_secret(),
            "newPassword": new.expose_secret(),
        });
        self.put_no_response(url, &body).await
    }
}
