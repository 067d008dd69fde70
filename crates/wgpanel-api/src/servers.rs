// Server endpoints
//
// Servers are scoped to an interface: `/interfaces/{ifId}/servers/...`.

use serde::Serialize;
use serde_json::json;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::Server;

impl ApiClient {
    /// `GET /interfaces/{ifId}/servers`
    pub async fn list_servers(&self, interface_id: &str) -> Result<Vec<Server>, Error> {
        let url = self.url(&["interfaces", interface_id, "servers"])?;
        self.get(url).await
    }

    /// `GET /interfaces/{ifId}/servers/{id}`
    pub async fn get_server(&self, interface_id: &str, server_id: &str) -> Result<Server, Error> {
        let url = self.url(&["interfaces", interface_id, "servers", server_id])?;
        self.get(url).await
    }

    /// `POST /interfaces/{ifId}/servers`
    pub async fn create_server(
        &self,
        interface_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Server, Error> {
        let url = self.url(&["interfaces", interface_id, "servers"])?;
        self.post(url, body).await
    }

    /// `PUT /interfaces/{ifId}/servers/{id}`
    pub async fn update_server(
        &self,
        interface_id: &str,
        server_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Server, Error> {
        let url = self.url(&["interfaces", interface_id, "servers", server_id])?;
        self.put(url, body).await
    }

    /// `DELETE /interfaces/{ifId}/servers/{id}`
    pub async fn delete_server(&self, interface_id: &str, server_id: &str) -> Result<(), Error> {
        let url = self.url(&["interfaces", interface_id, "servers", server_id])?;
        self.delete(url).await
    }

    /// `POST /interfaces/{ifId}/servers/{id}/set-enable`
    pub async fn set_server_enabled(
        &self,
        interface_id: &str,
        server_id: &str,
        enabled: bool,
    ) -> Result<(), Error> {
        let url = self.url(&["interfaces", interface_id, "servers", server_id, "set-enable"])?;
        self.post_no_response(url, &json!({ "enabled": enabled }))
            .await
    }

    /// `POST /interfaces/{ifId}/servers/{id}/move`
    ///
    /// Re-homes the server (and its clients) under another interface.
    pub async fn move_server(
        &self,
        interface_id: &str,
        server_id: &str,
        new_interface_id: &str,
    ) -> Result<(), Error> {
        let url = self.url(&["interfaces", interface_id, "servers", server_id, "move"])?;
        self.post_no_response(url, &json!({ "newInterfaceId": new_interface_id }))
            .await
    }
}
