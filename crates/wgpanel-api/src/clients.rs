// Client endpoints
//
// Clients hang off a server: `/interfaces/{ifId}/servers/{srvId}/clients/...`.
// Live counters come either per client (`.../state`) or for a whole
// interface in one round trip (`/interfaces/{ifId}/clients-state`).

use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Client, ClientState, InterfaceStateSnapshot};

impl ApiClient {
    fn clients_url(&self, interface_id: &str, server_id: &str, rest: &[&str]) -> Result<Url, Error> {
        let mut segments = vec!["interfaces", interface_id, "servers", server_id, "clients"];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    /// `GET /interfaces/{ifId}/servers/{srvId}/clients`
    pub async fn list_clients(
        &self,
        interface_id: &str,
        server_id: &str,
    ) -> Result<Vec<Client>, Error> {
        let url = self.clients_url(interface_id, server_id, &[])?;
        self.get(url).await
    }

    /// `GET .../clients/{id}`
    pub async fn get_client(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
    ) -> Result<Client, Error> {
        let url = self.clients_url(interface_id, server_id, &[client_id])?;
        self.get(url).await
    }

    /// `POST .../clients`
    pub async fn create_client(
        &self,
        interface_id: &str,
        server_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Client, Error> {
        let url = self.clients_url(interface_id, server_id, &[])?;
        self.post(url, body).await
    }

    /// `PUT .../clients/{id}`
    pub async fn update_client(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Client, Error> {
        let url = self.clients_url(interface_id, server_id, &[client_id])?;
        self.put(url, body).await
    }

    /// `DELETE .../clients/{id}`
    pub async fn delete_client(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
    ) -> Result<(), Error> {
        let url = self.clients_url(interface_id, server_id, &[client_id])?;
        self.delete(url).await
    }

    /// `POST .../clients/{id}/set-enable`
    pub async fn set_client_enabled(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
        enabled: bool,
    ) -> Result<(), Error> {
        let url = self.clients_url(interface_id, server_id, &[client_id, "set-enable"])?;
        self.post_no_response(url, &json!({ "enabled": enabled }))
            .await
    }

    /// `GET .../clients/{id}/state`
    pub async fn client_state(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
    ) -> Result<ClientState, Error> {
        let url = self.clients_url(interface_id, server_id, &[client_id, "state"])?;
        self.get(url).await
    }

    /// `GET .../clients/{id}/config`
    ///
    /// Returns the rendered WireGuard config file (`text/plain`).
    pub async fn client_config(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
    ) -> Result<String, Error> {
        let url = self.clients_url(interface_id, server_id, &[client_id, "config"])?;
        self.get_text(url).await
    }

    /// `GET /interfaces/{ifId}/clients-state`
    ///
    /// Counters for every client under the interface, stamped with the
    /// panel's clock.
    ///
    /// Needs a panel that serves this route. Panels that only expose the
    /// per-client [`client_state`](Self::client_state) answer 404 here, and
    /// every poll against them counts as a telemetry failure.
    pub async fn interface_clients_state(
        &self,
        interface_id: &str,
    ) -> Result<InterfaceStateSnapshot, Error> {
        let url = self.url(&["interfaces", interface_id, "clients-state"])?;
        self.get(url).await
    }
}
