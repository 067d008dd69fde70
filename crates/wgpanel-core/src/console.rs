// ── Console facade ──
//
// One panel connection plus the preference store that remembers how the
// operator last looked at it. Reads refresh a small interface cache and
// prune view state for entities that no longer exist; mutations are
// forwarded verbatim and never applied locally before the panel agrees.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use wgpanel_api::transport::{TlsMode, TransportConfig};
use wgpanel_api::ApiClient;

use crate::config::{ConsoleConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{
    Client, Interface, InterfaceStateSnapshot, InterfaceTree, Server, ServerNode,
};
use crate::prefs::{FixedScope, PreferenceStore};
use crate::sort::sort_clients;
use crate::traffic::StatePoller;

/// One page of a server's client list.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientPage {
    pub clients: Vec<Client>,
    /// 1-based, clamped to `1..=pages`.
    pub page: u32,
    pub pages: u32,
    pub total: usize,
}

// ── Console ──────────────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable; clones share the connection, cache and preferences.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    config: ConsoleConfig,
    prefs: PreferenceStore,
    api: RwLock<Option<ApiClient>>,
    interfaces: RwLock<Vec<Interface>>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("url", &self.inner.config.url.as_str())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Console {
    pub fn new(config: ConsoleConfig, prefs: PreferenceStore) -> Self {
        Self {
            inner: Arc::new(ConsoleInner {
                config,
                prefs,
                api: RwLock::new(None),
                interfaces: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn prefs(&self) -> &PreferenceStore {
        &self.inner.prefs
    }

    pub fn is_connected(&self) -> bool {
        self.inner
            .api
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Build the HTTP client, log in when credentials are configured and
    /// initialize preferences under the panel's scope.
    ///
    /// Preference initialization never fails the connection; without a
    /// resolvable scope the store keeps buffering.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
            cookie_jar: None,
        };
        let api = ApiClient::new(config.url.clone(), &transport)?;

        if let Some(credentials) = &config.credentials {
            api.login(&credentials.username, &credentials.password)
                .await?;
            debug!(user = %credentials.username, "session authentication successful");
        }

        let initialized = match &config.panel_id {
            Some(panel_id) => {
                self.inner
                    .prefs
                    .initialize(&FixedScope::new(panel_id.clone()))
                    .await
            }
            None => self.inner.prefs.initialize(&api).await,
        };
        if !initialized {
            debug!("preferences not initialized; changes stay in memory");
        }

        *self.inner.api.write().unwrap_or_else(PoisonError::into_inner) = Some(api);
        info!(url = %config.url, "connected to panel");
        Ok(())
    }

    /// End the session. Logout failures are logged, not returned.
    pub async fn disconnect(&self) {
        let api = self
            .inner
            .api
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let (Some(api), Some(_)) = (api, &self.inner.config.credentials) {
            if let Err(e) = api.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }
        debug!("disconnected");
    }

    /// The connected API client.
    pub fn api(&self) -> Result<ApiClient, CoreError> {
        self.inner
            .api
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| CoreError::ConnectionFailed {
                url: self.inner.config.url.to_string(),
                reason: "console is not connected".into(),
            })
    }

    /// State poller bound to this connection, in the persisted display mode.
    pub fn state_poller(&self) -> Result<StatePoller, CoreError> {
        Ok(StatePoller::new(
            self.api()?,
            self.inner.prefs.traffic_display_mode(),
        ))
    }

    // ── Interfaces ───────────────────────────────────────────────────

    /// Fetch interfaces, prune view state of deleted ones and repair the
    /// selection (saved id when still present, else the first interface).
    ///
    /// On failure the cache is emptied rather than left stale.
    pub async fn load_interfaces(&self) -> Result<Vec<Interface>, CoreError> {
        let fetched = match self.api()?.list_interfaces().await {
            Ok(list) => list,
            Err(e) => {
                self.write_interfaces().clear();
                return Err(e.into());
            }
        };

        let interfaces = {
            let mut cache = self.write_interfaces();
            let stamped: Vec<Interface> = fetched
                .into_iter()
                .map(|mut iface| {
                    iface.last_modified = cache
                        .iter()
                        .find(|c| c.id == iface.id)
                        .and_then(|c| c.last_modified);
                    iface
                })
                .collect();
            cache.clone_from(&stamped);
            stamped
        };
        debug!(count = interfaces.len(), "interfaces loaded");

        let prefs = &self.inner.prefs;
        let live: Vec<&str> = interfaces.iter().map(|i| i.id.as_str()).collect();
        if prefs.cleanup_all_ui_state_for_deleted_interfaces(&live) {
            debug!("pruned view state of deleted interfaces");
        }

        let saved = prefs.selected_interface_id();
        let selected = saved
            .clone()
            .filter(|id| live.contains(&id.as_str()))
            .or_else(|| interfaces.first().map(|i| i.id.clone()));
        if selected != saved {
            prefs.set_selected_interface_id(selected.as_deref());
        }

        Ok(interfaces)
    }

    /// Interfaces as of the last successful [`load_interfaces`](Self::load_interfaces).
    pub fn interfaces(&self) -> Vec<Interface> {
        self.inner
            .interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn selected_interface_id(&self) -> Option<String> {
        self.inner.prefs.selected_interface_id()
    }

    /// Persist `interface_id` as the selection. Rejected when the cache is
    /// loaded and does not contain it.
    pub fn select_interface(&self, interface_id: &str) -> Result<(), CoreError> {
        let cache = self.interfaces();
        if !cache.is_empty() && !cache.iter().any(|i| i.id == interface_id) {
            return Err(CoreError::NotFound {
                entity_type: "Interface".into(),
                identifier: interface_id.into(),
            });
        }
        self.inner.prefs.set_selected_interface_id(Some(interface_id));
        Ok(())
    }

    pub async fn get_interface(&self, interface_id: &str) -> Result<Interface, CoreError> {
        Ok(self.api()?.get_interface(interface_id).await?)
    }

    pub async fn create_interface(
        &self,
        body: &(impl Serialize + Sync),
    ) -> Result<Interface, CoreError> {
        let mut created = self
            .api()?
            .create_interface(body)
            .await
            .map_err(mutation)?;
        created.last_modified = Some(Utc::now());
        self.write_interfaces().push(created.clone());
        Ok(created)
    }

    pub async fn update_interface(
        &self,
        interface_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Interface, CoreError> {
        let mut updated = self
            .api()?
            .update_interface(interface_id, body)
            .await
            .map_err(mutation)?;
        updated.last_modified = Some(Utc::now());
        let mut cache = self.write_interfaces();
        if let Some(slot) = cache.iter_mut().find(|i| i.id == updated.id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete_interface(&self, interface_id: &str) -> Result<(), CoreError> {
        self.api()?
            .delete_interface(interface_id)
            .await
            .map_err(mutation)?;

        let remaining: Vec<String> = {
            let mut cache = self.write_interfaces();
            cache.retain(|i| i.id != interface_id);
            cache.iter().map(|i| i.id.clone()).collect()
        };
        let live: Vec<&str> = remaining.iter().map(String::as_str).collect();
        self.inner
            .prefs
            .cleanup_all_ui_state_for_deleted_interfaces(&live);
        Ok(())
    }

    pub async fn set_interface_enabled(
        &self,
        interface_id: &str,
        enabled: bool,
    ) -> Result<(), CoreError> {
        self.api()?
            .set_interface_enabled(interface_id, enabled)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(())
    }

    // ── Servers and clients ──────────────────────────────────────────

    /// Servers of `interface_id` with their clients.
    ///
    /// Client listings run concurrently; one that fails leaves that server
    /// empty. A failed server listing fails the whole load. Afterwards,
    /// view state of vanished servers and clients is pruned.
    pub async fn load_interface_tree(&self, interface_id: &str) -> Result<InterfaceTree, CoreError> {
        let api = self.api()?;
        let servers = api.list_servers(interface_id).await?;

        let listings = servers.iter().map(|server| {
            let api = &api;
            async move {
                match api.list_clients(interface_id, &server.id).await {
                    Ok(clients) => clients,
                    Err(e) => {
                        warn!(
                            interface = interface_id,
                            server = %server.id,
                            error = %e,
                            "client listing failed"
                        );
                        Vec::new()
                    }
                }
            }
        });
        let client_lists = join_all(listings).await;

        let tree = InterfaceTree {
            interface_id: interface_id.to_owned(),
            servers: servers
                .into_iter()
                .zip(client_lists)
                .map(|(server, clients)| ServerNode { server, clients })
                .collect(),
        };
        self.prune_tree_state(&tree);
        Ok(tree)
    }

    fn prune_tree_state(&self, tree: &InterfaceTree) {
        let prefs = &self.inner.prefs;
        let server_ids = tree.server_ids();
        let live_servers: Vec<&str> = server_ids.iter().map(String::as_str).collect();
        let live_clients: BTreeMap<String, BTreeSet<String>> = tree
            .servers
            .iter()
            .map(|node| {
                let ids = node.clients.iter().map(|c| c.id.clone()).collect();
                (node.server.id.clone(), ids)
            })
            .collect();

        let pruned = [
            prefs.cleanup_collapsed_servers(&tree.interface_id, &live_servers),
            prefs.cleanup_server_pages(&tree.interface_id, &live_servers),
            prefs.cleanup_expanded_clients(&tree.interface_id, &live_clients),
        ];
        if pruned.contains(&true) {
            debug!(interface = %tree.interface_id, "pruned stale view state");
        }
    }

    pub async fn get_server(&self, interface_id: &str, server_id: &str) -> Result<Server, CoreError> {
        Ok(self.api()?.get_server(interface_id, server_id).await?)
    }

    pub async fn create_server(
        &self,
        interface_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Server, CoreError> {
        let server = self
            .api()?
            .create_server(interface_id, body)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(server)
    }

    pub async fn update_server(
        &self,
        interface_id: &str,
        server_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Server, CoreError> {
        let server = self
            .api()?
            .update_server(interface_id, server_id, body)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(server)
    }

    pub async fn delete_server(&self, interface_id: &str, server_id: &str) -> Result<(), CoreError> {
        self.api()?
            .delete_server(interface_id, server_id)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(())
    }

    pub async fn set_server_enabled(
        &self,
        interface_id: &str,
        server_id: &str,
        enabled: bool,
    ) -> Result<(), CoreError> {
        self.api()?
            .set_server_enabled(interface_id, server_id, enabled)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(())
    }

    /// Re-home a server; both interfaces are stamped.
    pub async fn move_server(
        &self,
        interface_id: &str,
        server_id: &str,
        new_interface_id: &str,
    ) -> Result<(), CoreError> {
        self.api()?
            .move_server(interface_id, server_id, new_interface_id)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        self.touch(new_interface_id);
        Ok(())
    }

    pub async fn list_clients(
        &self,
        interface_id: &str,
        server_id: &str,
    ) -> Result<Vec<Client>, CoreError> {
        Ok(self.api()?.list_clients(interface_id, server_id).await?)
    }

    pub async fn get_client(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
    ) -> Result<Client, CoreError> {
        Ok(self
            .api()?
            .get_client(interface_id, server_id, client_id)
            .await?)
    }

    pub async fn create_client(
        &self,
        interface_id: &str,
        server_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Client, CoreError> {
        let client = self
            .api()?
            .create_client(interface_id, server_id, body)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(client)
    }

    pub async fn update_client(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Client, CoreError> {
        let client = self
            .api()?
            .update_client(interface_id, server_id, client_id, body)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(client)
    }

    pub async fn delete_client(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
    ) -> Result<(), CoreError> {
        self.api()?
            .delete_client(interface_id, server_id, client_id)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(())
    }

    pub async fn set_client_enabled(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
        enabled: bool,
    ) -> Result<(), CoreError> {
        self.api()?
            .set_client_enabled(interface_id, server_id, client_id, enabled)
            .await
            .map_err(mutation)?;
        self.touch(interface_id);
        Ok(())
    }

    // ── Ordering and paging ──────────────────────────────────────────

    /// `clients` in the persisted sort order, using `snapshot` for the
    /// handshake and traffic keys.
    pub fn sorted_clients(
        &self,
        clients: &[Client],
        snapshot: Option<&InterfaceStateSnapshot>,
    ) -> Vec<Client> {
        let empty = std::collections::HashMap::new();
        let states = snapshot.map_or(&empty, |s| &s.state);
        sort_clients(clients, states, &self.inner.prefs.sort_order())
    }

    /// The persisted page of `clients` for one server, with the persisted
    /// page size. An out-of-range saved page is clamped, not rewritten.
    pub fn page_of(&self, interface_id: &str, server_id: &str, clients: &[Client]) -> ClientPage {
        let prefs = &self.inner.prefs;
        let total = clients.len();
        let Some(size) = prefs.clients_per_page().limit().filter(|n| *n > 0) else {
            return ClientPage {
                clients: clients.to_vec(),
                page: 1,
                pages: 1,
                total,
            };
        };

        let pages = u32::try_from(total.div_ceil(size).max(1)).unwrap_or(u32::MAX);
        let page = prefs.server_page(interface_id, server_id).clamp(1, pages);
        let start = usize::try_from(page - 1).unwrap_or(0).saturating_mul(size);
        ClientPage {
            clients: clients.iter().skip(start).take(size).cloned().collect(),
            page,
            pages,
            total,
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn write_interfaces(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Interface>> {
        self.inner
            .interfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stamp the cached interface so views keyed on it refetch.
    fn touch(&self, interface_id: &str) {
        if let Some(iface) = self
            .write_interfaces()
            .iter_mut()
            .find(|i| i.id == interface_id)
        {
            iface.last_modified = Some(Utc::now());
        }
    }
}

fn mutation(err: wgpanel_api::Error) -> CoreError {
    CoreError::from(err).into_mutation()
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
