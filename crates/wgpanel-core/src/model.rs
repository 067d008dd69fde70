// ── Domain model ──
//
// The panel's wire types are already the right shape for the console, so
// they are re-exported as-is. `ServerNode` is the one local addition: a
// server together with its clients, as loaded for one interface view.

pub use wgpanel_api::{
    Client, ClientState, Interface, InterfaceStateSnapshot, NetworkConfig, OffsetCheck,
    OffsetCheckRequest, Server, ServiceConfig, SnatConfig,
};

/// A server and the clients listed under it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerNode {
    pub server: Server,
    pub clients: Vec<Client>,
}

/// Servers (with clients) of one interface, in panel order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceTree {
    pub interface_id: String,
    pub servers: Vec<ServerNode>,
}

impl InterfaceTree {
    pub fn server(&self, server_id: &str) -> Option<&ServerNode> {
        self.servers.iter().find(|n| n.server.id == server_id)
    }

    /// Live server ids, for pruning per-server UI state.
    pub fn server_ids(&self) -> Vec<String> {
        self.servers.iter().map(|n| n.server.id.clone()).collect()
    }
}
