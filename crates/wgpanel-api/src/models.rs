// Wire types for the panel REST API.
//
// Field names follow the panel's camelCase JSON. Key material and NAT
// settings are carried through untouched; the panel owns their meaning.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ── Go encoding quirks ──────────────────────────────────────────────

/// `null` reads as the default. The panel writes nil slices and maps as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `""` and `null` read as `None`. An unset address family is sent as `""`.
fn empty_ip_as_none<'de, D>(deserializer: D) -> Result<Option<IpAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) if !text.trim().is_empty() => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

// ── Interface ───────────────────────────────────────────────────────

/// A WireGuard interface managed by the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    pub id: String,
    pub ifname: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub mtu: u32,
    #[serde(default)]
    pub vrf_name: Option<String>,
    #[serde(default)]
    pub fw_mark: Option<String>,
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Local cache-busting stamp, bumped after any mutation under this
    /// interface. Never sent to or read from the panel.
    #[serde(skip)]
    pub last_modified: Option<DateTime<Utc>>,
}

fn enabled_by_default() -> bool {
    true
}

// ── Server ──────────────────────────────────────────────────────────

/// SNAT / NETMAP settings for one address family of a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnatConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub snat_ip_net: Option<String>,
    #[serde(default)]
    pub snat_excluded_network: Option<String>,
    #[serde(default)]
    pub roaming_master_interface: Option<String>,
    #[serde(default)]
    pub roaming_pseudo_bridge: bool,
}

/// Per-address-family network settings of a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub pseudo_bridge_master_interface: Option<String>,
    #[serde(default)]
    pub snat: Option<SnatConfig>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub routed_networks: Vec<String>,
    #[serde(default)]
    pub routed_networks_firewall: bool,
    #[serde(default)]
    pub comment_string: String,
}

/// A VPN server bound to one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dns: Vec<String>,
    #[serde(default)]
    pub ipv4: Option<NetworkConfig>,
    #[serde(default)]
    pub ipv6: Option<NetworkConfig>,
}

impl Server {
    /// Enabled networks, comma-joined (`"10.0.0.1/24, fd00::1/64"`).
    pub fn network_display(&self) -> String {
        [self.ipv4.as_ref(), self.ipv6.as_ref()]
            .into_iter()
            .flatten()
            .filter(|n| n.enabled)
            .filter_map(|n| n.network.as_deref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// A VPN peer bound to one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "empty_ip_as_none")]
    pub ip: Option<IpAddr>,
    #[serde(default, deserialize_with = "empty_ip_as_none")]
    pub ipv6: Option<IpAddr>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dns: Vec<String>,
    #[serde(default)]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preshared_key: Option<String>,
    #[serde(default)]
    pub keepalive: Option<u32>,
}

/// Live WireGuard counters for one peer.
///
/// The panel reports zero counters and a never-seen handshake as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    #[serde(default)]
    pub latest_handshake: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transfer_tx: Option<u64>,
    #[serde(default)]
    pub transfer_rx: Option<u64>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ClientState {
    /// `rx + tx`, counting missing counters as zero.
    pub fn total_traffic(&self) -> u64 {
        self.transfer_rx
            .unwrap_or(0)
            .saturating_add(self.transfer_tx.unwrap_or(0))
    }
}

/// One poll of every peer under an interface.
///
/// `timestamp` is the panel's clock at sampling time and is the only
/// valid "now" for handshake freshness and rate computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStateSnapshot {
    /// Client id → state.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: HashMap<String, ClientState>,
    pub timestamp: DateTime<Utc>,
}

// ── Service ─────────────────────────────────────────────────────────

/// `GET /service/config` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default)]
    pub wireguard_config_path: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, rename = "listenIP")]
    pub listen_ip: String,
    #[serde(default)]
    pub listen_port: u16,
    #[serde(default)]
    pub site_url_prefix: String,
    #[serde(default)]
    pub api_prefix: String,
    #[serde(default)]
    pub wg_if_prefix: String,
    /// Scope identity for client-side preferences.
    #[serde(default, rename = "panelID")]
    pub panel_id: Option<String>,
    #[serde(default, rename = "WGPanelTitle")]
    pub title: Option<String>,
}

/// Query for the SNAT roaming offset validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsetCheckRequest {
    /// Master interface the mapped network lives on.
    pub ifname: String,
    pub netmapsrc: String,
    pub offset: String,
    pub vrf: String,
    /// Address family, `4` or `6`.
    pub af: u8,
}

/// Successful answer of the SNAT roaming offset validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetCheck {
    /// `"SNAT"` or `"NETMAP"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "src network", default)]
    pub src_network: String,
    #[serde(rename = "mapped network", default)]
    pub mapped_network: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn interface_last_modified_never_serialized() {
        let mut iface: Interface = serde_json::from_value(json!({
            "id": "if1",
            "ifname": "wg0",
            "endpoint": "vpn.example.com",
            "port": 51820,
            "mtu": 1420,
            "vrfName": null,
            "fwMark": "0x10",
            "publicKey": "pk"
        }))
        .unwrap();
        assert!(iface.enabled);
        iface.last_modified = Some(Utc::now());
        let out = serde_json::to_value(&iface).unwrap();
        assert!(out.get("lastModified").is_none());
        assert_eq!(out["fwMark"], "0x10");
    }

    #[test]
    fn client_state_nulls_parse_as_none() {
        let state: ClientState = serde_json::from_value(json!({
            "latestHandshake": null,
            "endpoint": null,
            "transferRx": 2048,
            "transferTx": null
        }))
        .unwrap();
        assert!(state.latest_handshake.is_none());
        assert_eq!(state.total_traffic(), 2048);
    }

    #[test]
    fn server_network_display_skips_disabled_families() {
        let server: Server = serde_json::from_value(json!({
            "id": "s1",
            "name": "office",
            "enabled": true,
            "dns": ["1.1.1.1"],
            "ipv4": {"enabled": true, "network": "10.0.0.1/24"},
            "ipv6": {"enabled": false, "network": "fd00::1/64"}
        }))
        .unwrap();
        assert_eq!(server.network_display(), "10.0.0.1/24");
    }

    #[test]
    fn client_with_unset_family_and_nil_dns_parses() {
        let client: Client = serde_json::from_value(json!({
            "id": "c1",
            "name": "laptop",
            "enabled": true,
            "ip": "10.0.0.2",
            "ipv6": "",
            "dns": null,
            "publicKey": "pk",
            "keepalive": null
        }))
        .unwrap();
        assert_eq!(client.ip, Some("10.0.0.2".parse().unwrap()));
        assert!(client.ipv6.is_none());
        assert!(client.dns.is_empty());
    }

    #[test]
    fn malformed_client_address_is_rejected() {
        let parsed = serde_json::from_value::<Client>(json!({
            "id": "c1",
            "name": "laptop",
            "ip": "not-an-ip",
            "publicKey": "pk"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn server_nil_lists_parse_as_empty() {
        let server: Server = serde_json::from_value(json!({
            "id": "s1",
            "name": "office",
            "enabled": true,
            "dns": null,
            "ipv4": {
                "enabled": true,
                "network": "10.0.0.1/24",
                "snat": null,
                "routedNetworks": null,
                "routedNetworksFirewall": false,
                "commentString": ""
            },
            "ipv6": null
        }))
        .unwrap();
        assert!(server.dns.is_empty());
        assert!(server.ipv4.unwrap().routed_networks.is_empty());
    }

    #[test]
    fn snapshot_with_null_state_is_empty() {
        let snapshot: InterfaceStateSnapshot = serde_json::from_value(json!({
            "state": null,
            "timestamp": "2024-05-01T12:00:00Z"
        }))
        .unwrap();
        assert!(snapshot.state.is_empty());
    }

    #[test]
    fn service_config_reads_panel_id() {
        let cfg: ServiceConfig = serde_json::from_value(json!({
            "wireguardConfigPath": "/etc/wireguard",
            "user": "admin",
            "listenIP": "0.0.0.0",
            "listenPort": 5000,
            "siteUrlPrefix": "/",
            "apiPrefix": "/api",
            "panelID": "abc123",
            "wgIfPrefix": "wg-"
        }))
        .unwrap();
        assert_eq!(cfg.panel_id.as_deref(), Some("abc123"));
        assert_eq!(cfg.listen_ip, "0.0.0.0");
    }
}
