// ── Persisted view state ──
//
// A nested tree keyed by interface id, then server id. Only non-default
// values are stored: collapsed servers (servers default to expanded),
// expanded clients (clients default to collapsed) and pages other than 1.
// Emptied parents are pruned so the tree stays bounded by live entities.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// Current layout version of [`UiState`].
///
/// Version 1 (unversioned) stored `collapsedServers` and `serverPages`
/// flat by server id and `expandedClients` under composite
/// `"{interface}_{server}_{client}"` keys.
pub const UI_STATE_VERSION: u32 = 2;

// ── FlagSet ─────────────────────────────────────────────────────────

/// Set of ids persisted as `{"id": true}`. `false` entries are ignored
/// on read and never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet(BTreeSet<String>);

impl FlagSet {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: &str) -> bool {
        self.0.insert(id.to_owned())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Drop ids not in `live`; returns whether anything was removed.
    fn retain_live(&mut self, live: &BTreeSet<&str>) -> bool {
        let before = self.0.len();
        self.0.retain(|id| live.contains(id.as_str()));
        self.0.len() != before
    }
}

impl FromIterator<String> for FlagSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for FlagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|id| (id, true)))
    }
}

impl<'de> Deserialize<'de> for FlagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, bool>::deserialize(deserializer)?;
        Ok(map.into_iter().filter(|(_, on)| *on).map(|(id, _)| id).collect())
    }
}

// ── UiState ─────────────────────────────────────────────────────────

/// Persisted view state for every interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    #[serde(default)]
    pub selected_interface_id: Option<String>,
    /// interface → collapsed server ids.
    #[serde(default)]
    pub collapsed_servers: BTreeMap<String, FlagSet>,
    /// interface → server → expanded client ids.
    #[serde(default)]
    pub expanded_clients: BTreeMap<String, BTreeMap<String, FlagSet>>,
    /// interface → server → page (> 1).
    #[serde(default)]
    pub server_pages: BTreeMap<String, BTreeMap<String, u32>>,
}

impl UiState {
    /// Rebuild a state read under an older layout version.
    ///
    /// Only `selectedInterfaceId` carries over; the flat and composite-key
    /// maps of version 1 cannot be attributed to an interface reliably.
    pub fn migrate(value: &serde_json::Value, from_version: u32) -> Self {
        if from_version >= UI_STATE_VERSION {
            return serde_json::from_value(value.clone()).unwrap_or_default();
        }
        debug!(from_version, "discarding legacy ui state layout");
        Self {
            selected_interface_id: value
                .get("selectedInterfaceId")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            ..Self::default()
        }
    }

    /// `true` when nothing but defaults remain.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    // ── Servers ─────────────────────────────────────────────────────

    pub fn is_server_collapsed(&self, interface_id: &str, server_id: &str) -> bool {
        self.collapsed_servers
            .get(interface_id)
            .is_some_and(|set| set.contains(server_id))
    }

    pub fn collapsed_servers(&self, interface_id: &str) -> BTreeSet<String> {
        self.collapsed_servers
            .get(interface_id)
            .map(|set| set.ids().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Returns whether the tree changed.
    pub fn set_server_collapsed(
        &mut self,
        interface_id: &str,
        server_id: &str,
        collapsed: bool,
    ) -> bool {
        if collapsed {
            return self
                .collapsed_servers
                .entry(interface_id.to_owned())
                .or_default()
                .insert(server_id);
        }
        let Some(set) = self.collapsed_servers.get_mut(interface_id) else {
            return false;
        };
        let changed = set.remove(server_id);
        if set.is_empty() {
            self.collapsed_servers.remove(interface_id);
        }
        changed
    }

    // ── Clients ─────────────────────────────────────────────────────

    pub fn is_client_expanded(&self, interface_id: &str, server_id: &str, client_id: &str) -> bool {
        self.expanded_clients
            .get(interface_id)
            .and_then(|servers| servers.get(server_id))
            .is_some_and(|set| set.contains(client_id))
    }

    pub fn expanded_clients(&self, interface_id: &str, server_id: &str) -> BTreeSet<String> {
        self.expanded_clients
            .get(interface_id)
            .and_then(|servers| servers.get(server_id))
            .map(|set| set.ids().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn set_client_expanded(
        &mut self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
        expanded: bool,
    ) -> bool {
        if expanded {
            return self
                .expanded_clients
                .entry(interface_id.to_owned())
                .or_default()
                .entry(server_id.to_owned())
                .or_default()
                .insert(client_id);
        }
        let Some(servers) = self.expanded_clients.get_mut(interface_id) else {
            return false;
        };
        let Some(set) = servers.get_mut(server_id) else {
            return false;
        };
        let changed = set.remove(client_id);
        if set.is_empty() {
            servers.remove(server_id);
        }
        if servers.is_empty() {
            self.expanded_clients.remove(interface_id);
        }
        changed
    }

    // ── Pages ───────────────────────────────────────────────────────

    /// 1-based page, 1 when unset.
    pub fn server_page(&self, interface_id: &str, server_id: &str) -> u32 {
        self.server_pages
            .get(interface_id)
            .and_then(|pages| pages.get(server_id))
            .copied()
            .unwrap_or(1)
    }

    /// Pages ≤ 1 remove the entry.
    pub fn set_server_page(&mut self, interface_id: &str, server_id: &str, page: u32) -> bool {
        if page > 1 {
            let pages = self.server_pages.entry(interface_id.to_owned()).or_default();
            return pages.insert(server_id.to_owned(), page) != Some(page);
        }
        let Some(pages) = self.server_pages.get_mut(interface_id) else {
            return false;
        };
        let changed = pages.remove(server_id).is_some();
        if pages.is_empty() {
            self.server_pages.remove(interface_id);
        }
        changed
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    //
    // Every cleanup is a no-op for an empty live list: an empty fetch is
    // indistinguishable from a fetch that has not landed yet.

    /// Forget collapsed flags of servers no longer under `interface_id`.
    pub fn cleanup_collapsed_servers<'a, I>(&mut self, interface_id: &str, live_servers: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: BTreeSet<&str> = live_servers.into_iter().collect();
        if live.is_empty() {
            return false;
        }
        let Some(set) = self.collapsed_servers.get_mut(interface_id) else {
            return false;
        };
        let changed = set.retain_live(&live);
        if set.is_empty() {
            self.collapsed_servers.remove(interface_id);
        }
        changed
    }

    /// Forget expanded flags of deleted servers and clients.
    ///
    /// `live` maps each live server to its live client ids. A server whose
    /// client list is empty keeps its flags (its clients may not be loaded).
    pub fn cleanup_expanded_clients(
        &mut self,
        interface_id: &str,
        live: &BTreeMap<String, BTreeSet<String>>,
    ) -> bool {
        if live.is_empty() {
            return false;
        }
        let Some(servers) = self.expanded_clients.get_mut(interface_id) else {
            return false;
        };

        let before = servers.clone();
        servers.retain(|server_id, set| match live.get(server_id) {
            None => false,
            Some(clients) if clients.is_empty() => true,
            Some(clients) => {
                let live_clients: BTreeSet<&str> = clients.iter().map(String::as_str).collect();
                set.retain_live(&live_clients);
                !set.is_empty()
            }
        });
        let changed = *servers != before;
        if servers.is_empty() {
            self.expanded_clients.remove(interface_id);
        }
        changed
    }

    /// Forget page numbers of servers no longer under `interface_id`.
    pub fn cleanup_server_pages<'a, I>(&mut self, interface_id: &str, live_servers: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: BTreeSet<&str> = live_servers.into_iter().collect();
        if live.is_empty() {
            return false;
        }
        let Some(pages) = self.server_pages.get_mut(interface_id) else {
            return false;
        };
        let before = pages.len();
        pages.retain(|server_id, _| live.contains(server_id.as_str()));
        let changed = pages.len() != before;
        if pages.is_empty() {
            self.server_pages.remove(interface_id);
        }
        changed
    }

    /// Drop every subtree of a deleted interface, and the selection if it
    /// points at one.
    pub fn cleanup_deleted_interfaces<'a, I>(&mut self, live_interfaces: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: BTreeSet<&str> = live_interfaces.into_iter().collect();
        if live.is_empty() {
            return false;
        }

        let mut changed = false;
        let prune = |ids: Vec<String>| {
            ids.into_iter()
                .filter(|id| !live.contains(id.as_str()))
                .collect::<Vec<_>>()
        };

        for id in prune(self.collapsed_servers.keys().cloned().collect()) {
            self.collapsed_servers.remove(&id);
            changed = true;
        }
        for id in prune(self.expanded_clients.keys().cloned().collect()) {
            self.expanded_clients.remove(&id);
            changed = true;
        }
        for id in prune(self.server_pages.keys().cloned().collect()) {
            self.server_pages.remove(&id);
            changed = true;
        }
        if self
            .selected_interface_id
            .as_deref()
            .is_some_and(|id| !live.contains(id))
        {
            self.selected_interface_id = None;
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn live(pairs: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        pairs
            .iter()
            .map(|(s, cs)| ((*s).to_owned(), cs.iter().map(|c| (*c).to_owned()).collect()))
            .collect()
    }

    #[test]
    fn setting_defaults_back_leaves_empty_tree() {
        let mut state = UiState::default();
        assert!(state.set_server_collapsed("if1", "s1", true));
        assert!(state.set_client_expanded("if1", "s1", "c1", true));
        assert!(state.set_server_page("if1", "s1", 3));
        assert!(!state.is_default());

        assert!(state.set_server_collapsed("if1", "s1", false));
        assert!(state.set_client_expanded("if1", "s1", "c1", false));
        assert!(state.set_server_page("if1", "s1", 1));
        assert!(state.is_default());
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "selectedInterfaceId": null,
                "collapsedServers": {},
                "expandedClients": {},
                "serverPages": {}
            })
        );
    }

    #[test]
    fn redundant_writes_report_no_change() {
        let mut state = UiState::default();
        assert!(!state.set_server_collapsed("if1", "s1", false));
        assert!(state.set_server_page("if1", "s1", 2));
        assert!(!state.set_server_page("if1", "s1", 2));
        assert!(!state.set_client_expanded("if1", "s1", "c1", false));
    }

    #[test]
    fn flag_set_wire_form() {
        let state: UiState = serde_json::from_value(json!({
            "selectedInterfaceId": "if1",
            "collapsedServers": {"if1": {"s1": true, "s2": false}},
            "expandedClients": {"if1": {"s1": {"c1": true}}},
            "serverPages": {"if1": {"s1": 2}}
        }))
        .unwrap();

        assert!(state.is_server_collapsed("if1", "s1"));
        assert!(!state.is_server_collapsed("if1", "s2"));
        assert!(state.is_client_expanded("if1", "s1", "c1"));
        assert_eq!(state.server_page("if1", "s1"), 2);
        assert_eq!(state.server_page("if1", "s9"), 1);

        let back: UiState = serde_json::from_value(serde_json::to_value(&state).unwrap()).unwrap();
        assert_eq!(back, state);
        assert_eq!(
            serde_json::to_value(&state).unwrap()["collapsedServers"],
            json!({"if1": {"s1": true}})
        );
    }

    #[test]
    fn cleanups_ignore_empty_live_lists() {
        let mut state = UiState::default();
        state.set_server_collapsed("if1", "s1", true);
        state.set_client_expanded("if1", "s1", "c1", true);
        state.set_server_page("if1", "s1", 2);
        state.selected_interface_id = Some("if1".into());
        let before = state.clone();

        assert!(!state.cleanup_collapsed_servers("if1", std::iter::empty()));
        assert!(!state.cleanup_expanded_clients("if1", &BTreeMap::new()));
        assert!(!state.cleanup_server_pages("if1", std::iter::empty()));
        assert!(!state.cleanup_deleted_interfaces(std::iter::empty()));
        assert_eq!(state, before);
    }

    #[test]
    fn cleanups_prune_deleted_entities() {
        let mut state = UiState::default();
        state.set_server_collapsed("if1", "s1", true);
        state.set_server_collapsed("if1", "gone", true);
        state.set_server_page("if1", "gone", 4);
        state.set_client_expanded("if1", "s1", "c1", true);
        state.set_client_expanded("if1", "s1", "c-gone", true);
        state.set_client_expanded("if1", "gone", "c9", true);

        assert!(state.cleanup_collapsed_servers("if1", ["s1"]));
        assert!(state.cleanup_server_pages("if1", ["s1"]));
        assert!(state.cleanup_expanded_clients("if1", &live(&[("s1", &["c1"])])));

        assert_eq!(state.collapsed_servers("if1"), BTreeSet::from(["s1".to_string()]));
        assert!(state.server_pages.is_empty());
        assert_eq!(state.expanded_clients("if1", "s1"), BTreeSet::from(["c1".to_string()]));
        assert!(state.expanded_clients("if1", "gone").is_empty());

        assert!(!state.cleanup_collapsed_servers("if1", ["s1"]));
    }

    #[test]
    fn server_with_unloaded_clients_keeps_flags() {
        let mut state = UiState::default();
        state.set_client_expanded("if1", "s1", "c1", true);
        assert!(!state.cleanup_expanded_clients("if1", &live(&[("s1", &[])])));
        assert!(state.is_client_expanded("if1", "s1", "c1"));
    }

    #[test]
    fn deleted_interface_drops_subtrees_and_selection() {
        let mut state = UiState::default();
        state.selected_interface_id = Some("gone".into());
        state.set_server_collapsed("gone", "s1", true);
        state.set_server_collapsed("if1", "s1", true);
        state.set_client_expanded("gone", "s1", "c1", true);
        state.set_server_page("gone", "s1", 2);

        assert!(state.cleanup_deleted_interfaces(["if1"]));
        assert!(state.selected_interface_id.is_none());
        assert!(state.is_server_collapsed("if1", "s1"));
        assert!(!state.collapsed_servers.contains_key("gone"));
        assert!(state.expanded_clients.is_empty());
        assert!(state.server_pages.is_empty());
    }

    #[test]
    fn legacy_layout_keeps_only_selection() {
        let legacy = json!({
            "selectedInterfaceId": "if1",
            "collapsedServers": {"s1": true},
            "expandedClients": {"if1_s1_c1": true},
            "serverPages": {"s1": 3}
        });
        let migrated = UiState::migrate(&legacy, 1);
        assert_eq!(migrated.selected_interface_id.as_deref(), Some("if1"));
        assert!(migrated.collapsed_servers.is_empty());
        assert!(migrated.expanded_clients.is_empty());
        assert!(migrated.server_pages.is_empty());

        let current = json!({"serverPages": {"if1": {"s1": 3}}});
        assert_eq!(UiState::migrate(&current, UI_STATE_VERSION).server_page("if1", "s1"), 3);
    }
}
