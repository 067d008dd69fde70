// ── Client ordering ──
//
// Multi-key, direction-aware, stable ordering of a server's clients,
// driven by the persisted sort order (`["name-a", "lastHandshake-d", ...]`).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::model::{Client, ClientState};

/// Maximum number of keys kept in a [`SortOrder`].
pub const MAX_SORT_KEYS: usize = 4;

/// A field clients can be ordered by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum SortMethod {
    /// Case-insensitive name.
    Name,
    /// Handshake time; "never" sorts as oldest.
    LastHandshake,
    /// `rx + tx` bytes.
    TotalTraffic,
    /// Disabled before enabled.
    Enabled,
}

impl SortMethod {
    /// Label for menus and table headers.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::LastHandshake => "Last Handshake",
            Self::TotalTraffic => "Total Traffic",
            Self::Enabled => "Enabled",
        }
    }

    /// Natural (ascending) comparison of two clients on this field.
    fn compare(
        self,
        a: &Client,
        b: &Client,
        states: &HashMap<String, ClientState>,
    ) -> Ordering {
        match self {
            Self::Name => compare_names(&a.name, &b.name),
            Self::LastHandshake => handshake_millis(states, &a.id).cmp(&handshake_millis(states, &b.id)),
            Self::TotalTraffic => total_traffic(states, &a.id).cmp(&total_traffic(states, &b.id)),
            Self::Enabled => a.enabled.cmp(&b.enabled),
        }
    }
}

/// One parsed `"<method>-<a|d>"` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub method: SortMethod,
    pub ascending: bool,
}

impl SortKey {
    pub fn new(method: SortMethod, ascending: bool) -> Self {
        Self { method, ascending }
    }

    /// Apply the direction to a natural comparison.
    fn directed(self, natural: Ordering) -> Ordering {
        if self.ascending {
            natural
        } else {
            natural.reverse()
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::new(SortMethod::Name, true)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { 'a' } else { 'd' };
        write!(f, "{}-{dir}", self.method)
    }
}

/// Returned when a sort token is not `"<known method>-<a|d>"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key: {0:?}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownSortKey(s.to_owned());
        let (method, dir) = s.split_once('-').ok_or_else(unknown)?;
        let method = SortMethod::from_str(method).map_err(|_| unknown())?;
        let ascending = match dir {
            "a" => true,
            "d" => false,
            _ => return Err(unknown()),
        };
        Ok(Self { method, ascending })
    }
}

// ── SortOrder ───────────────────────────────────────────────────────

/// Prioritized list of sort tokens, index 0 being the primary key.
///
/// Tokens are kept verbatim so an order written by a newer build (with
/// methods this one does not know) survives a round trip; unknown tokens
/// are skipped when sorting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortOrder(Vec<String>);

impl Default for SortOrder {
    fn default() -> Self {
        Self(vec![
            "name-a".into(),
            "lastHandshake-d".into(),
            "totalTraffic-d".into(),
            "enabled-a".into(),
        ])
    }
}

impl SortOrder {
    /// Build from raw tokens, keeping the first four.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).take(MAX_SORT_KEYS).collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Recognized keys in priority order.
    pub fn keys(&self) -> impl Iterator<Item = SortKey> + '_ {
        self.0.iter().filter_map(|t| t.parse().ok())
    }

    /// Move (or insert) `method` to the front with the given direction.
    ///
    /// Any existing token for the same method is dropped first, then the
    /// list is cut back to [`MAX_SORT_KEYS`].
    pub fn with_front(&self, method: SortMethod, ascending: bool) -> Self {
        let prefix = format!("{method}-");
        let front = SortKey::new(method, ascending).to_string();
        let rest = self.0.iter().filter(|t| !t.starts_with(&prefix)).cloned();
        Self(
            std::iter::once(front)
                .chain(rest)
                .take(MAX_SORT_KEYS)
                .collect(),
        )
    }

    /// The primary key, or name ascending when none is recognized.
    pub fn primary(&self) -> SortKey {
        self.keys().next().unwrap_or_default()
    }
}

// ── Sorting ─────────────────────────────────────────────────────────

/// Order `clients` by `order`, falling through to the next key on ties
/// and keeping the input order when every key ties.
pub fn sort_clients(
    clients: &[Client],
    states: &HashMap<String, ClientState>,
    order: &SortOrder,
) -> Vec<Client> {
    let keys: Vec<SortKey> = order.keys().collect();
    let mut sorted = clients.to_vec();
    // `sort_by` is stable.
    sorted.sort_by(|a, b| {
        keys.iter()
            .map(|key| key.directed(key.method.compare(a, b, states)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    sorted
}

/// Primary method and direction of an order.
pub fn current_sort(order: &SortOrder) -> SortKey {
    order.primary()
}

/// All methods, in menu order.
pub fn methods() -> impl Iterator<Item = SortMethod> {
    SortMethod::iter()
}

/// Case-insensitive first, raw text as the tie-break so the result is total.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn handshake_millis(states: &HashMap<String, ClientState>, id: &str) -> i64 {
    states
        .get(id)
        .and_then(|s| s.latest_handshake)
        .map_or(0, |t| t.timestamp_millis())
}

fn total_traffic(states: &HashMap<String, ClientState>, id: &str) -> u64 {
    states.get(id).map_or(0, ClientState::total_traffic)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    fn client(id: &str, name: &str, enabled: bool) -> Client {
        Client {
            id: id.into(),
            name: name.into(),
            enabled,
            ip: None,
            ipv6: None,
            dns: Vec::new(),
            public_key: String::new(),
            private_key: None,
            preshared_key: None,
            keepalive: None,
        }
    }

    fn ids(clients: &[Client]) -> Vec<&str> {
        clients.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn name_sort_is_stable_on_ties() {
        let clients = vec![client("1", "b", true), client("2", "a", true), client("3", "a", true)];
        let states = HashMap::new();

        let asc = sort_clients(&clients, &states, &SortOrder::from_tokens(["name-a"]));
        assert_eq!(ids(&asc), ["2", "3", "1"]);

        let desc = sort_clients(&clients, &states, &SortOrder::from_tokens(["name-d"]));
        assert_eq!(ids(&desc), ["1", "2", "3"]);
    }

    #[test]
    fn falls_through_to_secondary_key() {
        let clients = vec![
            client("1", "same", true),
            client("2", "same", false),
            client("3", "other", true),
        ];
        let order = SortOrder::from_tokens(["name-a", "enabled-a"]);
        let sorted = sort_clients(&clients, &HashMap::new(), &order);
        assert_eq!(ids(&sorted), ["3", "2", "1"]);
    }

    #[test]
    fn handshake_never_sorts_oldest_and_traffic_counts_both_directions() {
        let clients = vec![client("1", "a", true), client("2", "b", true), client("3", "c", true)];
        let mut states = HashMap::new();
        states.insert(
            "1".to_string(),
            ClientState {
                latest_handshake: Some(Utc.timestamp_opt(1_000, 0).unwrap()),
                transfer_rx: Some(10),
                transfer_tx: Some(10),
                endpoint: None,
            },
        );
        states.insert(
            "3".to_string(),
            ClientState {
                latest_handshake: Some(Utc.timestamp_opt(2_000, 0).unwrap()),
                transfer_rx: Some(5),
                transfer_tx: None,
                endpoint: None,
            },
        );

        let by_handshake = sort_clients(&clients, &states, &SortOrder::from_tokens(["lastHandshake-d"]));
        assert_eq!(ids(&by_handshake), ["3", "1", "2"]);

        let by_traffic = sort_clients(&clients, &states, &SortOrder::from_tokens(["totalTraffic-a"]));
        assert_eq!(ids(&by_traffic), ["2", "3", "1"]);
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        let clients = vec![client("1", "b", true), client("2", "a", true)];
        let order = SortOrder::from_tokens(["rssi-d", "name-a"]);
        let sorted = sort_clients(&clients, &HashMap::new(), &order);
        assert_eq!(ids(&sorted), ["2", "1"]);
        assert_eq!(order.primary(), SortKey::new(SortMethod::Name, true));
    }

    #[test]
    fn with_front_relocates_and_caps() {
        let order = SortOrder::default();
        let updated = order.with_front(SortMethod::Enabled, false);
        assert_eq!(
            updated.tokens(),
            ["enabled-d", "name-a", "lastHandshake-d", "totalTraffic-d"]
        );

        let five = SortOrder(vec![
            "x-a".into(),
            "name-a".into(),
            "lastHandshake-d".into(),
            "totalTraffic-d".into(),
        ]);
        let updated = five.with_front(SortMethod::Enabled, true);
        assert_eq!(updated.tokens().len(), MAX_SORT_KEYS);
        assert_eq!(updated.tokens()[0], "enabled-a");
        assert!(!updated.tokens().contains(&"totalTraffic-d".to_string()));
    }

    #[test]
    fn name_compare_ignores_case_first() {
        let clients = vec![client("1", "bob", true), client("2", "Alice", true), client("3", "alice", true)];
        let sorted = sort_clients(&clients, &HashMap::new(), &SortOrder::from_tokens(["name-a"]));
        assert_eq!(ids(&sorted), ["2", "3", "1"]);
    }

    #[test]
    fn sort_key_parse_and_display() {
        let key: SortKey = "lastHandshake-d".parse().unwrap();
        assert_eq!(key, SortKey::new(SortMethod::LastHandshake, false));
        assert_eq!(key.to_string(), "lastHandshake-d");
        assert!("name-x".parse::<SortKey>().is_err());
        assert!("name".parse::<SortKey>().is_err());
        assert_eq!(SortMethod::TotalTraffic.display_name(), "Total Traffic");
        assert_eq!(current_sort(&SortOrder::from_tokens(Vec::<String>::new())), SortKey::default());
    }
}
