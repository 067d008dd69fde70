// ── Preference keys and scalar values ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Top-level persisted entries. Each one is stored (and can fail to
/// decode) independently of the others.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum PrefKey {
    SortOrder,
    TrafficDisplayMode,
    ClientsPerPage,
    ThemeMode,
    UiState,
    /// Layout version of `uiState` in the same namespace.
    SchemaVersion,
}

impl PrefKey {
    /// Every key name, for listing a namespace.
    pub fn names() -> Vec<&'static str> {
        Self::iter().map(|k| k.as_str()).collect()
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

// ── ClientsPerPage ──────────────────────────────────────────────────

/// Page size of a server's client list: a positive count or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPageSize", into = "RawPageSize")]
pub enum ClientsPerPage {
    Count(u32),
    All,
}

impl Default for ClientsPerPage {
    fn default() -> Self {
        Self::Count(5)
    }
}

impl ClientsPerPage {
    /// `None` for "all".
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::Count(n) => usize::try_from(n).ok(),
            Self::All => None,
        }
    }
}

impl fmt::Display for ClientsPerPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Rejected page size text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid page size {0:?}: expected a positive number or \"all\"")]
pub struct InvalidPageSize(pub String);

impl FromStr for ClientsPerPage {
    type Err = InvalidPageSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self::Count(n)),
            _ => Err(InvalidPageSize(s.to_owned())),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPageSize {
    Count(u32),
    Word(String),
}

impl TryFrom<RawPageSize> for ClientsPerPage {
    type Error = InvalidPageSize;

    fn try_from(raw: RawPageSize) -> Result<Self, Self::Error> {
        match raw {
            RawPageSize::Count(0) => Err(InvalidPageSize("0".into())),
            RawPageSize::Count(n) => Ok(Self::Count(n)),
            RawPageSize::Word(w) => w.parse(),
        }
    }
}

impl From<ClientsPerPage> for RawPageSize {
    fn from(value: ClientsPerPage) -> Self {
        match value {
            ClientsPerPage::Count(n) => Self::Count(n),
            ClientsPerPage::All => Self::Word("all".into()),
        }
    }
}

// ── ThemeMode ───────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Follow the operator's environment.
    #[default]
    Auto,
    Light,
    Dark,
}
