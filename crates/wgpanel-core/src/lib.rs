//! Console core between `wgpanel-api` and the command-line front end.
//!
//! - **[`Console`]**: Facade over one panel connection:
//!   [`connect()`](Console::connect) logs in and initializes preferences
//!   under the panel's scope; loaders refresh the interface cache and prune
//!   view state for entities the panel no longer has; mutations are
//!   forwarded and stamp the owning interface.
//!
//! - **[`PreferenceStore`]**: Durable, panel-scoped UI preferences that
//!   buffer writes until the scope is known. Backed by any [`KvBackend`]
//!   ([`FileBackend`] for the CLI, [`MemoryBackend`] for tests).
//!
//! - **[`traffic`]**: Rolling state samples, rate derivation, formatting
//!   and the [`StatePoller`] loop that drives them.
//!
//! - **[`sort`]**: Multi-key, stable client ordering driven by the
//!   persisted [`SortOrder`].

pub mod config;
pub mod console;
pub mod error;
pub mod model;
pub mod prefs;
pub mod sort;
pub mod task;
pub mod traffic;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConsoleConfig, Credentials, TlsVerification};
pub use console::{ClientPage, Console};
pub use error::CoreError;
pub use model::{
    Client, ClientState, Interface, InterfaceStateSnapshot, InterfaceTree, NetworkConfig,
    OffsetCheck, OffsetCheckRequest, Server, ServerNode, ServiceConfig, SnatConfig,
};
pub use prefs::{
    ClientsPerPage, FileBackend, FixedScope, KvBackend, KvStore, MemoryBackend, PrefKey,
    PreferenceStore, ScopeResolver, ThemeMode, UiState,
};
pub use sort::{SortKey, SortMethod, SortOrder, sort_clients};
pub use task::PeriodicTask;
pub use traffic::{StatePoller, TrafficDisplayMode, TrafficSampler};
