// ── Local preference store ──
//
// Durable, panel-scoped UI preferences: sort order, traffic display mode,
// page size, theme and the nested view-state tree.

mod backend;
mod keys;
mod scope;
mod store;
mod ui_state;

pub use backend::{FileBackend, KvBackend, KvStore, MemoryBackend, StoreError};
pub use keys::{ClientsPerPage, InvalidPageSize, PrefKey, ThemeMode};
pub use scope::{FixedScope, ScopeError, ScopeResolver};
pub use store::PreferenceStore;
pub use ui_state::{FlagSet, UI_STATE_VERSION, UiState};
