// ── Preference store ──
//
// Two phases. Until a scope identity is known every write lands in an
// in-memory buffer and reads see only that buffer. `initialize` resolves
// the panel id once, merges buffered writes over whatever is persisted
// and from then on reads and writes go straight to the namespaced store.
//
// Nothing here returns an error to the caller: persistence failures are
// logged and the in-memory view keeps working.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::backend::KvStore;
use super::keys::{ClientsPerPage, PrefKey, ThemeMode};
use super::scope::ScopeResolver;
use super::ui_state::{UI_STATE_VERSION, UiState};
use crate::sort::{SortMethod, SortOrder};
use crate::traffic::TrafficDisplayMode;

type InitCallback = Box<dyn FnOnce(Option<&str>) + Send>;
type UiEdit = Box<dyn Fn(&mut UiState) -> bool + Send + Sync>;

/// Writes made before the scope is known.
#[derive(Default)]
struct Buffer {
    values: HashMap<PrefKey, Value>,
    /// UI-state edits in call order, replayed onto the persisted tree.
    ui_edits: Vec<UiEdit>,
}

enum Phase {
    Buffered(Buffer),
    Initialized {
        store: KvStore,
        scope: Option<String>,
    },
}

struct Inner {
    root: KvStore,
    phase: RwLock<Phase>,
    /// Serializes `initialize` so concurrent calls resolve and merge once.
    init_lock: tokio::sync::Mutex<()>,
    initialized: watch::Sender<bool>,
    /// `None` once the callbacks have fired.
    callbacks: Mutex<Option<Vec<InitCallback>>>,
}

/// Scoped, durable UI preferences.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PreferenceStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("initialized", &self.is_initialized())
            .field("scope", &self.scope())
            .finish_non_exhaustive()
    }
}

impl PreferenceStore {
    /// Store over `root`, buffered until [`initialize`](Self::initialize).
    pub fn new(root: KvStore) -> Self {
        let (initialized, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                root,
                phase: RwLock::new(Phase::Buffered(Buffer::default())),
                init_lock: tokio::sync::Mutex::new(()),
                initialized,
                callbacks: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.read_phase(), Phase::Initialized { .. })
    }

    /// Namespace in use, once initialized with a panel id.
    pub fn scope(&self) -> Option<String> {
        match &*self.read_phase() {
            Phase::Initialized { scope, .. } => scope.clone(),
            Phase::Buffered(_) => None,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Resolve the scope identity and switch to durable storage.
    ///
    /// Returns whether the store is initialized afterwards. Calling again
    /// after success is a no-op. When no identity can be resolved the store
    /// falls back to the un-namespaced entries if any exist; otherwise it
    /// stays buffered and a later call may retry.
    pub async fn initialize(&self, resolver: &dyn ScopeResolver) -> bool {
        let _guard = self.inner.init_lock.lock().await;
        if self.is_initialized() {
            return true;
        }

        let scope = match resolver.resolve().await {
            Ok(Some(scope)) => Some(scope),
            Ok(None) => {
                debug!("panel reports no id; preferences are not namespaced");
                None
            }
            Err(e) => {
                warn!(error = %e, "panel id unavailable");
                None
            }
        };

        let root = &self.inner.root;
        let store = match &scope {
            Some(scope) => root.with_namespace(scope),
            None if !root.keys(&PrefKey::names()).is_empty() => {
                info!("using un-namespaced preferences");
                root.clone()
            }
            None => {
                debug!("no panel id and nothing persisted; preferences stay buffered");
                return false;
            }
        };

        {
            let mut phase = self.inner.phase.write().unwrap_or_else(PoisonError::into_inner);
            let buffer = match &mut *phase {
                Phase::Buffered(buffer) => std::mem::take(buffer),
                Phase::Initialized { .. } => return true,
            };
            self.merge(&store, scope.is_some(), buffer);
            *phase = Phase::Initialized {
                store,
                scope: scope.clone(),
            };
        }
        info!(scope = scope.as_deref().unwrap_or("<none>"), "preferences initialized");

        self.inner.initialized.send_replace(true);
        let callbacks = self
            .inner
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        for callback in callbacks {
            callback(scope.as_deref());
        }
        true
    }

    /// Run `callback` exactly once: now if initialized, else when
    /// initialization completes. It receives the scope in use.
    pub fn on_initialized<F>(&self, callback: F)
    where
        F: FnOnce(Option<&str>) + Send + 'static,
    {
        {
            let mut pending = self
                .inner
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = pending.as_mut() {
                pending.push(Box::new(callback));
                return;
            }
        }
        callback(self.scope().as_deref());
    }

    /// Resolves once the store is initialized.
    pub async fn wait_initialized(&self) {
        let mut rx = self.inner.initialized.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Fold buffered writes and un-namespaced entries into `store`.
    ///
    /// Per key: buffered write, then the value already in `store`, then
    /// (when namespaced) the un-namespaced value, copied across. Buffered
    /// UI-state edits are replayed onto the persisted tree rather than
    /// replacing it.
    fn merge(&self, store: &KvStore, namespaced: bool, buffer: Buffer) {
        let root = &self.inner.root;
        let Buffer {
            values: mut buffer,
            ui_edits,
        } = buffer;
        let persist = |key: PrefKey, value: &Value| {
            if let Err(e) = store.set(key.as_str(), value) {
                warn!(key = key.as_str(), error = %e, "cannot persist preference");
            }
        };

        for key in [
            PrefKey::SortOrder,
            PrefKey::TrafficDisplayMode,
            PrefKey::ClientsPerPage,
            PrefKey::ThemeMode,
        ] {
            if let Some(value) = buffer.remove(&key) {
                persist(key, &value);
            } else if namespaced && !store.contains(key.as_str()) {
                if let Some(value) = root.get::<Value>(key.as_str()) {
                    debug!(key = key.as_str(), "migrating preference into namespace");
                    persist(key, &value);
                }
            }
        }

        buffer.remove(&PrefKey::SchemaVersion);
        let buffered_tree = buffer.remove(&PrefKey::UiState);
        let ui_state = if ui_edits.is_empty() {
            match buffered_tree {
                Some(value) => Some(serde_json::from_value::<UiState>(value).unwrap_or_default()),
                None => {
                    let (tree, migrated) = self.persisted_ui_state(store, namespaced);
                    migrated.then_some(tree)
                }
            }
        } else {
            let (mut tree, mut changed) = self.persisted_ui_state(store, namespaced);
            for edit in &ui_edits {
                changed |= edit(&mut tree);
            }
            debug!(edits = ui_edits.len(), "replayed buffered ui state edits");
            changed.then_some(tree)
        };
        if let Some(ui_state) = ui_state {
            match serde_json::to_value(&ui_state) {
                Ok(value) => persist(PrefKey::UiState, &value),
                Err(e) => warn!(error = %e, "cannot encode ui state"),
            }
            persist(PrefKey::SchemaVersion, &Value::from(UI_STATE_VERSION));
        }
    }

    /// UI state persisted for `store` (or, when namespaced, left behind in
    /// the un-namespaced root), migrated to the current schema. The flag is
    /// set when the tree differs from what `store` holds.
    fn persisted_ui_state(&self, store: &KvStore, namespaced: bool) -> (UiState, bool) {
        let root = &self.inner.root;
        let key = PrefKey::UiState.as_str();
        let source = if store.contains(key) {
            store
        } else if namespaced && root.contains(key) {
            root
        } else {
            return (UiState::default(), false);
        };
        let Some(value) = source.get::<Value>(key) else {
            return (UiState::default(), false);
        };
        let version = source
            .get::<u32>(PrefKey::SchemaVersion.as_str())
            .unwrap_or(1);
        if version >= UI_STATE_VERSION && source.namespace() == store.namespace() {
            return (serde_json::from_value(value).unwrap_or_default(), false);
        }
        (UiState::migrate(&value, version), true)
    }

    // ── Generic access ───────────────────────────────────────────────

    /// Value of `key`, or `default` when absent or undecodable.
    pub fn get<T: DeserializeOwned>(&self, key: PrefKey, default: T) -> T {
        match &*self.read_phase() {
            Phase::Buffered(buffer) => buffer
                .values
                .get(&key)
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or(default),
            Phase::Initialized { store, .. } => store.get(key.as_str()).unwrap_or(default),
        }
    }

    /// Write `key`. Failures are logged, never returned.
    pub fn set<T: Serialize + ?Sized>(&self, key: PrefKey, value: &T) {
        let mut phase = self.inner.phase.write().unwrap_or_else(PoisonError::into_inner);
        match &mut *phase {
            Phase::Buffered(buffer) => match serde_json::to_value(value) {
                Ok(value) => {
                    buffer.values.insert(key, value);
                    // A whole tree written directly supersedes earlier edits.
                    if key == PrefKey::UiState {
                        buffer.ui_edits.clear();
                    }
                }
                Err(e) => warn!(key = key.as_str(), error = %e, "cannot encode preference"),
            },
            Phase::Initialized { store, .. } => {
                if let Err(e) = store.set(key.as_str(), value) {
                    warn!(key = key.as_str(), error = %e, "cannot persist preference");
                }
            }
        }
    }

    fn read_phase(&self) -> std::sync::RwLockReadGuard<'_, Phase> {
        self.inner.phase.read().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Scalar preferences ───────────────────────────────────────────

    pub fn sort_order(&self) -> SortOrder {
        let order: SortOrder = self.get(PrefKey::SortOrder, SortOrder::default());
        SortOrder::from_tokens(order.tokens().iter().cloned())
    }

    pub fn set_sort_order(&self, order: &SortOrder) {
        self.set(PrefKey::SortOrder, order);
    }

    /// Move `method` to the front of the persisted order and return it.
    pub fn update_sort_order(&self, method: SortMethod, ascending: bool) -> SortOrder {
        let order = self.sort_order().with_front(method, ascending);
        self.set_sort_order(&order);
        order
    }

    pub fn traffic_display_mode(&self) -> TrafficDisplayMode {
        self.get(PrefKey::TrafficDisplayMode, TrafficDisplayMode::default())
    }

    pub fn set_traffic_display_mode(&self, mode: TrafficDisplayMode) {
        self.set(PrefKey::TrafficDisplayMode, &mode);
    }

    pub fn clients_per_page(&self) -> ClientsPerPage {
        self.get(PrefKey::ClientsPerPage, ClientsPerPage::default())
    }

    pub fn set_clients_per_page(&self, size: ClientsPerPage) {
        self.set(PrefKey::ClientsPerPage, &size);
    }

    pub fn theme_mode(&self) -> ThemeMode {
        self.get(PrefKey::ThemeMode, ThemeMode::default())
    }

    pub fn set_theme_mode(&self, mode: ThemeMode) {
        self.set(PrefKey::ThemeMode, &mode);
    }

    // ── UI state ─────────────────────────────────────────────────────

    pub fn ui_state(&self) -> UiState {
        self.get(PrefKey::UiState, UiState::default())
    }

    /// Apply `change`; persists only when it reports a change.
    ///
    /// Before initialization the edit is also kept so it can be replayed
    /// onto whatever tree turns out to be persisted for the scope.
    fn update_ui_state<F>(&self, change: F) -> bool
    where
        F: Fn(&mut UiState) -> bool + Send + Sync + 'static,
    {
        let mut phase = self.inner.phase.write().unwrap_or_else(PoisonError::into_inner);
        match &mut *phase {
            Phase::Buffered(buffer) => {
                let mut state: UiState = buffer
                    .values
                    .get(&PrefKey::UiState)
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
                if !change(&mut state) {
                    return false;
                }
                match serde_json::to_value(&state) {
                    Ok(value) => {
                        buffer.values.insert(PrefKey::UiState, value);
                    }
                    Err(e) => {
                        warn!(error = %e, "cannot encode ui state");
                        return false;
                    }
                }
                buffer.ui_edits.push(Box::new(change));
                true
            }
            Phase::Initialized { store, .. } => {
                let mut state: UiState = store.get(PrefKey::UiState.as_str()).unwrap_or_default();
                if !change(&mut state) {
                    return false;
                }
                let written = store
                    .set(PrefKey::UiState.as_str(), &state)
                    .and_then(|()| store.set(PrefKey::SchemaVersion.as_str(), &UI_STATE_VERSION));
                if let Err(e) = written {
                    warn!(error = %e, "cannot persist ui state");
                }
                true
            }
        }
    }

    pub fn selected_interface_id(&self) -> Option<String> {
        self.ui_state().selected_interface_id
    }

    pub fn set_selected_interface_id(&self, interface_id: Option<&str>) -> bool {
        let next = interface_id.map(str::to_owned);
        self.update_ui_state(move |state| {
            if state.selected_interface_id == next {
                return false;
            }
            state.selected_interface_id.clone_from(&next);
            true
        })
    }

    pub fn is_server_collapsed(&self, interface_id: &str, server_id: &str) -> bool {
        self.ui_state().is_server_collapsed(interface_id, server_id)
    }

    pub fn collapsed_servers(&self, interface_id: &str) -> BTreeSet<String> {
        self.ui_state().collapsed_servers(interface_id)
    }

    pub fn set_server_collapsed(&self, interface_id: &str, server_id: &str, collapsed: bool) -> bool {
        let (interface_id, server_id) = (interface_id.to_owned(), server_id.to_owned());
        self.update_ui_state(move |s| {
            s.set_server_collapsed(&interface_id, &server_id, collapsed)
        })
    }

    pub fn is_client_expanded(&self, interface_id: &str, server_id: &str, client_id: &str) -> bool {
        self.ui_state()
            .is_client_expanded(interface_id, server_id, client_id)
    }

    pub fn expanded_clients(&self, interface_id: &str, server_id: &str) -> BTreeSet<String> {
        self.ui_state().expanded_clients(interface_id, server_id)
    }

    pub fn set_client_expanded(
        &self,
        interface_id: &str,
        server_id: &str,
        client_id: &str,
        expanded: bool,
    ) -> bool {
        let ids = [interface_id, server_id, client_id].map(str::to_owned);
        self.update_ui_state(move |s| {
            let [interface_id, server_id, client_id] = &ids;
            s.set_client_expanded(interface_id, server_id, client_id, expanded)
        })
    }

    pub fn server_page(&self, interface_id: &str, server_id: &str) -> u32 {
        self.ui_state().server_page(interface_id, server_id)
    }

    pub fn set_server_page(&self, interface_id: &str, server_id: &str, page: u32) -> bool {
        let (interface_id, server_id) = (interface_id.to_owned(), server_id.to_owned());
        self.update_ui_state(move |s| s.set_server_page(&interface_id, &server_id, page))
    }

    /// Clear collapse, expansion and paging state, keeping the selection.
    pub fn reset_ui_state(&self) -> bool {
        self.update_ui_state(|state| {
            let reset = UiState {
                selected_interface_id: state.selected_interface_id.take(),
                ..UiState::default()
            };
            let changed = *state != reset;
            *state = reset;
            changed
        })
    }

    // ── Cleanup ──────────────────────────────────────────────────────

    pub fn cleanup_collapsed_servers(&self, interface_id: &str, live_servers: &[&str]) -> bool {
        let interface_id = interface_id.to_owned();
        let live = owned(live_servers);
        self.update_ui_state(move |s| {
            s.cleanup_collapsed_servers(&interface_id, live.iter().map(String::as_str))
        })
    }

    pub fn cleanup_expanded_clients(
        &self,
        interface_id: &str,
        live: &BTreeMap<String, BTreeSet<String>>,
    ) -> bool {
        let interface_id = interface_id.to_owned();
        let live = live.clone();
        self.update_ui_state(move |s| s.cleanup_expanded_clients(&interface_id, &live))
    }

    pub fn cleanup_server_pages(&self, interface_id: &str, live_servers: &[&str]) -> bool {
        let interface_id = interface_id.to_owned();
        let live = owned(live_servers);
        self.update_ui_state(move |s| {
            s.cleanup_server_pages(&interface_id, live.iter().map(String::as_str))
        })
    }

    pub fn cleanup_all_ui_state_for_deleted_interfaces(&self, live_interfaces: &[&str]) -> bool {
        let live = owned(live_interfaces);
        self.update_ui_state(move |s| s.cleanup_deleted_interfaces(live.iter().map(String::as_str)))
    }
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_owned()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::prefs::scope::{FixedScope, ScopeError};

    struct Unreachable;

    impl ScopeResolver for Unreachable {
        fn resolve(&self) -> BoxFuture<'_, Result<Option<String>, ScopeError>> {
            async {
                Err(ScopeError {
                    message: "connection refused".into(),
                })
            }
            .boxed()
        }
    }

    struct Counting {
        calls: AtomicUsize,
    }

    impl ScopeResolver for Counting {
        fn resolve(&self) -> BoxFuture<'_, Result<Option<String>, ScopeError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some("p1".to_owned())) }.boxed()
        }
    }

    fn order(tokens: &[&str]) -> SortOrder {
        SortOrder::from_tokens(tokens.iter().copied())
    }

    #[tokio::test]
    async fn buffered_write_survives_initialization() {
        let root = KvStore::memory();
        root.with_namespace("p1")
            .set("sortOrder", &json!(["enabled-a"]))
            .unwrap();
        let prefs = PreferenceStore::new(root.clone());

        prefs.set_sort_order(&order(&["name-d"]));
        assert_eq!(prefs.sort_order(), order(&["name-d"]));
        assert!(!prefs.is_initialized());

        assert!(prefs.initialize(&FixedScope::new("p1")).await);
        assert_eq!(prefs.sort_order(), order(&["name-d"]));
        assert_eq!(
            root.with_namespace("p1").get::<Vec<String>>("sortOrder").unwrap(),
            ["name-d"]
        );
        assert_eq!(prefs.scope().as_deref(), Some("p1"));
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let open = || {
            let backend = crate::prefs::FileBackend::open(path.clone());
            PreferenceStore::new(KvStore::new(std::sync::Arc::new(backend)))
        };

        let prefs = open();
        assert!(tokio_test::block_on(prefs.initialize(&FixedScope::new("p1"))));
        prefs.set_clients_per_page(ClientsPerPage::Count(20));
        drop(prefs);

        let prefs = open();
        assert!(tokio_test::block_on(prefs.initialize(&FixedScope::new("p1"))));
        assert_eq!(prefs.clients_per_page(), ClientsPerPage::Count(20));
    }

    #[tokio::test]
    async fn reads_before_initialization_see_only_the_buffer() {
        let root = KvStore::memory();
        root.set("themeMode", &"dark").unwrap();
        let prefs = PreferenceStore::new(root);
        assert_eq!(prefs.theme_mode(), ThemeMode::Auto);
    }

    #[tokio::test]
    async fn unscoped_entries_are_migrated_into_namespace() {
        let root = KvStore::memory();
        root.set("clientsPerPage", &json!("all")).unwrap();
        root.set("trafficDisplayMode", &json!("rate")).unwrap();
        root.with_namespace("p1")
            .set("trafficDisplayMode", &json!("total"))
            .unwrap();

        let prefs = PreferenceStore::new(root.clone());
        prefs.initialize(&FixedScope::new("p1")).await;

        assert_eq!(prefs.clients_per_page(), ClientsPerPage::All);
        assert_eq!(prefs.traffic_display_mode(), TrafficDisplayMode::Total);
        assert!(root.with_namespace("p1").contains("clientsPerPage"));
    }

    #[tokio::test]
    async fn resolver_failure_falls_back_to_unscoped_store() {
        let root = KvStore::memory();
        root.set("themeMode", &json!("light")).unwrap();
        let prefs = PreferenceStore::new(root.clone());
        prefs.set_theme_mode(ThemeMode::Dark);

        assert!(prefs.initialize(&Unreachable).await);
        assert!(prefs.scope().is_none());
        assert_eq!(prefs.theme_mode(), ThemeMode::Dark);
        assert_eq!(root.get::<String>("themeMode").as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn resolver_failure_with_empty_store_stays_buffered() {
        let prefs = PreferenceStore::new(KvStore::memory());
        prefs.set_clients_per_page(ClientsPerPage::Count(20));

        assert!(!prefs.initialize(&Unreachable).await);
        assert!(!prefs.is_initialized());
        assert_eq!(prefs.clients_per_page(), ClientsPerPage::Count(20));

        assert!(prefs.initialize(&FixedScope::new("p1")).await);
        assert_eq!(prefs.clients_per_page(), ClientsPerPage::Count(20));
    }

    #[tokio::test]
    async fn concurrent_initialization_resolves_once() {
        let prefs = PreferenceStore::new(KvStore::memory());
        let resolver = Counting {
            calls: AtomicUsize::new(0),
        };

        let (a, b) = tokio::join!(prefs.initialize(&resolver), prefs.initialize(&resolver));
        assert!(a && b);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        assert!(prefs.initialize(&FixedScope::new("other")).await);
        assert_eq!(prefs.scope().as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn callbacks_fire_exactly_once() {
        let prefs = PreferenceStore::new(KvStore::memory());
        let hits = Arc::new(AtomicUsize::new(0));

        let early = Arc::clone(&hits);
        prefs.on_initialized(move |scope| {
            assert_eq!(scope, Some("p1"));
            early.fetch_add(1, Ordering::SeqCst);
        });
        prefs.initialize(&FixedScope::new("p1")).await;
        prefs.initialize(&FixedScope::new("p1")).await;

        let late = Arc::clone(&hits);
        prefs.on_initialized(move |_| {
            late.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn wait_initialized_unblocks() {
        let prefs = PreferenceStore::new(KvStore::memory());
        let waiter = {
            let prefs = prefs.clone();
            tokio::spawn(async move { prefs.wait_initialized().await })
        };
        prefs.initialize(&FixedScope::new("p1")).await;
        waiter.await.unwrap();
        prefs.wait_initialized().await;
    }

    #[tokio::test]
    async fn legacy_ui_state_is_migrated_once() {
        let root = KvStore::memory();
        root.set(
            "uiState",
            &json!({
                "selectedInterfaceId": "if1",
                "serverPages": {"s1": 3},
                "expandedClients": {"if1_s1_c1": true}
            }),
        )
        .unwrap();

        let prefs = PreferenceStore::new(root.clone());
        prefs.initialize(&FixedScope::new("p1")).await;

        let scoped = root.with_namespace("p1");
        assert_eq!(scoped.get::<u32>("schemaVersion"), Some(UI_STATE_VERSION));
        assert_eq!(prefs.selected_interface_id().as_deref(), Some("if1"));
        assert_eq!(prefs.server_page("if1", "s1"), 1);
        assert!(prefs.ui_state().server_pages.is_empty());
    }

    #[tokio::test]
    async fn current_ui_state_is_left_alone() {
        let root = KvStore::memory();
        let scoped = root.with_namespace("p1");
        scoped
            .set("uiState", &json!({"serverPages": {"if1": {"s1": 3}}}))
            .unwrap();
        scoped.set("schemaVersion", &2).unwrap();

        let prefs = PreferenceStore::new(root);
        prefs.initialize(&FixedScope::new("p1")).await;
        assert_eq!(prefs.server_page("if1", "s1"), 3);
    }

    #[tokio::test]
    async fn buffered_ui_edits_replay_onto_persisted_tree() {
        let root = KvStore::memory();
        let scoped = root.with_namespace("p1");
        scoped
            .set(
                "uiState",
                &json!({
                    "collapsedServers": {"if1": {"s1": true}},
                    "serverPages": {"if2": {"s2": 3}}
                }),
            )
            .unwrap();
        scoped.set("schemaVersion", &2).unwrap();

        let prefs = PreferenceStore::new(root.clone());
        assert!(prefs.set_server_collapsed("if1", "s9", true));
        assert!(!prefs.is_server_collapsed("if1", "s1"));

        prefs.initialize(&FixedScope::new("p1")).await;
        assert!(prefs.is_server_collapsed("if1", "s1"));
        assert!(prefs.is_server_collapsed("if1", "s9"));
        assert_eq!(prefs.server_page("if2", "s2"), 3);

        let reopened = PreferenceStore::new(root);
        reopened.initialize(&FixedScope::new("p1")).await;
        assert_eq!(reopened.collapsed_servers("if1").len(), 2);
    }

    #[tokio::test]
    async fn buffered_edit_that_undoes_itself_keeps_persisted_tree() {
        let root = KvStore::memory();
        let scoped = root.with_namespace("p1");
        scoped
            .set("uiState", &json!({"selectedInterfaceId": "if1"}))
            .unwrap();
        scoped.set("schemaVersion", &2).unwrap();

        let prefs = PreferenceStore::new(root);
        prefs.set_client_expanded("if1", "s1", "c1", true);
        prefs.set_client_expanded("if1", "s1", "c1", false);

        prefs.initialize(&FixedScope::new("p1")).await;
        assert_eq!(prefs.selected_interface_id().as_deref(), Some("if1"));
        assert!(!prefs.is_client_expanded("if1", "s1", "c1"));
    }

    #[tokio::test]
    async fn malformed_entry_reads_as_default() {
        let root = KvStore::memory();
        root.with_namespace("p1")
            .set("clientsPerPage", &json!(-4))
            .unwrap();
        let prefs = PreferenceStore::new(root);
        prefs.initialize(&FixedScope::new("p1")).await;
        assert_eq!(prefs.clients_per_page(), ClientsPerPage::default());
    }

    #[test]
    fn update_sort_order_moves_method_to_front() {
        let prefs = PreferenceStore::new(KvStore::memory());
        let order = prefs.update_sort_order(SortMethod::Enabled, false);
        assert_eq!(
            order.tokens(),
            ["enabled-d", "name-a", "lastHandshake-d", "totalTraffic-d"]
        );
        assert_eq!(prefs.sort_order(), order);
    }

    #[test]
    fn restoring_defaults_leaves_state_empty() {
        let prefs = PreferenceStore::new(KvStore::memory());
        assert!(prefs.set_server_collapsed("if1", "s1", true));
        assert!(prefs.set_server_page("if1", "s1", 2));
        assert!(prefs.set_server_collapsed("if1", "s1", false));
        assert!(prefs.set_server_page("if1", "s1", 0));
        assert!(prefs.ui_state().is_default());
        assert!(!prefs.set_server_page("if1", "s1", 1));
    }

    #[test]
    fn reset_keeps_selection() {
        let prefs = PreferenceStore::new(KvStore::memory());
        prefs.set_selected_interface_id(Some("if1"));
        prefs.set_client_expanded("if1", "s1", "c1", true);
        assert!(prefs.reset_ui_state());
        assert!(!prefs.is_client_expanded("if1", "s1", "c1"));
        assert_eq!(prefs.selected_interface_id().as_deref(), Some("if1"));
        assert!(!prefs.reset_ui_state());
    }

    #[test]
    fn cleanup_with_empty_list_writes_nothing() {
        let prefs = PreferenceStore::new(KvStore::memory());
        prefs.set_server_collapsed("if1", "s1", true);
        assert!(!prefs.cleanup_collapsed_servers("if1", &[]));
        assert!(!prefs.cleanup_all_ui_state_for_deleted_interfaces(&[]));
        assert!(prefs.is_server_collapsed("if1", "s1"));
        assert!(prefs.cleanup_all_ui_state_for_deleted_interfaces(&["if2"]));
        assert!(!prefs.is_server_collapsed("if1", "s1"));
    }
}
