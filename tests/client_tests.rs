//! Client Test Suite: the selector wired end to end
//!
//! Test 1: start() discovers installed wallets and connects by uuid
//! Test 2: Persisted wallet announcing late is reconnected once
//! Test 3: Wallet signals flow through the background loop
//! Test 4: stop() detaches discovery and background tasks
//! Test 5: File-backed persistence survives a restart

use once_cell::sync::Lazy;
use std::rc::Rc;
use std::sync::Mutex;
use tempfile::TempDir;

use wallet_selector::core::protocol::methods;
use wallet_selector::core::protocol::storage::PREVIOUSLY_CONNECTED_PROVIDER_RDNS;
use wallet_selector::mock::{ManualRuntime, MockDiscovery, MockWallet};
use wallet_selector::{
    ChainId, Client, ClientConfig, ConnectionStatus, KeyValueStore, MemoryStore, ProviderSignal,
    WalletError,
};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}

fn client_with(
    discovery: &MockDiscovery,
    store: Rc<dyn KeyValueStore>,
    runtime: &ManualRuntime,
) -> Client {
    Client::new(
        ClientConfig::new("wallet-selector-test"),
        Rc::new(discovery.clone()),
        store,
        Rc::new(runtime.clone()),
    )
}

/// Test 1: start() discovers installed wallets and connects by uuid
#[test]
fn start_discovers_and_connects() {
    let runtime = ManualRuntime::new();
    let discovery = MockDiscovery::new();
    let wallet = MockWallet::new();
    discovery.install(wallet.detail("uuid-1", "Mock", "io.mock"));

    let client = client_with(&discovery, Rc::new(MemoryStore::new()), &runtime);
    client.start();
    client.start();
    runtime.run_until_stalled();

    assert_eq!(discovery.request_count(), 1, "one discovery request per activation");
    assert_eq!(client.wallets().len(), 1);
    assert_eq!(client.snapshot().status, ConnectionStatus::Disconnected);

    let err = runtime.block_on(client.connect("uuid-404")).unwrap_err();
    assert_eq!(err, WalletError::UnknownWallet("uuid-404".into()));

    let snapshot = runtime.block_on(client.connect("uuid-1")).expect("connect");
    assert!(snapshot.is_connected());
    assert_eq!(wallet.request_count(methods::REQUEST_ACCOUNTS), 1);

    client.disconnect();
    assert_eq!(client.snapshot().status, ConnectionStatus::Disconnected);
    assert_eq!(wallet.listener_count(), 0);
}

/// Test 2: Persisted wallet announcing late is reconnected once
#[test]
fn persisted_wallet_reconnects_when_announced() {
    let runtime = ManualRuntime::new();
    let discovery = MockDiscovery::new();
    let store = MemoryStore::new();
    store.set(PREVIOUSLY_CONNECTED_PROVIDER_RDNS, "io.b").unwrap();

    let a = MockWallet::new();
    let b = MockWallet::new();
    discovery.install(a.detail("1", "A", "io.a"));

    let client = client_with(&discovery, Rc::new(store.clone()), &runtime);
    client.start();
    runtime.run_until_stalled();
    assert_eq!(client.snapshot().status, ConnectionStatus::Disconnected);
    assert!(a.requests().is_empty());

    discovery.announce(b.detail("2", "B", "io.b"));
    runtime.run_until_stalled();

    let snapshot = client.snapshot();
    assert!(snapshot.is_connected());
    assert_eq!(snapshot.wallet.map(|w| w.rdns), Some("io.b".to_string()));
    assert_eq!(b.request_count(methods::ACCOUNTS), 1);
    assert!(a.requests().is_empty());

    // Settled: re-announcements do not reconnect after a disconnect
    client.disconnect();
    discovery.announce(b.detail("2", "B", "io.b"));
    runtime.run_until_stalled();
    assert_eq!(client.snapshot().status, ConnectionStatus::Disconnected);
    assert_eq!(b.request_count(methods::ACCOUNTS), 1);
}

/// Test 3: Wallet signals flow through the background loop
#[test]
fn signals_are_handled_in_background() {
    let runtime = ManualRuntime::new();
    let discovery = MockDiscovery::new();
    let wallet = MockWallet::new();
    discovery.install(wallet.detail("1", "Mock", "io.mock"));

    let client = client_with(&discovery, Rc::new(MemoryStore::new()), &runtime);
    client.start();
    runtime.block_on(client.connect("1")).expect("connect");
    let mut changes = client.watch();

    wallet.emit(ProviderSignal::ChainChanged("0x14a34".into()));
    runtime.run_until_stalled();
    let snapshot = client.snapshot();
    assert_eq!(snapshot.chain_id, Some(ChainId(84_532)));
    assert_eq!(snapshot.chain_name.as_deref(), Some("Base Sepolia Testnet"));
    assert!(changes.try_next().expect("published").is_some());

    wallet.emit(ProviderSignal::Connect { chain_id: "0x14a34".into() });
    wallet.emit(ProviderSignal::AccountsChanged(vec![]));
    runtime.run_until_stalled();
    assert_eq!(client.snapshot().status, ConnectionStatus::Disconnected);
}

/// Test 4: stop() detaches discovery and background tasks
#[test]
fn stop_detaches_discovery() {
    let runtime = ManualRuntime::new();
    let discovery = MockDiscovery::new();
    let client = client_with(&discovery, Rc::new(MemoryStore::new()), &runtime);

    client.start();
    assert!(client.is_started());
    assert_eq!(discovery.listener_count(), 1);

    client.stop();
    runtime.run_until_stalled();
    assert!(!client.is_started());
    assert_eq!(discovery.listener_count(), 0);

    discovery.announce(MockWallet::new().detail("1", "Late", "io.late"));
    assert!(client.wallets().is_empty());

    // Restartable
    client.start();
    assert_eq!(discovery.request_count(), 2);
}

/// Test 5: File-backed persistence survives a restart
#[cfg(feature = "native")]
#[test]
fn file_store_keeps_connected_wallet() {
    use wallet_selector::storage::ROOT_ENV;
    use wallet_selector::FileStore;

    let _guard = lock_env();
    let dir = TempDir::new().expect("tempdir");
    std::env::set_var(ROOT_ENV, dir.path());

    let runtime = ManualRuntime::new();
    let discovery = MockDiscovery::new();
    let wallet = MockWallet::new();
    discovery.install(wallet.detail("1", "Mock", "io.mock"));

    let store = FileStore::open("wallet-selector-test").expect("file store");
    assert_eq!(
        store.path(),
        dir.path().join("wallet-selector-test").join("connection.json")
    );
    {
        let client = client_with(&discovery, Rc::new(store), &runtime);
        client.start();
        runtime.block_on(client.connect("1")).expect("connect");
    }

    // Next page load: same file, fresh client
    let reopened = FileStore::open("wallet-selector-test").expect("reopen");
    assert_eq!(
        reopened.get(PREVIOUSLY_CONNECTED_PROVIDER_RDNS).unwrap().as_deref(),
        Some("io.mock")
    );
    let client = client_with(&discovery, Rc::new(reopened), &runtime);
    client.start();
    runtime.run_until_stalled();
    assert!(client.snapshot().is_connected());
    assert_eq!(wallet.request_count(methods::ACCOUNTS), 1);

    client.disconnect();
    let after = FileStore::open("wallet-selector-test").expect("reopen");
    assert_eq!(after.get(PREVIOUSLY_CONNECTED_PROVIDER_RDNS).unwrap(), None);

    std::env::remove_var(ROOT_ENV);
}
