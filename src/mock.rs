//! In-memory doubles for wallets, discovery and time
//!
//! - `MockWallet`: scripted EIP-1193 provider with a request log and signal emitter
//! - `MockDiscovery`: window-free announcement bus
//! - `ManualRuntime`: virtual clock over a `futures` local pool
//!
//! Used by the integration tests and by embedders exercising their UI without a browser.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tracing::warn;

use crate::core::protocol::methods;
use crate::core::{units, ChainId, WalletDescriptor, U256};
use crate::error::RpcError;
use crate::provider::{ListenerId, Provider, ProviderDetail, ProviderSignal, SignalSink};
use crate::registry::Discovery;
use crate::runtime::Runtime;

pub const DEFAULT_ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
pub const DEFAULT_TX_HASH: &str = "0x5e1f0000000000000000000000000000000000000000000000000000000000aa";
const MOCK_ICON: &str = "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg'/>";
const UNSUPPORTED_METHOD: i64 = 4200;

// =============================================================================
// WALLET
// =============================================================================

struct WalletInner {
    accounts: RefCell<Vec<String>>,
    chain: Cell<u64>,
    known_chains: RefCell<HashSet<u64>>,
    balances: RefCell<HashMap<String, U256>>,
    default_balance: Cell<U256>,
    tx_hash: RefCell<String>,
    failures: RefCell<HashMap<String, VecDeque<RpcError>>>,
    holds: RefCell<HashMap<String, VecDeque<oneshot::Receiver<()>>>>,
    requests: RefCell<Vec<(String, Value)>>,
    listeners: RefCell<Vec<(ListenerId, SignalSink)>>,
    next_listener: Cell<u64>,
}

/// Scripted wallet. Clones share state.
#[derive(Clone)]
pub struct MockWallet {
    inner: Rc<WalletInner>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    /// One account on Sepolia holding 1 ETH. Knows Sepolia and mainnet.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(WalletInner {
                accounts: RefCell::new(vec![DEFAULT_ACCOUNT.to_string()]),
                chain: Cell::new(11_155_111),
                known_chains: RefCell::new([1, 11_155_111].into_iter().collect()),
                balances: RefCell::new(HashMap::new()),
                default_balance: Cell::new(U256::from(1_000_000_000_000_000_000u128)),
                tx_hash: RefCell::new(DEFAULT_TX_HASH.to_string()),
                failures: RefCell::new(HashMap::new()),
                holds: RefCell::new(HashMap::new()),
                requests: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(1),
            }),
        }
    }

    pub fn with_accounts(self, accounts: &[&str]) -> Self {
        self.set_accounts(accounts);
        self
    }

    pub fn with_chain(self, chain: u64) -> Self {
        self.inner.chain.set(chain);
        self.inner.known_chains.borrow_mut().insert(chain);
        self
    }

    pub fn with_balance(self, address: &str, wei: impl Into<U256>) -> Self {
        self.set_balance(address, wei);
        self
    }

    pub fn with_default_balance(self, wei: impl Into<U256>) -> Self {
        self.inner.default_balance.set(wei.into());
        self
    }

    pub fn with_tx_hash(self, hash: &str) -> Self {
        *self.inner.tx_hash.borrow_mut() = hash.to_string();
        self
    }

    /// Wrap into an announcement.
    pub fn detail(&self, uuid: &str, name: &str, rdns: &str) -> ProviderDetail {
        ProviderDetail::new(WalletDescriptor::new(uuid, name, MOCK_ICON, rdns), Rc::new(self.clone()))
    }

    pub fn set_accounts(&self, accounts: &[&str]) {
        *self.inner.accounts.borrow_mut() = accounts.iter().map(|a| a.to_string()).collect();
    }

    pub fn set_balance(&self, address: &str, wei: impl Into<U256>) {
        self.inner.balances.borrow_mut().insert(address.to_ascii_lowercase(), wei.into());
    }

    pub fn chain(&self) -> u64 {
        self.inner.chain.get()
    }

    pub fn knows_chain(&self, chain: u64) -> bool {
        self.inner.known_chains.borrow().contains(&chain)
    }

    /// Refuse the next `method` request with `error`.
    pub fn fail_next(&self, method: &str, error: RpcError) {
        self.inner
            .failures
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(error);
    }

    /// Park the next `method` request until the returned sender fires or is dropped.
    pub fn hold_next(&self, method: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .holds
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.inner.requests.borrow().clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.inner
            .requests
            .borrow()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn request_count(&self, method: &str) -> usize {
        self.inner.requests.borrow().iter().filter(|(m, _)| m == method).count()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Deliver `signal` to every subscribed listener, as the wallet would.
    pub fn emit(&self, signal: ProviderSignal) {
        match &signal {
            ProviderSignal::AccountsChanged(accounts) => *self.inner.accounts.borrow_mut() = accounts.clone(),
            ProviderSignal::ChainChanged(hex) => {
                if let Ok(chain) = ChainId::from_hex(hex) {
                    self.inner.chain.set(chain.value());
                }
            }
            _ => {}
        }
        let sinks: Vec<SignalSink> = self.inner.listeners.borrow().iter().map(|(_, s)| s.clone()).collect();
        for sink in sinks {
            sink(signal.clone());
        }
    }

    fn move_to(&self, chain: u64) {
        if self.inner.chain.replace(chain) != chain {
            self.emit(ProviderSignal::ChainChanged(ChainId(chain).to_hex()));
        }
    }

    fn respond(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            methods::REQUEST_ACCOUNTS | methods::ACCOUNTS => Ok(json!(*self.inner.accounts.borrow())),
            methods::CHAIN_ID => Ok(json!(ChainId(self.inner.chain.get()).to_hex())),
            methods::GET_BALANCE => {
                let address = params[0].as_str().unwrap_or_default().to_ascii_lowercase();
                let wei = self
                    .inner
                    .balances
                    .borrow()
                    .get(&address)
                    .copied()
                    .unwrap_or(self.inner.default_balance.get());
                Ok(json!(units::to_quantity(wei)))
            }
            methods::SWITCH_CHAIN => {
                let chain = requested_chain(params)?;
                if !self.knows_chain(chain) {
                    return Err(RpcError::new(4902, format!("Unrecognized chain ID {}", ChainId(chain).to_hex())));
                }
                self.move_to(chain);
                Ok(Value::Null)
            }
            methods::ADD_CHAIN => {
                let chain = requested_chain(params)?;
                self.inner.known_chains.borrow_mut().insert(chain);
                self.move_to(chain);
                Ok(Value::Null)
            }
            methods::SEND_TRANSACTION => Ok(json!(*self.inner.tx_hash.borrow())),
            other => Err(RpcError::new(UNSUPPORTED_METHOD, format!("{} is not supported", other))),
        }
    }
}

fn requested_chain(params: &Value) -> Result<u64, RpcError> {
    params[0]["chainId"]
        .as_str()
        .and_then(|hex| ChainId::from_hex(hex).ok())
        .map(|chain| chain.value())
        .ok_or_else(|| RpcError::new(-32602, "invalid chainId"))
}

#[async_trait(?Send)]
impl Provider for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.inner.requests.borrow_mut().push((method.to_string(), params.clone()));

        let hold = self.inner.holds.borrow_mut().get_mut(method).and_then(VecDeque::pop_front);
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        let failure = self.inner.failures.borrow_mut().get_mut(method).and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            return Err(error);
        }
        self.respond(method, &params)
    }

    fn subscribe(&self, sink: SignalSink) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, sink));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.inner.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
    }
}

// =============================================================================
// DISCOVERY
// =============================================================================

type AnnounceSink = Rc<dyn Fn(ProviderDetail)>;

#[derive(Default)]
struct DiscoveryInner {
    listeners: RefCell<Vec<(ListenerId, AnnounceSink)>>,
    next_listener: Cell<u64>,
    requests: Cell<usize>,
    installed: RefCell<Vec<ProviderDetail>>,
}

/// Announcement bus. Installed wallets answer every discovery request.
#[derive(Clone, Default)]
pub struct MockDiscovery {
    inner: Rc<DiscoveryInner>,
}

impl MockDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, detail: ProviderDetail) {
        self.inner.installed.borrow_mut().push(detail);
    }

    /// Broadcast one announcement to every listener.
    pub fn announce(&self, detail: ProviderDetail) {
        let sinks: Vec<AnnounceSink> = self.inner.listeners.borrow().iter().map(|(_, s)| s.clone()).collect();
        for sink in sinks {
            sink(detail.clone());
        }
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.get()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl Discovery for MockDiscovery {
    fn listen(&self, sink: Rc<dyn Fn(ProviderDetail)>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, sink));
        id
    }

    fn stop(&self, id: ListenerId) {
        self.inner.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
    }

    fn request_providers(&self) {
        self.inner.requests.set(self.inner.requests.get() + 1);
        let installed = self.inner.installed.borrow().clone();
        for detail in installed {
            self.announce(detail);
        }
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

#[derive(Default)]
struct Timer {
    fired: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

struct Sleep {
    timer: Rc<Timer>,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.timer.fired.get() {
            return Poll::Ready(());
        }
        *self.timer.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

struct RuntimeInner {
    start: DateTime<Utc>,
    elapsed: Cell<Duration>,
    timers: RefCell<Vec<(Duration, Rc<Timer>)>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

/// Virtual time. Nothing sleeps until [`ManualRuntime::advance`] moves the clock.
#[derive(Clone)]
pub struct ManualRuntime {
    inner: Rc<RuntimeInner>,
}

impl Default for ManualRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualRuntime {
    /// Clock starts at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            inner: Rc::new(RuntimeInner {
                start: DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap_or_default(),
                elapsed: Cell::new(Duration::ZERO),
                timers: RefCell::new(Vec::new()),
                pool: RefCell::new(pool),
                spawner,
            }),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.elapsed.get()
    }

    /// Run every spawned task until none can make progress.
    pub fn run_until_stalled(&self) {
        self.inner.pool.borrow_mut().run_until_stalled();
    }

    /// Drive `future` (and spawned tasks) to completion. `future` must not wait on a timer.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        let output = self.inner.pool.borrow_mut().run_until(future);
        self.run_until_stalled();
        output
    }

    /// Move the clock forward, firing due timers in deadline order.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.elapsed.get() + by;
        loop {
            self.run_until_stalled();
            let next = {
                let mut timers = self.inner.timers.borrow_mut();
                timers.sort_by_key(|(deadline, _)| *deadline);
                match timers.first() {
                    Some((deadline, _)) if *deadline <= target => Some(timers.remove(0)),
                    _ => None,
                }
            };
            let Some((deadline, timer)) = next else { break };
            self.inner.elapsed.set(deadline.max(self.inner.elapsed.get()));
            timer.fired.set(true);
            let waker = timer.waker.borrow_mut().take();
            if let Some(waker) = waker {
                waker.wake();
            }
        }
        self.inner.elapsed.set(target);
        self.run_until_stalled();
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }
}

impl Runtime for ManualRuntime {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.inner.elapsed.get()).unwrap_or_else(|_| chrono::Duration::zero());
        self.inner.start + elapsed
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let timer = Rc::new(Timer::default());
        if duration.is_zero() {
            timer.fired.set(true);
        } else {
            let deadline = self.inner.elapsed.get() + duration;
            self.inner.timers.borrow_mut().push((deadline, timer.clone()));
        }
        Box::pin(Sleep { timer })
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.inner.spawner.spawn_local(task) {
            warn!(error = %e, "manual runtime rejected task");
        }
    }
}
