//! SessionManager: owns the one active connection
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──accounts + chain──▶ Connected
//!      ▲                        │                               │
//!      └──── refusal / failure ─┘                               │
//!      └──── disconnect() | accountsChanged([]) | disconnect ───┘
//! ```
//!
//! Every state change happens inside one `RefCell` borrow, so consumers never see a
//! half-applied session. Each connect attempt and each teardown bumps the
//! [`HandleToken`]; async completions and provider signals carry the token they were
//! started under and are discarded once it is stale.

use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::state::{ConnectionStatus, Established, HandleToken, SessionSnapshot, SessionState};
use crate::config::{ClientConfig, UnsupportedChainPolicy};
use crate::core::protocol::methods;
use crate::core::{networks, units, Address, ChainId, WalletDescriptor};
use crate::error::{ErrorKind, WalletError, WalletResult};
use crate::provider::{self, ProviderDetail, ProviderHandle, ProviderSignal, SignalSink, Subscription};
use crate::registry::ProviderRegistry;
use crate::runtime::Runtime;
use crate::storage::{ConnectionHint, KeyValueStore};
use crate::switch;

/// How accounts are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectMode {
    /// User picked a wallet: prompt for authorization.
    Prompt,
    /// Page reload: reuse an existing authorization when the wallet allows it.
    Silent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectOutcome {
    /// Nothing persisted.
    NoHint,
    /// Persisted wallet has not announced itself (yet).
    AwaitingWallet,
    /// A session exists or is being established.
    Busy,
    Reconnected(SessionSnapshot),
}

/// Capability handed to the switch controller and the transaction submitter.
#[derive(Clone)]
pub struct ActiveHandle {
    pub token: HandleToken,
    pub provider: ProviderHandle,
    pub wallet: WalletDescriptor,
    pub address: Address,
    pub chain_id: ChainId,
}

struct TaggedSignal {
    token: HandleToken,
    signal: ProviderSignal,
}

struct ActiveSession {
    token: HandleToken,
    detail: ProviderDetail,
    _subscription: Subscription,
}

struct Inner {
    config: ClientConfig,
    runtime: Rc<dyn Runtime>,
    hint: ConnectionHint,
    state: RefCell<SessionState>,
    active: RefCell<Option<ActiveSession>>,
    signals_tx: mpsc::UnboundedSender<TaggedSignal>,
    signals_rx: RefCell<mpsc::UnboundedReceiver<TaggedSignal>>,
    watchers: RefCell<Vec<mpsc::UnboundedSender<SessionSnapshot>>>,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Rc<Inner>,
}

impl SessionManager {
    pub fn new(config: ClientConfig, store: Rc<dyn KeyValueStore>, runtime: Rc<dyn Runtime>) -> Self {
        let hint = ConnectionHint::new(store, config.storage_key.clone());
        let (signals_tx, signals_rx) = mpsc::unbounded();
        Self {
            inner: Rc::new(Inner {
                config,
                runtime,
                hint,
                state: RefCell::new(SessionState::default()),
                active: RefCell::new(None),
                signals_tx,
                signals_rx: RefCell::new(signals_rx),
                watchers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn runtime(&self) -> Rc<dyn Runtime> {
        self.inner.runtime.clone()
    }

    pub fn hint(&self) -> &ConnectionHint {
        &self.inner.hint
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().snapshot()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.borrow().status
    }

    /// Receive a snapshot after every committed change.
    pub fn watch(&self) -> mpsc::UnboundedReceiver<SessionSnapshot> {
        let (tx, rx) = mpsc::unbounded();
        self.inner.watchers.borrow_mut().push(tx);
        rx
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.inner
            .watchers
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(snapshot.clone()).is_ok());
    }

    /// The connected provider, if a session is live.
    pub fn active_handle(&self) -> Option<ActiveHandle> {
        let active = self.inner.active.borrow();
        let active = active.as_ref()?;
        let state = self.inner.state.borrow();
        if !state.is_live(active.token) {
            return None;
        }
        Some(ActiveHandle {
            token: active.token,
            provider: active.detail.provider.clone(),
            wallet: active.detail.info.clone(),
            address: state.address?,
            chain_id: state.chain_id?,
        })
    }

    pub fn is_live(&self, token: HandleToken) -> bool {
        self.inner.state.borrow().is_live(token)
    }

    // =========================================================================
    // CONNECT / DISCONNECT
    // =========================================================================

    /// Prompt the chosen wallet for accounts and make it the active session.
    pub async fn connect(&self, detail: &ProviderDetail) -> WalletResult<SessionSnapshot> {
        self.connect_with(detail, ConnectMode::Prompt).await
    }

    async fn connect_with(&self, detail: &ProviderDetail, mode: ConnectMode) -> WalletResult<SessionSnapshot> {
        if self.status() == ConnectionStatus::Connecting {
            return Err(WalletError::AlreadyConnecting);
        }

        self.release_subscription();
        let token = self.inner.state.borrow_mut().begin_connect(detail.info.clone());
        self.publish();
        info!(wallet = %detail.info.name, rdns = %detail.info.rdns, ?mode, "connecting");

        let result = self.establish(&detail.provider, mode).await;

        if !self.inner.state.borrow().is_current(token) {
            debug!(wallet = %detail.info.name, "discarding stale connect completion");
            return Err(WalletError::Superseded);
        }

        match result {
            Ok(established) => {
                if let Err(e) = self.inner.hint.save(&detail.info.rdns) {
                    warn!(error = %e, "could not persist connected wallet");
                }
                let subscription = Subscription::new(detail.provider.clone(), self.sink(token));
                *self.inner.active.borrow_mut() = Some(ActiveSession {
                    token,
                    detail: detail.clone(),
                    _subscription: subscription,
                });
                self.inner.state.borrow_mut().commit(established);
                self.publish();

                let snapshot = self.snapshot();
                info!(
                    wallet = %detail.info.name,
                    address = %snapshot.address.as_ref().map(Address::truncated).unwrap_or_default(),
                    chain = ?snapshot.chain_id,
                    "wallet connected"
                );
                if !snapshot.unsupported_chain {
                    return Ok(snapshot);
                }
                warn!(chain = ?snapshot.chain_id, "connected on an unsupported network");
                if self.inner.config.unsupported_chain_policy == UnsupportedChainPolicy::Switch {
                    self.switch_to_fallback(token).await;
                }
                Ok(self.snapshot())
            }
            Err(e) => {
                self.inner.state.borrow_mut().fail_connect();
                match mode {
                    ConnectMode::Prompt => self.report(&e),
                    ConnectMode::Silent => self.publish(),
                }
                Err(e)
            }
        }
    }

    async fn establish(&self, wallet: &ProviderHandle, mode: ConnectMode) -> WalletResult<Established> {
        let method = match mode {
            ConnectMode::Silent if self.inner.config.silent_reconnect => methods::ACCOUNTS,
            _ => methods::REQUEST_ACCOUNTS,
        };
        let accounts = provider::request_accounts(wallet.as_ref(), method).await?;
        let first = accounts.first().ok_or(WalletError::NoAccounts)?;
        let address = Address::parse(first).map_err(|e| WalletError::InvalidResponse(e.to_string()))?;
        let chain_id = provider::request_chain_id(wallet.as_ref()).await?;

        let balance = match provider::request_balance(wallet.as_ref(), &address).await {
            Ok(wei) => Some(units::format_units(wei, networks::decimals_for(Some(chain_id)))),
            Err(e) => {
                warn!(error = %e, "initial balance query failed");
                None
            }
        };
        Ok(Established { address, chain_id, balance })
    }

    fn sink(&self, token: HandleToken) -> SignalSink {
        let tx = self.inner.signals_tx.clone();
        Rc::new(move |signal| {
            let _ = tx.unbounded_send(TaggedSignal { token, signal });
        })
    }

    /// Unsubscribe from the active provider. Dropping the subscription releases it.
    fn release_subscription(&self) -> bool {
        let previous = self.inner.active.borrow_mut().take();
        previous.is_some()
    }

    /// Forget the session and the persisted wallet. No-op when nothing is connected.
    pub fn disconnect(&self) {
        let had_subscription = self.release_subscription();
        if !had_subscription && self.status() == ConnectionStatus::Disconnected {
            return;
        }
        self.inner.state.borrow_mut().clear_session();
        if let Err(e) = self.inner.hint.clear() {
            warn!(error = %e, "could not clear persisted wallet");
        }
        info!("wallet disconnected");
        self.publish();
    }

    /// Reconnect the wallet persisted by the last successful connect, once it has announced.
    /// A failed attempt clears the persisted record.
    pub async fn reconnect_from_persisted(&self, registry: &ProviderRegistry) -> WalletResult<ReconnectOutcome> {
        if self.status() != ConnectionStatus::Disconnected {
            return Ok(ReconnectOutcome::Busy);
        }
        let Some(rdns) = self.inner.hint.load()? else {
            return Ok(ReconnectOutcome::NoHint);
        };
        let Some(detail) = registry.find_by_rdns(&rdns) else {
            return Ok(ReconnectOutcome::AwaitingWallet);
        };

        info!(rdns = %rdns, "reconnecting previously connected wallet");
        match self.connect_with(&detail, ConnectMode::Silent).await {
            Ok(snapshot) => Ok(ReconnectOutcome::Reconnected(snapshot)),
            Err(WalletError::Superseded) => Err(WalletError::Superseded),
            Err(e) => {
                info!(rdns = %rdns, error = %e, "reconnect failed, forgetting wallet");
                if let Err(se) = self.inner.hint.clear() {
                    warn!(error = %se, "could not clear persisted wallet");
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    /// Show `error` to the user for the configured display window.
    pub fn report(&self, error: &WalletError) {
        if error.kind() == ErrorKind::InconsistentState {
            debug!(error = %error, "not surfacing stale completion");
            return;
        }
        warn!(error = %error, kind = ?error.kind(), "wallet error");
        let seq = self.inner.state.borrow_mut().raise_error(error, self.inner.runtime.now());
        self.publish();

        let this = self.clone();
        let expire = self.inner.runtime.sleep(self.inner.config.error_display());
        self.inner.runtime.spawn(
            async move {
                expire.await;
                if this.inner.state.borrow_mut().expire_error(seq) {
                    this.publish();
                }
            }
            .boxed_local(),
        );
    }

    pub fn clear_error(&self) {
        let cleared = self.inner.state.borrow_mut().error.take().is_some();
        if cleared {
            self.publish();
        }
    }

    // =========================================================================
    // BALANCE / CHAIN
    // =========================================================================

    pub async fn refresh_balance(&self) -> WalletResult<()> {
        let handle = self.active_handle().ok_or(WalletError::NotConnected)?;
        self.refresh_balance_for(handle.token).await
    }

    pub(crate) async fn refresh_balance_for(&self, token: HandleToken) -> WalletResult<()> {
        let handle = match self.active_handle() {
            Some(handle) if handle.token == token => handle,
            _ => return Err(WalletError::Superseded),
        };
        let wei = provider::request_balance(handle.provider.as_ref(), &handle.address).await?;

        let mut state = self.inner.state.borrow_mut();
        if !state.is_live(token) || state.address.as_ref() != Some(&handle.address) {
            return Err(WalletError::Superseded);
        }
        let decimals = networks::decimals_for(state.chain_id);
        state.balance = Some(units::format_units(wei, decimals));
        drop(state);
        self.publish();
        Ok(())
    }

    /// Refresh the balance after `delay`, if the session is still the same by then.
    pub(crate) fn schedule_balance_refresh(&self, token: HandleToken) {
        let this = self.clone();
        let delay = self.inner.runtime.sleep(self.inner.config.balance_refresh_delay());
        self.inner.runtime.spawn(
            async move {
                delay.await;
                match this.refresh_balance_for(token).await {
                    Ok(()) | Err(WalletError::Superseded) => {}
                    Err(e) => warn!(error = %e, "delayed balance refresh failed"),
                }
            }
            .boxed_local(),
        );
    }

    /// Record the wallet's current chain for the session identified by `token`.
    pub(crate) fn apply_chain(&self, token: HandleToken, chain: ChainId) {
        self.set_chain(token, chain);
    }

    fn set_chain(&self, token: HandleToken, chain: ChainId) -> Option<bool> {
        let supported = {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_live(token) {
                return None;
            }
            if state.chain_id == Some(chain) {
                return Some(!state.unsupported_chain);
            }
            state.set_chain(chain)
        };
        self.publish();
        Some(supported)
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Handle every signal queued so far; returns how many were taken off the queue.
    pub async fn pump(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = self.inner.signals_rx.borrow_mut().next().now_or_never();
            match next {
                Some(Some(tagged)) => {
                    self.handle_signal(tagged).await;
                    handled += 1;
                }
                _ => break,
            }
        }
        handled
    }

    /// Handle signals as they arrive, one at a time, forever.
    pub async fn run(&self) {
        loop {
            let next = futures::future::poll_fn(|cx| self.inner.signals_rx.borrow_mut().poll_next_unpin(cx)).await;
            match next {
                Some(tagged) => self.handle_signal(tagged).await,
                None => break,
            }
        }
    }

    async fn handle_signal(&self, tagged: TaggedSignal) {
        let TaggedSignal { token, signal } = tagged;
        if !self.is_live(token) {
            debug!(token = token.0, ?signal, "ignoring signal from inactive provider");
            return;
        }

        match signal {
            ProviderSignal::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    info!("wallet reported no accounts");
                    self.disconnect();
                }
                Some(first) => match Address::parse(first) {
                    Ok(address) => self.on_account_changed(token, address).await,
                    Err(e) => warn!(error = %e, "ignoring malformed account"),
                },
            },
            ProviderSignal::ChainChanged(hex) => match ChainId::from_hex(&hex) {
                Ok(chain) => self.on_chain_changed(token, chain).await,
                Err(e) => warn!(chain = %hex, error = %e, "ignoring malformed chain id"),
            },
            ProviderSignal::Connect { chain_id } => {
                info!(chain = %chain_id, "wallet connect signal");
            }
            ProviderSignal::Disconnect(reason) => {
                info!(code = reason.code, message = %reason.message, "wallet disconnect signal");
                self.disconnect();
            }
        }
    }

    async fn on_account_changed(&self, token: HandleToken, address: Address) {
        let changed = self.inner.state.borrow_mut().set_address(address);
        if !changed {
            return;
        }
        info!(address = %address.truncated(), "account changed");
        self.publish();
        if let Err(e) = self.refresh_balance_for(token).await {
            if e != WalletError::Superseded {
                warn!(error = %e, "balance refresh after account change failed");
            }
        }
    }

    async fn on_chain_changed(&self, token: HandleToken, chain: ChainId) {
        let Some(supported) = self.set_chain(token, chain) else {
            return;
        };
        info!(chain = %chain, supported, "chain changed");

        // Address and balance stay as they were on a chain outside the registry.
        if !supported {
            warn!(chain = %chain, "unsupported network");
            if self.inner.config.unsupported_chain_policy == UnsupportedChainPolicy::Switch {
                self.switch_to_fallback(token).await;
            }
            return;
        }

        if let Err(e) = self.refresh_balance_for(token).await {
            if e != WalletError::Superseded {
                warn!(error = %e, "balance refresh after chain change failed");
            }
        }
    }

    async fn switch_to_fallback(&self, token: HandleToken) {
        let fallback = self.inner.config.fallback_chain;
        let Some(handle) = self.active_handle().filter(|h| h.token == token) else {
            return;
        };
        info!(fallback = %fallback, "requesting switch away from unsupported network");
        if let Err(e) = switch::request_switch(handle.provider.as_ref(), fallback).await {
            if self.is_live(token) {
                self.report(&e);
            }
            return;
        }
        match provider::request_chain_id(handle.provider.as_ref()).await {
            Ok(current) => self.apply_chain(token, current),
            Err(e) => warn!(error = %e, "could not read chain after fallback switch"),
        }
    }
}
