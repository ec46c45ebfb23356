//! Client: the wallet selector wired together
//!
//! ```text
//! Discovery ──▶ ProviderRegistry ──▶ SessionManager ◀── NetworkSwitchController
//!                                          ▲
//!                                          └─────────── TransactionSubmitter
//! ```
//!
//! `start()` activates discovery and spawns two local tasks on the runtime: the
//! session's signal loop and a one-shot reconnection watcher that retries each time
//! a wallet announces until the persisted wallet has either connected or failed.

use futures::future::{AbortHandle, Abortable, FutureExt};
use futures::channel::mpsc;
use futures::StreamExt;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::core::{ChainId, WalletDescriptor};
use crate::error::{WalletError, WalletResult};
use crate::registry::{Discovery, ProviderRegistry};
use crate::runtime::Runtime;
use crate::session::{ReconnectOutcome, SessionManager, SessionSnapshot};
use crate::storage::KeyValueStore;
use crate::switch::{NetworkSwitchController, SwitchOutcome};
use crate::transfer::TransactionSubmitter;

pub struct Client {
    registry: ProviderRegistry,
    session: SessionManager,
    switcher: NetworkSwitchController,
    transfers: TransactionSubmitter,
    discovery: Rc<dyn Discovery>,
    runtime: Rc<dyn Runtime>,
    tasks: RefCell<Vec<AbortHandle>>,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        discovery: Rc<dyn Discovery>,
        store: Rc<dyn KeyValueStore>,
        runtime: Rc<dyn Runtime>,
    ) -> Self {
        let session = SessionManager::new(config, store, runtime.clone());
        Self {
            registry: ProviderRegistry::new(),
            switcher: NetworkSwitchController::new(session.clone()),
            transfers: TransactionSubmitter::new(session.clone()),
            session,
            discovery,
            runtime,
            tasks: RefCell::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn is_started(&self) -> bool {
        !self.tasks.borrow().is_empty()
    }

    /// Begin discovery, signal handling and reconnection. Calling it twice is a no-op.
    pub fn start(&self) {
        if self.is_started() {
            return;
        }
        info!(app = %self.session.config().app, "starting wallet selector");

        let session = self.session.clone();
        self.spawn(async move { session.run().await });

        // Subscribe before activating so announcements answering the request are seen.
        let announcements = self.registry.watch();
        let session = self.session.clone();
        let registry = self.registry.clone();
        self.spawn(reconnect_when_announced(session, registry, announcements));

        self.registry.activate(self.discovery.clone());
    }

    /// Stop discovery and background tasks. The session and the persisted wallet are kept.
    pub fn stop(&self) {
        for task in self.tasks.borrow_mut().drain(..) {
            task.abort();
        }
        self.registry.deactivate();
        debug!("wallet selector stopped");
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + 'static,
    {
        let (handle, registration) = AbortHandle::new_pair();
        self.tasks.borrow_mut().push(handle);
        self.runtime
            .spawn(Abortable::new(task, registration).map(|_| ()).boxed_local());
    }

    pub fn wallets(&self) -> Vec<WalletDescriptor> {
        self.registry.wallets()
    }

    pub async fn connect(&self, uuid: &str) -> WalletResult<SessionSnapshot> {
        let detail = self
            .registry
            .find_by_uuid(uuid)
            .ok_or_else(|| WalletError::UnknownWallet(uuid.to_string()))?;
        self.session.connect(&detail).await
    }

    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    pub async fn switch_chain(&self, chain: ChainId) -> WalletResult<SwitchOutcome> {
        self.switcher.switch_to(chain).await
    }

    pub async fn send(&self, recipient: &str, amount: &str) -> WalletResult<String> {
        self.transfers.send(recipient, amount).await
    }

    pub async fn refresh_balance(&self) -> WalletResult<()> {
        self.session.refresh_balance().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn watch(&self) -> mpsc::UnboundedReceiver<SessionSnapshot> {
        self.session.watch()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn reconnect_when_announced(
    session: SessionManager,
    registry: ProviderRegistry,
    mut announcements: mpsc::UnboundedReceiver<WalletDescriptor>,
) {
    loop {
        match session.reconnect_from_persisted(&registry).await {
            Ok(ReconnectOutcome::AwaitingWallet) => {}
            Ok(outcome) => {
                debug!(?outcome, "reconnection settled");
                return;
            }
            Err(e) => {
                debug!(error = %e, "reconnection abandoned");
                return;
            }
        }
        if announcements.next().await.is_none() {
            return;
        }
    }
}
