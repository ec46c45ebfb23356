//! Provider Registry: EIP-6963 announcement aggregation
//!
//! On activation the registry listens for announcements, then broadcasts one
//! discovery request. Each announcement upserts by `uuid`: a known uuid replaces
//! its entry in place, a new uuid is appended. No wallets at all is a valid state.

use futures::channel::mpsc;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

use crate::core::WalletDescriptor;
use crate::provider::{ListenerId, ProviderDetail};

/// Window-level discovery: announcement listeners plus the request broadcast.
pub trait Discovery {
    fn listen(&self, sink: Rc<dyn Fn(ProviderDetail)>) -> ListenerId;
    fn stop(&self, id: ListenerId);
    fn request_providers(&self);
}

struct ActiveListener {
    discovery: Rc<dyn Discovery>,
    id: ListenerId,
}

impl Drop for ActiveListener {
    fn drop(&mut self) {
        self.discovery.stop(self.id);
    }
}

#[derive(Default)]
struct RegistryInner {
    providers: RefCell<Vec<ProviderDetail>>,
    watchers: RefCell<Vec<mpsc::UnboundedSender<WalletDescriptor>>>,
    listener: RefCell<Option<ActiveListener>>,
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    inner: Rc<RegistryInner>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for announcements and dispatch one discovery request.
    /// Re-activating replaces the previous listener.
    pub fn activate(&self, discovery: Rc<dyn Discovery>) {
        self.deactivate();

        let weak = Rc::downgrade(&self.inner);
        let id = discovery.listen(Rc::new(move |detail| {
            if let Some(inner) = weak.upgrade() {
                ProviderRegistry { inner }.announce(detail);
            }
        }));
        *self.inner.listener.borrow_mut() = Some(ActiveListener { discovery: discovery.clone(), id });

        debug!("requesting wallet providers");
        discovery.request_providers();
    }

    pub fn deactivate(&self) {
        let listener = self.inner.listener.borrow_mut().take();
        drop(listener);
    }

    pub fn is_active(&self) -> bool {
        self.inner.listener.borrow().is_some()
    }

    /// Record an announcement.
    pub fn announce(&self, detail: ProviderDetail) {
        let descriptor = detail.info.clone();
        {
            let mut providers = self.inner.providers.borrow_mut();
            match providers.iter_mut().find(|p| p.info.uuid == descriptor.uuid) {
                Some(existing) => *existing = detail,
                None => {
                    info!(name = %descriptor.name, rdns = %descriptor.rdns, "wallet announced");
                    providers.push(detail);
                }
            }
        }
        self.notify(descriptor);
    }

    fn notify(&self, descriptor: WalletDescriptor) {
        self.inner
            .watchers
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(descriptor.clone()).is_ok());
    }

    /// Announced wallets in first-announcement order.
    pub fn providers(&self) -> Vec<ProviderDetail> {
        self.inner.providers.borrow().clone()
    }

    pub fn wallets(&self) -> Vec<WalletDescriptor> {
        self.inner.providers.borrow().iter().map(|p| p.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.providers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.providers.borrow().is_empty()
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Option<ProviderDetail> {
        self.inner.providers.borrow().iter().find(|p| p.info.uuid == uuid).cloned()
    }

    pub fn find_by_rdns(&self, rdns: &str) -> Option<ProviderDetail> {
        self.inner.providers.borrow().iter().find(|p| p.info.rdns == rdns).cloned()
    }

    /// Receive every subsequent announcement.
    pub fn watch(&self) -> mpsc::UnboundedReceiver<WalletDescriptor> {
        let (tx, rx) = mpsc::unbounded();
        self.inner.watchers.borrow_mut().push(tx);
        rx
    }
}
