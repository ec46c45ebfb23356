//! EIP-6963 discovery over `window` events

use js_sys::Reflect;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::provider::BrowserProvider;
use crate::core::protocol::discovery::{ANNOUNCE_EVENT, REQUEST_EVENT};
use crate::core::WalletDescriptor;
use crate::provider::{ListenerId, ProviderDetail};
use crate::registry::Discovery;

type AnnounceClosure = Closure<dyn FnMut(web_sys::Event)>;

pub struct WindowDiscovery {
    window: web_sys::Window,
    listeners: RefCell<Vec<(ListenerId, AnnounceClosure)>>,
    next_listener: Cell<u64>,
}

impl WindowDiscovery {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        Ok(Self {
            window,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
        })
    }
}

/// `detail` of an announce event: `{ info: {uuid, name, icon, rdns}, provider }`.
fn parse_announcement(detail: &JsValue) -> Result<ProviderDetail, String> {
    let info = Reflect::get(detail, &JsValue::from_str("info")).map_err(|e| format!("{:?}", e))?;
    let info: WalletDescriptor = serde_wasm_bindgen::from_value(info).map_err(|e| e.to_string())?;
    let provider = Reflect::get(detail, &JsValue::from_str("provider")).map_err(|e| format!("{:?}", e))?;
    if !provider.is_object() {
        return Err(format!("wallet {} announced without a provider", info.rdns));
    }
    Ok(ProviderDetail::new(info, Rc::new(BrowserProvider::new(provider))))
}

impl Discovery for WindowDiscovery {
    fn listen(&self, sink: Rc<dyn Fn(ProviderDetail)>) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        let closure = AnnounceClosure::new(move |event: web_sys::Event| {
            let Some(event) = event.dyn_ref::<web_sys::CustomEvent>() else {
                return;
            };
            match parse_announcement(&event.detail()) {
                Ok(detail) => sink(detail),
                Err(e) => warn!(error = %e, "ignoring malformed wallet announcement"),
            }
        });
        if let Err(e) = self
            .window
            .add_event_listener_with_callback(ANNOUNCE_EVENT, closure.as_ref().unchecked_ref())
        {
            warn!(error = ?e, "could not listen for wallet announcements");
        }
        self.listeners.borrow_mut().push((id, closure));
        id
    }

    fn stop(&self, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(pos) = listeners.iter().position(|(existing, _)| *existing == id) {
            let (_, closure) = listeners.remove(pos);
            let _ = self
                .window
                .remove_event_listener_with_callback(ANNOUNCE_EVENT, closure.as_ref().unchecked_ref());
        }
    }

    fn request_providers(&self) {
        match web_sys::Event::new(REQUEST_EVENT) {
            Ok(event) => {
                let _ = self.window.dispatch_event(&event);
            }
            Err(e) => warn!(error = ?e, "could not build discovery request"),
        }
    }
}
