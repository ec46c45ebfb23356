//! EIP-1193 provider object adapter

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::core::protocol::events;
use crate::error::RpcError;
use crate::provider::{ListenerId, Provider, ProviderSignal, SignalSink};

type SignalClosure = Closure<dyn FnMut(JsValue)>;

/// The injected provider object plus the closures registered on it.
pub struct BrowserProvider {
    object: JsValue,
    listeners: RefCell<Vec<(ListenerId, Vec<(&'static str, SignalClosure)>)>>,
    next_listener: Cell<u64>,
}

impl BrowserProvider {
    pub fn new(object: JsValue) -> Self {
        Self {
            object,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
        }
    }

    fn method(&self, name: &str) -> Result<Function, JsValue> {
        Reflect::get(&self.object, &JsValue::from_str(name))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str(&format!("provider has no {}()", name)))
    }
}

/// JS rejection `{code, message}` into a refusal. No numeric code means a transport failure.
fn rpc_error(err: JsValue) -> RpcError {
    let code = Reflect::get(&err, &JsValue::from_str("code")).ok().and_then(|c| c.as_f64());
    let message = Reflect::get(&err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string());
    RpcError::from_rejection(code, message)
}

fn to_signal(event: &str, payload: JsValue) -> Option<ProviderSignal> {
    match event {
        events::ACCOUNTS_CHANGED => serde_wasm_bindgen::from_value(payload)
            .ok()
            .map(ProviderSignal::AccountsChanged),
        events::CHAIN_CHANGED => payload.as_string().map(ProviderSignal::ChainChanged),
        events::CONNECT => Reflect::get(&payload, &JsValue::from_str("chainId"))
            .ok()
            .and_then(|c| c.as_string())
            .map(|chain_id| ProviderSignal::Connect { chain_id }),
        events::DISCONNECT => Some(ProviderSignal::Disconnect(rpc_error(payload))),
        _ => None,
    }
}

#[async_trait(?Send)]
impl Provider for BrowserProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let internal = |e: JsValue| RpcError::transport(format!("{:?}", e));

        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let params = params
            .serialize(&serializer)
            .map_err(|e| RpcError::transport(e.to_string()))?;
        let args = js_sys::Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method)).map_err(internal)?;
        Reflect::set(&args, &JsValue::from_str("params"), &params).map_err(internal)?;

        let request = self.method("request").map_err(internal)?;
        let promise = request
            .call1(&self.object, &args)
            .map_err(rpc_error)?
            .dyn_into::<Promise>()
            .map_err(internal)?;
        let result = JsFuture::from(promise).await.map_err(rpc_error)?;

        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|e| RpcError::transport(e.to_string()))
    }

    fn subscribe(&self, sink: SignalSink) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        let on = match self.method("on") {
            Ok(on) => Some(on),
            Err(e) => {
                warn!(error = ?e, "provider cannot be subscribed to");
                None
            }
        };
        let mut closures = Vec::with_capacity(events::ALL.len());
        for &event in events::ALL {
            let sink = sink.clone();
            let closure = SignalClosure::new(move |payload: JsValue| match to_signal(event, payload) {
                Some(signal) => sink(signal),
                None => warn!(event, "ignoring malformed provider signal"),
            });
            if let Some(on) = &on {
                let _ = on.call2(&self.object, &JsValue::from_str(event), closure.as_ref().unchecked_ref());
            }
            closures.push((event, closure));
        }
        self.listeners.borrow_mut().push((id, closures));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            match listeners.iter().position(|(existing, _)| *existing == id) {
                Some(pos) => listeners.remove(pos).1,
                None => return,
            }
        };
        let Ok(remove) = self.method("removeListener") else {
            return;
        };
        for (event, closure) in &removed {
            let _ = remove.call2(&self.object, &JsValue::from_str(event), closure.as_ref().unchecked_ref());
        }
    }
}
