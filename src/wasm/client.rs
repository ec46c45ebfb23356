//! WalletSelector: the JS-facing client

use futures::StreamExt;
use js_sys::{Function, Promise};
use serde::Serialize;
use std::fmt::Display;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use super::discovery::WindowDiscovery;
use super::runtime::BrowserRuntime;
use super::storage::LocalStorage;
use crate::client::Client;
use crate::config::ClientConfig;
use crate::core::{networks, ChainId};

fn js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).map_err(js_error)
}

/// Wallet discovery, connection and network switching for the page.
///
/// ```javascript
/// const selector = new WalletSelector();
/// selector.onChange((state) => render(state));
/// selector.start();
/// await selector.connect(selector.wallets()[0].uuid);
/// await selector.switchChain(4202);
/// const hash = await selector.sendTransaction("0xabc...", "0.01");
/// ```
#[wasm_bindgen]
pub struct WalletSelector {
    client: Rc<Client>,
}

#[wasm_bindgen]
impl WalletSelector {
    /// `config`: optional JSON, e.g. `{"unsupportedChainPolicy":"switch"}`.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<WalletSelector, JsValue> {
        let config = match config {
            Some(raw) if !raw.trim().is_empty() => ClientConfig::from_json(&raw).map_err(js_error)?,
            _ => ClientConfig::default(),
        };
        let discovery = Rc::new(WindowDiscovery::new()?);
        let store = Rc::new(LocalStorage::new().map_err(js_error)?);
        let client = Client::new(config, discovery, store, Rc::new(BrowserRuntime::new()));
        Ok(Self { client: Rc::new(client) })
    }

    pub fn start(&self) {
        self.client.start();
    }

    pub fn stop(&self) {
        self.client.stop();
    }

    /// Announced wallets: `[{uuid, name, icon, rdns}]`.
    pub fn wallets(&self) -> Result<JsValue, JsValue> {
        to_js(&self.client.wallets())
    }

    /// Resolves to the session snapshot.
    pub fn connect(&self, uuid: String) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            let snapshot = client.connect(&uuid).await.map_err(js_error)?;
            to_js(&snapshot)
        })
    }

    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    #[wasm_bindgen(js_name = "switchChain")]
    pub fn switch_chain(&self, chain_id: f64) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            if !(chain_id.is_finite() && chain_id >= 1.0 && chain_id.fract() == 0.0) {
                return Err(js_error(format!("invalid chain id {}", chain_id)));
            }
            let outcome = client
                .switch_chain(ChainId(chain_id as u64))
                .await
                .map_err(js_error)?;
            Ok(JsValue::from_str(&format!("{:?}", outcome).to_lowercase()))
        })
    }

    /// Resolves to the transaction hash.
    #[wasm_bindgen(js_name = "sendTransaction")]
    pub fn send_transaction(&self, to: String, amount: String) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            let hash = client.send(&to, &amount).await.map_err(js_error)?;
            Ok(JsValue::from_str(&hash))
        })
    }

    #[wasm_bindgen(js_name = "refreshBalance")]
    pub fn refresh_balance(&self) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move {
            client.refresh_balance().await.map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.client.snapshot())
    }

    /// Invoke `callback(snapshot)` after every session change.
    #[wasm_bindgen(js_name = "onChange")]
    pub fn on_change(&self, callback: Function) {
        let mut changes = self.client.watch();
        wasm_bindgen_futures::spawn_local(async move {
            while let Some(snapshot) = changes.next().await {
                if let Ok(value) = to_js(&snapshot) {
                    let _ = callback.call1(&JsValue::NULL, &value);
                }
            }
        });
    }

    /// `wallet_addEthereumChain` records of every supported network.
    #[wasm_bindgen(js_name = "supportedNetworks")]
    pub fn supported_networks() -> Result<JsValue, JsValue> {
        let networks: Vec<_> = networks::supported_networks().map(|n| n.add_chain_params()).collect();
        to_js(&networks)
    }

    #[wasm_bindgen(js_name = "truncateAddress")]
    pub fn truncate_address(address: &str) -> String {
        crate::core::truncate_address(address)
    }
}
