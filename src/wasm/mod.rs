//! WASM module: the wallet selector in the browser
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        WalletSelector (JS API)          │
//! │  start, connect, switchChain, onChange  │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │               Client                    │
//! │  registry · session · switch · submit   │
//! └──────┬──────────┬──────────────┬────────┘
//!        │          │              │
//!  WindowDiscovery  BrowserProvider  LocalStorage / BrowserRuntime
//!  (window events)  (EIP-1193 obj)   (localStorage / setTimeout)
//! ```

mod client;
mod discovery;
mod provider;
mod runtime;
mod storage;

pub use client::WalletSelector;
pub use discovery::WindowDiscovery;
pub use provider::BrowserProvider;
pub use runtime::BrowserRuntime;
pub use storage::LocalStorage;

use std::io;
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::prelude::*;

/// Initialize WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // No system clock in wasm32-unknown-unknown; the console stamps lines itself.
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .without_time()
        .with_writer(ConsoleWriter)
        .try_init();
}

/// Log to browser console
pub fn console_log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

/// One `console.log` call per formatted event.
#[derive(Clone, Copy)]
struct ConsoleWriter;

struct ConsoleLine(Vec<u8>);

impl io::Write for ConsoleLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.0);
        let line = line.trim_end();
        if !line.is_empty() {
            console_log(line);
        }
    }
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine(Vec::new())
    }
}
