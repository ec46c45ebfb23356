//! Browser runtime: `setTimeout` timers, microtask-driven local tasks

use chrono::{DateTime, Utc};
use futures::future::{FutureExt, LocalBoxFuture};
use std::time::Duration;
use tracing::warn;
use wasm_bindgen_futures::JsFuture;

use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserRuntime;

impl BrowserRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl Runtime for BrowserRuntime {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window()
                .map(|w| w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms));
            if !matches!(scheduled, Some(Ok(_))) {
                warn!(ms, "setTimeout unavailable, timer will not fire");
            }
        });
        async move {
            let _ = JsFuture::from(promise).await;
        }
        .boxed_local()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
