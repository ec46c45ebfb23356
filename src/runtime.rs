//! Runtime - clock, timers and local task spawning
//!
//! Everything runs on one thread. Tasks are `!Send` local futures.

use chrono::{DateTime, Utc};
use futures::future::LocalBoxFuture;
use std::time::Duration;

pub trait Runtime {
    fn now(&self) -> DateTime<Utc>;

    /// Future resolving after `duration`.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;

    /// Run `task` to completion in the background.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

#[cfg(feature = "native")]
pub use tokio_runtime::TokioRuntime;

#[cfg(feature = "native")]
mod tokio_runtime {
    use super::Runtime;
    use chrono::{DateTime, Utc};
    use futures::future::{FutureExt, LocalBoxFuture};
    use std::time::Duration;

    /// Tokio-backed runtime. Spawning requires an enclosing `tokio::task::LocalSet`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct TokioRuntime;

    impl TokioRuntime {
        pub fn new() -> Self {
            Self
        }
    }

    impl Runtime for TokioRuntime {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }

        fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
            tokio::time::sleep(duration).boxed_local()
        }

        fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
            tokio::task::spawn_local(task);
        }
    }
}

#[cfg(all(test, feature = "native"))]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn tokio_runtime_runs_spawned_sleepers() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let local = tokio::task::LocalSet::new();
        let fired = Rc::new(Cell::new(false));

        local.block_on(&rt, async {
            let runtime = TokioRuntime::new();
            let flag = fired.clone();
            let sleep = runtime.sleep(Duration::from_millis(5));
            runtime.spawn(Box::pin(async move {
                sleep.await;
                flag.set(true);
            }));
            tokio::time::sleep(Duration::from_millis(50)).await;
        });

        assert!(fired.get());
    }
}
