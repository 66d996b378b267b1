//! Execution environment of a controller
//!
//! Everything after construction runs as reactions to network completions
//! and clicks. A [`Runtime`] bundles how requests are made and where the
//! resulting futures are driven.

use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::fetch::Fetcher;

/// Drives acquisition futures on the current thread
pub trait Spawner {
    fn spawn(&self, future: LocalBoxFuture<'static, ()>);
}

impl Spawner for futures::executor::LocalSpawner {
    fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
        use futures::task::LocalSpawnExt;
        if let Err(err) = self.spawn_local(future) {
            log::error!("failed to spawn acquisition: {}", err);
        }
    }
}

/// Spawns on the browser microtask queue
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmSpawner;

#[cfg(target_arch = "wasm32")]
impl Spawner for WasmSpawner {
    fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(future);
    }
}

/// Transport plus executor
#[derive(Clone)]
pub struct Runtime {
    pub fetcher: Rc<dyn Fetcher>,
    pub spawner: Rc<dyn Spawner>,
}

impl Runtime {
    pub fn new(fetcher: impl Fetcher + 'static, spawner: impl Spawner + 'static) -> Self {
        Self {
            fetcher: Rc::new(fetcher),
            spawner: Rc::new(spawner),
        }
    }

    /// gloo-net transport on the browser event loop
    #[cfg(target_arch = "wasm32")]
    pub fn browser() -> Self {
        Self::new(crate::fetch::GlooFetcher, WasmSpawner)
    }
}
