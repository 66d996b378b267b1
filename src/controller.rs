//! Chart controller
//!
//! Orchestrates data acquisition (static or remote), validation, formatting,
//! the hook pipeline, overlay state and dispatch to the [`Renderer`].
//!
//! ```text
//!            update()                 ok
//! Initializing ───────► Loading ─────────────► Show
//!                          │  ▲                 │ update()
//!                     err  │  │ retry click     ▼
//!                          ▼  │              Loading ...
//!                         Error
//! ```
//!
//! Background updates skip `Loading` entirely. Every acquisition carries a
//! sequence number; an outcome older than the last applied one is
//! discarded, so overlapping requests cannot roll the chart back.
//!
//! Renderer and hooks run with no controller state borrowed, so they may
//! read the state or start another update. An outcome that arrives while
//! the renderer is inside one of its own callbacks is applied on the next
//! turn of the executor.

use futures::future::FutureExt;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ChartisanError, Result};
use crate::hooks::Hooks;
use crate::models::data::ServerData;
use crate::models::options::{ChartisanOptions, DataSource, UpdateOptions};
use crate::models::state::ChartState;
use crate::renderers::{render_error, render_loader, Renderer};
use crate::runtime::Runtime;
use crate::shell::{Dom, MountTarget, OverlayOptions, Shell, Subscription};

struct Inner<D: Dom> {
    options: ChartisanOptions,
    state: ChartState,
    shell: Shell<D>,
    runtime: Runtime,
    /// Active retry listener, only while in `Error`
    retry: Option<Subscription>,
    /// Last sequence number handed out
    issued: u64,
    /// Sequence number of the last outcome applied
    applied: u64,
}

struct Shared<D, R>
where
    D: Dom,
    R: Renderer<D::Node>,
{
    inner: RefCell<Inner<D>>,
    renderer: RefCell<R>,
    hooks: Hooks<R::Data>,
}

/// Controller of one chart widget
pub struct Chartisan<D, R>
where
    D: Dom,
    R: Renderer<D::Node>,
{
    shared: Rc<Shared<D, R>>,
}

impl<D, R> Clone for Chartisan<D, R>
where
    D: Dom,
    R: Renderer<D::Node>,
{
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<D, R> Chartisan<D, R>
where
    D: Dom + 'static,
    R: Renderer<D::Node> + 'static,
    R::Data: 'static,
{
    /// Create a controller mounted under the element matching `options.el`.
    ///
    /// Mounts the shell and starts the first acquisition. Fails only when
    /// the mount element does not exist.
    pub fn new(
        dom: D,
        renderer: R,
        options: ChartisanOptions,
        hooks: Hooks<R::Data>,
        runtime: Runtime,
    ) -> Result<Self> {
        let target = MountTarget::Selector(options.el.clone());
        Self::attach(target, dom, renderer, options, hooks, runtime)
    }

    /// Create a controller mounted under `target`, ignoring `options.el`
    pub fn attach(
        target: MountTarget<D::Node>,
        dom: D,
        renderer: R,
        options: ChartisanOptions,
        hooks: Hooks<R::Data>,
        runtime: Runtime,
    ) -> Result<Self> {
        let shell = Shell::mount(dom, target)?;
        let initial = UpdateOptions::from(&options);

        let chart = Self {
            shared: Rc::new(Shared {
                inner: RefCell::new(Inner {
                    options,
                    state: ChartState::Initializing,
                    shell,
                    runtime,
                    retry: None,
                    issued: 0,
                    applied: 0,
                }),
                renderer: RefCell::new(renderer),
                hooks,
            }),
        };
        log::info!("chart created ({} hooks)", chart.shared.hooks.len());

        chart.update(initial);
        Ok(chart)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChartState {
        self.shared.inner.borrow().state
    }

    /// Currently persisted url
    pub fn url(&self) -> Option<String> {
        self.shared.inner.borrow().options.url.clone()
    }

    /// Node the renderer draws into
    pub fn body(&self) -> D::Node {
        self.shared.inner.borrow().shell.body().clone()
    }

    /// Node holding loader and error content
    pub fn overlay(&self) -> D::Node {
        self.shared.inner.borrow().shell.overlay().clone()
    }

    /// Run `f` with the renderer. `None` while the renderer is inside one
    /// of its own callbacks.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> Option<T> {
        self.shared.renderer.try_borrow().ok().map(|renderer| f(&renderer))
    }

    /// Re-run the last configuration
    pub fn refresh(&self) {
        self.update(UpdateOptions::default());
    }

    /// Acquire data and update the chart.
    ///
    /// `url` and `request` replace the persisted values. With `data` no
    /// request is made; a new `url` switches back to remote data. An update
    /// with neither re-uses whatever source was last configured.
    pub fn update(&self, options: UpdateOptions) {
        let UpdateOptions {
            url,
            request,
            data,
            background,
            additional,
        } = options;

        let (seq, source) = {
            let mut inner = self.shared.inner.borrow_mut();
            if let Some(url) = url {
                inner.options.url = Some(url).filter(|url| !url.is_empty());
                inner.options.data = None;
            }
            if let Some(request) = request {
                inner.options.request = request;
            }
            if let Some(data) = data {
                inner.options.data = Some(data);
            }
            inner.issued += 1;
            (inner.issued, inner.options.data.clone())
        };

        log::debug!("update #{} (background: {})", seq, background);
        match source {
            Some(source) => self.acquire_static(seq, source, background, additional),
            None => self.acquire_remote(seq, background, additional),
        }
    }

    /// Release the retry listener and let the renderer tear down
    pub fn destroy(&self) {
        let retry = self.shared.inner.borrow_mut().retry.take();
        drop(retry);

        let body = self.body();
        match self.shared.renderer.try_borrow_mut() {
            Ok(mut renderer) => renderer.destroy(&body),
            Err(_) => self.defer(move |chart| {
                if let Ok(mut renderer) = chart.shared.renderer.try_borrow_mut() {
                    renderer.destroy(&body);
                }
            }),
        }
        log::info!("chart destroyed");
    }

    fn acquire_static(
        &self,
        seq: u64,
        source: DataSource,
        background: bool,
        additional: Option<serde_json::Value>,
    ) {
        if !background {
            self.change_to(ChartState::Loading, None);
        }
        let outcome = source.resolve();
        self.settle(seq, outcome, background, additional);
    }

    fn acquire_remote(&self, seq: u64, background: bool, additional: Option<serde_json::Value>) {
        let url = self.url();
        let Some(url) = url else {
            self.settle(seq, Err(ChartisanError::MissingUrl), background, additional);
            return;
        };

        if !background {
            self.change_to(ChartState::Loading, None);
        }

        let (request, spawner) = {
            let inner = self.shared.inner.borrow();
            let request = inner.runtime.fetcher.fetch(&url, &inner.options.request);
            (request, inner.runtime.spawner.clone())
        };

        let weak = Rc::downgrade(&self.shared);
        spawner.spawn(
            async move {
                let outcome = request.await.and_then(ServerData::from_value);
                match weak.upgrade() {
                    Some(shared) => Chartisan { shared }.settle(seq, outcome, background, additional),
                    None => log::debug!("chart dropped before #{} resolved", seq),
                }
            }
            .boxed_local(),
        );
    }

    // Run `f` on a later turn of the executor, if the chart is still alive
    fn defer(&self, f: impl FnOnce(Chartisan<D, R>) + 'static) {
        let weak = Rc::downgrade(&self.shared);
        let spawner = self.shared.inner.borrow().runtime.spawner.clone();
        spawner.spawn(
            async move {
                if let Some(shared) = weak.upgrade() {
                    f(Chartisan { shared });
                }
            }
            .boxed_local(),
        );
    }

    fn is_stale(&self, seq: u64) -> bool {
        let applied = self.shared.inner.borrow().applied;
        if seq < applied {
            log::debug!("discarding stale result #{} (applied #{})", seq, applied);
        }
        seq < applied
    }

    // Apply the outcome of acquisition `seq`
    fn settle(
        &self,
        seq: u64,
        outcome: Result<ServerData>,
        background: bool,
        additional: Option<serde_json::Value>,
    ) {
        // Called from inside a renderer callback
        if self.shared.renderer.try_borrow_mut().is_err() {
            log::debug!("renderer busy, deferring result #{}", seq);
            return self.defer(move |chart| chart.settle(seq, outcome, background, additional));
        }

        if self.is_stale(seq) {
            return;
        }
        self.shared.inner.borrow_mut().applied = seq;

        let data = outcome.and_then(|server| {
            let data = self.shared.renderer.borrow().format_data(&server);
            self.shared.hooks.apply(data, &server)
        });

        // A hook may have started a newer acquisition
        if self.is_stale(seq) {
            return;
        }

        let data = match data {
            Ok(data) => data,
            Err(err) => return self.on_error(err),
        };

        self.change_to(ChartState::Show, None);

        let body = self.body();
        let mut renderer = self.shared.renderer.borrow_mut();
        if background {
            renderer.on_background_update(&body, data, additional.as_ref());
        } else {
            renderer.on_update(&body, data, additional.as_ref());
        }
    }

    fn on_error(&self, err: ChartisanError) {
        if err.is_acquisition_error() {
            log::warn!("chart acquisition failed: {}", err);
        } else {
            log::error!("chart update failed: {}", err);
        }
        self.change_to(ChartState::Error, Some(&err));
    }

    /// Changes the state of the chart and the overlay with it
    fn change_to(&self, state: ChartState, err: Option<&ChartisanError>) {
        let mut inner = self.shared.inner.borrow_mut();
        // Any previous retry listener is released on every transition
        let previous = inner.retry.take();

        let result = match state {
            ChartState::Initializing | ChartState::Loading => render_loader(&inner.options.loader)
                .and_then(|html| {
                    inner.shell.set_overlay(OverlayOptions::shown(
                        html,
                        inner.options.overlay_color.clone(),
                    ))
                }),
            ChartState::Show => inner.shell.set_overlay(OverlayOptions::hidden()),
            ChartState::Error => {
                let message = err.map_or_else(|| "Unknown Error".to_string(), ToString::to_string);
                let shown = render_error(&inner.options.error, &message).and_then(|html| {
                    inner.shell.set_overlay(OverlayOptions::shown(
                        html,
                        inner.options.overlay_color.clone(),
                    ))
                });
                shown
                    .and_then(|_| inner.shell.bind_retry(self.retry_handler()))
                    .map(|token| inner.retry = token)
            }
        };
        inner.state = state;
        drop(inner);
        drop(previous);

        if let Err(err) = result {
            log::error!("failed to switch chart to '{}': {}", state, err);
        }
    }

    fn retry_handler(&self) -> Box<dyn FnOnce()> {
        let weak = Rc::downgrade(&self.shared);
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                log::info!("retrying chart acquisition");
                Chartisan { shared }.update(UpdateOptions::default());
            }
        })
    }
}
