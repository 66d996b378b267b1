use chartisan_wasm::fetch::Fetcher;
use chartisan_wasm::models::{
    ChartState, ChartisanOptions, RequestInit, ServerData, UpdateOptions, DEFAULTS,
};
use chartisan_wasm::renderers::REFRESH_CLASS;
use chartisan_wasm::shell::memory::{MemoryDom, NodeId};
use chartisan_wasm::shell::{Dom, MountTarget};
use chartisan_wasm::{Chartisan, ChartisanError, DataSource, Hooks, Renderer, Result, Runtime};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Renderer recording what it was handed
#[derive(Default)]
struct LabelRenderer {
    foreground: Vec<Vec<String>>,
    background: Vec<Vec<String>>,
}

impl Renderer<NodeId> for LabelRenderer {
    type Data = Vec<String>;

    fn format_data(&self, server: &ServerData) -> Vec<String> {
        server.chart.labels.clone()
    }

    fn on_update(&mut self, _body: &NodeId, data: Vec<String>, _extra: Option<&Value>) {
        self.foreground.push(data);
    }

    fn on_background_update(&mut self, _body: &NodeId, data: Vec<String>, _extra: Option<&Value>) {
        self.background.push(data);
    }
}

type Callback = Rc<RefCell<Option<Box<dyn FnOnce()>>>>;

/// Renderer that runs a one-shot callback from inside `on_update`
struct CallbackRenderer {
    seen: Vec<Vec<String>>,
    callback: Callback,
}

impl Renderer<NodeId> for CallbackRenderer {
    type Data = Vec<String>;

    fn format_data(&self, server: &ServerData) -> Vec<String> {
        server.chart.labels.clone()
    }

    fn on_update(&mut self, _body: &NodeId, data: Vec<String>, _extra: Option<&Value>) {
        self.seen.push(data);
        let callback = self.callback.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn on_background_update(&mut self, _body: &NodeId, _data: Vec<String>, _extra: Option<&Value>) {}
}

/// Fetcher whose responses are released by the test
#[derive(Clone, Default)]
struct ManualFetcher {
    pending: Rc<RefCell<Vec<oneshot::Sender<Result<Value>>>>>,
    requests: Rc<RefCell<Vec<(String, RequestInit)>>>,
}

impl ManualFetcher {
    fn respond(&self, index: usize, payload: Result<Value>) {
        let sender = std::mem::replace(&mut self.pending.borrow_mut()[index], oneshot::channel().0);
        let _ = sender.send(payload);
    }

    fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Fetcher for ManualFetcher {
    fn fetch(&self, url: &str, request: &RequestInit) -> LocalBoxFuture<'static, Result<Value>> {
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().push(tx);
        self.requests.borrow_mut().push((url.to_string(), request.clone()));
        async move {
            rx.await
                .unwrap_or_else(|_| Err(ChartisanError::Network("cancelled".to_string())))
        }
        .boxed_local()
    }
}

struct Page {
    dom: MemoryDom,
    pool: LocalPool,
    fetcher: ManualFetcher,
}

impl Page {
    fn new() -> Self {
        let dom = MemoryDom::new();
        dom.add_element(dom.root(), "div", Some("sales"), &["chart"]);
        Self {
            dom,
            pool: LocalPool::new(),
            fetcher: ManualFetcher::default(),
        }
    }

    fn runtime(&self) -> Runtime {
        Runtime::new(self.fetcher.clone(), self.pool.spawner())
    }

    fn mount(&self, options: ChartisanOptions) -> Result<Chartisan<MemoryDom, LabelRenderer>> {
        self.mount_with_hooks(options, Hooks::new())
    }

    fn mount_with_hooks(
        &self,
        options: ChartisanOptions,
        hooks: Hooks<Vec<String>>,
    ) -> Result<Chartisan<MemoryDom, LabelRenderer>> {
        Chartisan::new(self.dom.clone(), LabelRenderer::default(), options, hooks, self.runtime())
    }
}

fn envelope(labels: &[&str]) -> Value {
    json!({
        "chart": { "labels": labels },
        "datasets": [{ "name": "Sales", "values": [1, 2, 3] }]
    })
}

#[test]
fn test_mount_failure_happens_before_any_request() {
    let page = Page::new();
    let options = ChartisanOptions::default().el("#missing").url("/api/chart");
    let err = page.mount(options).err().unwrap();

    assert_eq!(
        err,
        ChartisanError::MountTargetNotFound {
            selector: "#missing".to_string()
        }
    );
    assert_eq!(page.fetcher.request_count(), 0);
}

#[test]
fn test_url_fetches_with_request_options() {
    let mut page = Page::new();
    let request = RequestInit::default().header("Accept", "application/json");
    let options = ChartisanOptions::default().el("#sales").url("/api/chart").request(request.clone());
    let chart = page.mount(options).unwrap();

    assert_eq!(chart.state(), ChartState::Loading);
    assert_eq!(
        page.fetcher.requests.borrow().as_slice(),
        &[("/api/chart".to_string(), request)]
    );

    page.fetcher.respond(0, Ok(envelope(&["Jan", "Feb"])));
    page.pool.run_until_stalled();

    assert_eq!(chart.state(), ChartState::Show);
    chart.with_renderer(|r| assert_eq!(r.foreground, vec![vec!["Jan", "Feb"]]));
}

#[test]
fn test_stale_response_is_discarded() {
    let mut page = Page::new();
    let chart = page.mount(ChartisanOptions::default().url("/slow")).unwrap();
    chart.update(UpdateOptions::new().url("/fast"));
    assert_eq!(page.fetcher.request_count(), 2);

    page.fetcher.respond(1, Ok(envelope(&["fresh"])));
    page.pool.run_until_stalled();
    page.fetcher.respond(0, Ok(envelope(&["stale"])));
    page.pool.run_until_stalled();

    assert_eq!(chart.state(), ChartState::Show);
    chart.with_renderer(|r| assert_eq!(r.foreground, vec![vec!["fresh"]]));
}

#[test]
fn test_stale_failure_does_not_override_show() {
    let mut page = Page::new();
    let chart = page.mount(ChartisanOptions::default().url("/a")).unwrap();
    chart.update(UpdateOptions::new().url("/b"));

    page.fetcher.respond(1, Ok(envelope(&["b"])));
    page.pool.run_until_stalled();
    page.fetcher.respond(0, Err(ChartisanError::Network("timeout".to_string())));
    page.pool.run_until_stalled();

    assert_eq!(chart.state(), ChartState::Show);
}

#[test]
fn test_background_update_over_network() {
    let mut page = Page::new();
    let chart = page.mount(ChartisanOptions::default().url("/api/chart")).unwrap();
    page.fetcher.respond(0, Ok(envelope(&["a"])));
    page.pool.run_until_stalled();

    chart.update(UpdateOptions::new().background(true));
    assert_eq!(chart.state(), ChartState::Show);
    assert_eq!(page.dom.style(chart.overlay(), "display").as_deref(), Some("none"));

    page.fetcher.respond(1, Ok(envelope(&["b"])));
    page.pool.run_until_stalled();
    chart.with_renderer(|r| {
        assert_eq!(r.foreground.len(), 1);
        assert_eq!(r.background, vec![vec!["b"]]);
    });
}

#[test]
fn test_new_url_replaces_static_data() {
    let mut page = Page::new();
    let chart = page
        .mount(ChartisanOptions::default().data(envelope(&["static"])))
        .unwrap();
    assert_eq!(chart.state(), ChartState::Show);
    assert_eq!(page.fetcher.request_count(), 0);

    chart.update(UpdateOptions::new().url("/api/chart"));
    assert_eq!(chart.url().as_deref(), Some("/api/chart"));
    assert_eq!(page.fetcher.request_count(), 1);

    page.fetcher.respond(0, Ok(envelope(&["remote"])));
    page.pool.run_until_stalled();
    chart.refresh();
    assert_eq!(page.fetcher.request_count(), 2);
}

#[test]
fn test_lazy_data_is_invoked_per_update() {
    let page = Page::new();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let source = DataSource::lazy(move || {
        counter.set(counter.get() + 1);
        ServerData::from_value(envelope(&["x"])).unwrap_or_default()
    });
    let chart = page.mount(ChartisanOptions::default().data(source)).unwrap();
    chart.refresh();

    assert_eq!(calls.get(), 2);
    assert_eq!(page.fetcher.request_count(), 0);
    chart.with_renderer(|r| assert_eq!(r.foreground.len(), 2));
}

#[test]
fn test_invalid_static_data_shows_error() {
    let page = Page::new();
    let chart = page
        .mount(ChartisanOptions::default().data(json!({ "chart": {}, "datasets": [] })))
        .unwrap();

    assert_eq!(chart.state(), ChartState::Error);
    let html = page.dom.inner_html(chart.overlay());
    assert!(html.contains("There was an error"));
    assert!(html.contains("chartisan-help-text-error"));
}

#[test]
fn test_error_message_hidden_without_debug() {
    let mut page = Page::new();
    let options =
        ChartisanOptions::from_json(&json!({ "url": "/api", "error": { "debug": false } }), &DEFAULTS)
            .unwrap();
    let chart = page.mount(options).unwrap();
    page.fetcher.respond(0, Err(ChartisanError::Network("secret detail".to_string())));
    page.pool.run_until_stalled();

    assert_eq!(chart.state(), ChartState::Error);
    let html = page.dom.inner_html(chart.overlay());
    assert!(html.contains("There was an error"));
    assert!(!html.contains("secret detail"));
}

#[test]
fn test_retry_refetches_and_recovers() {
    let mut page = Page::new();
    let chart = page.mount(ChartisanOptions::default().url("/api/chart")).unwrap();
    page.fetcher.respond(0, Err(ChartisanError::Network("offline".to_string())));
    page.pool.run_until_stalled();
    assert_eq!(chart.state(), ChartState::Error);

    let refresh = page.dom.find_by_class(&chart.overlay(), REFRESH_CLASS).unwrap();
    assert!(page.dom.click(refresh));
    assert_eq!(page.fetcher.request_count(), 2);
    assert_eq!(page.dom.listener_count(refresh), 0);

    page.fetcher.respond(1, Ok(envelope(&["back"])));
    page.pool.run_until_stalled();
    assert_eq!(chart.state(), ChartState::Show);
    chart.with_renderer(|r| assert_eq!(r.foreground, vec![vec!["back"]]));
}

#[test]
fn test_hooks_are_deterministic_and_ordered() {
    let page = Page::new();
    let hooks = Hooks::<Vec<String>>::new()
        .append(|ctx| ctx.data.into_iter().map(|l| l.to_uppercase()).collect())
        .append(|mut ctx| {
            ctx.data.push(format!("{} datasets", ctx.server.datasets.len()));
            ctx.data
        });
    let chart = page
        .mount_with_hooks(ChartisanOptions::default().data(envelope(&["q1", "q2"])), hooks)
        .unwrap();
    chart.refresh();

    chart.with_renderer(|r| {
        assert_eq!(r.foreground[0], vec!["Q1", "Q2", "1 datasets"]);
        assert_eq!(r.foreground[0], r.foreground[1]);
    });
}

#[test]
fn test_failing_hook_shows_error() {
    let page = Page::new();
    let hooks = Hooks::<Vec<String>>::new()
        .try_append(|_| Err(ChartisanError::Hook("no axis".to_string())));
    let chart = page
        .mount_with_hooks(ChartisanOptions::default().data(envelope(&["a"])), hooks)
        .unwrap();

    assert_eq!(chart.state(), ChartState::Error);
    assert!(page.dom.inner_html(chart.overlay()).contains("no axis"));
    chart.with_renderer(|r| assert!(r.foreground.is_empty()));
}

#[test]
fn test_dropped_chart_ignores_late_response() {
    let mut page = Page::new();
    let chart = page.mount(ChartisanOptions::default().url("/api/chart")).unwrap();
    let body = chart.body();
    drop(chart);

    page.fetcher.respond(0, Ok(envelope(&["late"])));
    page.pool.run_until_stalled();
    assert!(page.dom.children(body).is_empty());
}

fn callback_chart(page: &Page) -> (Chartisan<MemoryDom, CallbackRenderer>, Callback) {
    let callback = Callback::default();
    let renderer = CallbackRenderer {
        seen: Vec::new(),
        callback: callback.clone(),
    };
    let options = ChartisanOptions::default().data(envelope(&["a"]));
    let chart =
        Chartisan::new(page.dom.clone(), renderer, options, Hooks::new(), page.runtime()).unwrap();
    (chart, callback)
}

#[test]
fn test_renderer_reads_state_during_update() {
    let page = Page::new();
    let (chart, callback) = callback_chart(&page);

    let observed = Rc::new(Cell::new(None));
    let (handle, seen) = (chart.clone(), observed.clone());
    *callback.borrow_mut() = Some(Box::new(move || {
        seen.set(Some(handle.state()));
        assert_eq!(handle.url(), None);
        assert!(handle.with_renderer(|_| ()).is_none());
    }));
    chart.refresh();

    assert_eq!(observed.get(), Some(ChartState::Show));
}

#[test]
fn test_renderer_can_start_update_during_update() {
    let mut page = Page::new();
    let (chart, callback) = callback_chart(&page);

    let handle = chart.clone();
    *callback.borrow_mut() = Some(Box::new(move || {
        handle.update(UpdateOptions::new().data(envelope(&["nested"])));
    }));
    chart.refresh();
    page.pool.run_until_stalled();

    assert_eq!(chart.state(), ChartState::Show);
    chart.with_renderer(|r| {
        assert_eq!(r.seen, vec![vec!["a"], vec!["a"], vec!["nested"]]);
    });
}

#[test]
fn test_hooks_can_read_the_chart() {
    let page = Page::new();
    let slot: Rc<RefCell<Option<Chartisan<MemoryDom, LabelRenderer>>>> = Rc::default();
    let urls = Rc::new(RefCell::new(Vec::new()));

    let (chart_slot, seen) = (slot.clone(), urls.clone());
    let hooks = Hooks::<Vec<String>>::new().append(move |ctx| {
        if let Some(chart) = chart_slot.borrow().as_ref() {
            seen.borrow_mut().push((chart.state(), chart.url()));
        }
        ctx.data
    });
    let chart = page
        .mount_with_hooks(ChartisanOptions::default().data(envelope(&["a"])), hooks)
        .unwrap();
    *slot.borrow_mut() = Some(chart.clone());
    chart.refresh();
    slot.borrow_mut().take();

    assert_eq!(urls.borrow().as_slice(), &[(ChartState::Loading, None)]);
}

#[test]
fn test_attach_to_element() {
    let page = Page::new();
    let host = page.dom.add_element(page.dom.root(), "section", None, &[]);
    let chart = Chartisan::attach(
        MountTarget::Node(host),
        page.dom.clone(),
        LabelRenderer::default(),
        ChartisanOptions::default().el("#does-not-exist").data(envelope(&["a"])),
        Hooks::new(),
        page.runtime(),
    )
    .unwrap();

    assert_eq!(chart.state(), ChartState::Show);
    let container = page.dom.children(host)[0];
    assert_eq!(page.dom.children(container), vec![chart.body(), chart.overlay()]);
}

#[test]
fn test_request_init_reaches_fetcher() {
    let page = Page::new();
    let options = ChartisanOptions::from_json(
        &json!({
            "url": "/api/chart",
            "requestInit": { "method": "POST", "headers": { "X-Token": "abc" } }
        }),
        &DEFAULTS,
    )
    .unwrap();
    page.mount(options).unwrap();

    let requests = page.fetcher.requests.borrow();
    let (url, request) = &requests[0];
    assert_eq!(url, "/api/chart");
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.headers,
        BTreeMap::from([("X-Token".to_string(), "abc".to_string())])
    );
}

#[test]
fn test_injected_defaults_drive_overlay() {
    let page = Page::new();
    let mut defaults = DEFAULTS.clone();
    defaults.el = "#sales".to_string();
    defaults.loader.text = "Hold on".to_string();
    defaults.overlay_color = "#1a202c".to_string();

    let chart = page
        .mount(ChartisanOptions::new(&defaults).url("/api/chart"))
        .unwrap();

    assert_eq!(chart.state(), ChartState::Loading);
    let overlay = chart.overlay();
    assert!(page.dom.inner_html(overlay).contains("Hold on"));
    assert_eq!(
        page.dom.style(overlay, "background-color").as_deref(),
        Some("#1a202c")
    );
}
