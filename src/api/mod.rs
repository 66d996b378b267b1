//! JavaScript bindings
//!
//! `ChartisanHandle` wraps a [`Chartisan`] controller mounted in the page
//! document, with a JS object as its rendering backend:
//!
//! ```js
//! const chart = new ChartisanHandle({ el: '#chart', url: '/api/chart' }, {
//!   formatData: (server) => toLibraryModel(server),
//!   onUpdate: (body, data, extra) => draw(body, data),
//!   onBackgroundUpdate: (body, data, extra) => redraw(data),
//!   destroy: (body) => teardown(),
//! })
//! ```
//!
//! Each backend member is optional. Without `formatData` the envelope is
//! passed through unchanged.

pub mod helpers;

use js_sys::{Array, Function, Object, Reflect};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

use crate::controller::Chartisan;
use crate::error::ChartisanError;
use crate::hooks::Hooks;
use crate::models::data::{is_server_data, ServerData};
use crate::models::options::{ChartisanOptions, DataSource, RequestInit, UpdateOptions, DEFAULTS};
use crate::renderers::Renderer;
use crate::runtime::Runtime;
use crate::shell::web::WebDom;
use crate::shell::MountTarget;
use crate::utils::{merge, merge_all, COLOR_PALETTE};
use helpers::{describe, deserialize, serialize, to_js_error};

fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn get_function(target: &JsValue, key: &str) -> Option<Function> {
    get(target, key).dyn_into::<Function>().ok()
}

/// Serialize for a JS callback, falling back to `undefined`
fn to_js(value: &impl serde::Serialize, context: &str) -> JsValue {
    serialize(value, context).unwrap_or(JsValue::UNDEFINED)
}

/// Renderer delegating to a JS backend object
pub struct JsRenderer {
    backend: JsValue,
}

impl JsRenderer {
    pub fn new(backend: JsValue) -> Self {
        Self { backend }
    }

    fn call(&self, name: &str, args: &Array) {
        let Some(f) = get_function(&self.backend, name) else {
            return;
        };
        if let Err(err) = f.apply(&self.backend, args) {
            crate::wasm_error!("backend {} threw: {}", name, describe(&err));
        }
    }
}

impl Renderer<Element> for JsRenderer {
    type Data = JsValue;

    fn format_data(&self, server: &ServerData) -> JsValue {
        let envelope = to_js(&server.to_value(), "Failed to serialize server data");
        let Some(f) = get_function(&self.backend, "formatData") else {
            return envelope;
        };
        f.call1(&self.backend, &envelope).unwrap_or_else(|err| {
            crate::wasm_error!("backend formatData threw: {}", describe(&err));
            JsValue::UNDEFINED
        })
    }

    fn on_update(&mut self, body: &Element, data: JsValue, extra: Option<&Value>) {
        let extra = extra.map_or(JsValue::UNDEFINED, |v| to_js(v, "Failed to serialize extra"));
        self.call("onUpdate", &Array::of3(body, &data, &extra));
    }

    fn on_background_update(&mut self, body: &Element, data: JsValue, extra: Option<&Value>) {
        let extra = extra.map_or(JsValue::UNDEFINED, |v| to_js(v, "Failed to serialize extra"));
        self.call("onBackgroundUpdate", &Array::of3(body, &data, &extra));
    }

    fn destroy(&mut self, body: &Element) {
        self.call("destroy", &Array::of1(body));
    }
}

/// `data` member of an options object: a function or a plain envelope
fn data_source(options: &JsValue) -> Result<Option<DataSource>, JsValue> {
    let data = get(options, "data");
    if data.is_undefined() || data.is_null() {
        return Ok(None);
    }
    if let Some(f) = data.dyn_ref::<Function>() {
        let f = f.clone();
        return Ok(Some(DataSource::Lazy(std::rc::Rc::new(move || {
            let value = f
                .call0(&JsValue::NULL)
                .map_err(|err| ChartisanError::InvalidData(describe(&err)))?;
            serde_wasm_bindgen::from_value::<Value>(value)
                .map_err(|err| ChartisanError::InvalidData(err.to_string()))
        }))));
    }
    deserialize::<Value>(data, "Invalid data option").map(|v| Some(DataSource::Json(v)))
}

/// `hooks` member: an array of `(data, server) => data` functions
fn hooks(options: &JsValue) -> Result<Hooks<JsValue>, JsValue> {
    let list = get(options, "hooks");
    if list.is_undefined() || list.is_null() {
        return Ok(Hooks::new());
    }
    let list = list
        .dyn_into::<Array>()
        .map_err(|_| to_js_error(ChartisanError::Options("hooks must be an array".into())))?;

    list.iter().try_fold(Hooks::new(), |hooks, hook| {
        let hook = hook
            .dyn_into::<Function>()
            .map_err(|_| to_js_error(ChartisanError::Options("hooks must be functions".into())))?;
        Ok(hooks.try_append(move |ctx| {
            let server = serialize(&ctx.server.to_value(), "Failed to serialize server data")
                .map_err(|err| ChartisanError::Hook(describe(&err)))?;
            hook.call2(&JsValue::NULL, &ctx.data, &server)
                .map_err(|err| ChartisanError::Hook(describe(&err)))
        }))
    })
}

/// Plain JSON part of an options object (functions and elements stripped)
fn plain_options(options: &JsValue) -> Result<Value, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok(Value::Object(Default::default()));
    }
    let source = options
        .dyn_ref::<Object>()
        .ok_or_else(|| to_js_error(ChartisanError::Options("options must be an object".into())))?;
    let copy = Object::assign(&Object::new(), source);
    for key in ["data", "hooks"] {
        Reflect::delete_property(&copy, &JsValue::from_str(key))?;
    }
    if !get(options, "el").is_string() {
        Reflect::delete_property(&copy, &JsValue::from_str("el"))?;
    }
    deserialize(copy.into(), "Invalid options")
}

/// A chart controller bound to a page element
#[wasm_bindgen]
pub struct ChartisanHandle {
    chart: Chartisan<WebDom, JsRenderer>,
}

#[wasm_bindgen]
impl ChartisanHandle {
    /// Mount the chart and start the first acquisition. `el` may be a
    /// selector or an element.
    ///
    /// Throws when the `el` selector matches nothing.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue, backend: JsValue) -> Result<ChartisanHandle, JsValue> {
        let mut parsed =
            ChartisanOptions::from_json(&plain_options(&options)?, &DEFAULTS).map_err(to_js_error)?;
        parsed.data = data_source(&options)?;
        let hooks = hooks(&options)?;

        let dom = WebDom::new().map_err(to_js_error)?;
        let renderer = JsRenderer::new(backend);
        let chart = match get(&options, "el").dyn_into::<Element>() {
            Ok(element) => Chartisan::attach(
                MountTarget::Node(element),
                dom,
                renderer,
                parsed,
                hooks,
                Runtime::browser(),
            ),
            Err(_) => Chartisan::new(dom, renderer, parsed, hooks, Runtime::browser()),
        }
        .map_err(to_js_error)?;
        Ok(ChartisanHandle { chart })
    }

    /// Update the chart. Accepts `url`, `requestInit`, `data`,
    /// `background` and `additional`.
    pub fn update(&self, options: JsValue) -> Result<(), JsValue> {
        let plain = plain_options(&options)?;
        let mut update = UpdateOptions::new()
            .background(plain.get("background").and_then(Value::as_bool).unwrap_or(false));
        update.url = plain.get("url").and_then(Value::as_str).map(str::to_string);
        update.request = match plain.get("requestInit").or_else(|| plain.get("request")) {
            Some(request) => Some(
                serde_json::from_value::<RequestInit>(request.clone())
                    .map_err(|e| to_js_error(ChartisanError::Options(e.to_string())))?,
            ),
            None => None,
        };
        update.additional = plain.get("additional").cloned();
        update.data = data_source(&options)?;

        self.chart.update(update);
        Ok(())
    }

    /// Re-run the last configuration
    pub fn refresh(&self) {
        self.chart.refresh();
    }

    /// `initializing`, `loading`, `error` or `show`
    pub fn state(&self) -> String {
        self.chart.state().to_string()
    }

    /// The element the backend draws into
    pub fn body(&self) -> Element {
        self.chart.body()
    }

    pub fn destroy(&self) {
        self.chart.destroy();
    }
}

/// Whether `value` has the exact server data envelope shape
#[wasm_bindgen(js_name = isServerData)]
pub fn is_server_data_js(value: JsValue) -> bool {
    serde_wasm_bindgen::from_value::<Value>(value)
        .map(|value| is_server_data(&value))
        .unwrap_or(false)
}

/// Deep merge `source` into `target`, returning a new object
#[wasm_bindgen(js_name = mergeOptions)]
pub fn merge_options(target: JsValue, source: JsValue) -> Result<JsValue, JsValue> {
    let target: Value = deserialize(target, "Invalid merge target")?;
    let source: Value = deserialize(source, "Invalid merge source")?;
    serialize(&merge(&target, &source), "Failed to serialize merge result")
}

/// Deep merge every element of `values`, left to right
#[wasm_bindgen(js_name = mergeAll)]
pub fn merge_all_js(values: JsValue) -> Result<JsValue, JsValue> {
    let values: Value = deserialize(values, "Invalid merge argument")?;
    let merged = merge_all(&values).map_err(to_js_error)?;
    serialize(&merged, "Failed to serialize merge result")
}

/// Default dataset colors
#[wasm_bindgen(js_name = colorPalette)]
pub fn color_palette() -> Array {
    COLOR_PALETTE.iter().map(|c| JsValue::from_str(c)).collect()
}
