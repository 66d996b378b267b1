//! Browser DOM backed by web-sys

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, AddEventListenerOptions, Document, Element, HtmlElement};

use super::{Dom, Subscription};
use crate::error::{ChartisanError, Result};

fn dom_error(context: &str, err: JsValue) -> ChartisanError {
    ChartisanError::Dom(format!("{}: {:?}", context, err))
}

/// The page document
#[derive(Clone)]
pub struct WebDom {
    document: Document,
}

impl WebDom {
    pub fn new() -> Result<Self> {
        let document = window()
            .ok_or_else(|| ChartisanError::Dom("No window".to_string()))?
            .document()
            .ok_or_else(|| ChartisanError::Dom("No document".to_string()))?;
        Ok(Self { document })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl Dom for WebDom {
    type Node = Element;

    fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        self.document
            .query_selector(selector)
            .map_err(|e| dom_error("querySelector", e))
    }

    fn create_element(&self, tag: &str) -> Result<Element> {
        self.document
            .create_element(tag)
            .map_err(|e| dom_error("createElement", e))
    }

    fn append_child(&self, parent: &Element, child: &Element) -> Result<()> {
        parent
            .append_child(child)
            .map(|_| ())
            .map_err(|e| dom_error("appendChild", e))
    }

    fn add_class(&self, node: &Element, class: &str) -> Result<()> {
        node.class_list()
            .add_1(class)
            .map_err(|e| dom_error("classList.add", e))
    }

    fn set_inner_html(&self, node: &Element, html: &str) {
        node.set_inner_html(html);
    }

    fn set_style(&self, node: &Element, property: &str, value: &str) -> Result<()> {
        let element = node
            .dyn_ref::<HtmlElement>()
            .ok_or_else(|| ChartisanError::Dom("Element is not an HTMLElement".to_string()))?;
        element
            .style()
            .set_property(property, value)
            .map_err(|e| dom_error("style.setProperty", e))
    }

    fn find_by_class(&self, root: &Element, class: &str) -> Option<Element> {
        root.get_elements_by_class_name(class).item(0)
    }

    fn listen_once(
        &self,
        node: &Element,
        event: &str,
        handler: Box<dyn FnOnce()>,
    ) -> Result<Subscription> {
        let callback = Closure::once(move || handler());

        let options = AddEventListenerOptions::new();
        options.set_once(true);
        node.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            callback.as_ref().unchecked_ref(),
            &options,
        )
        .map_err(|e| dom_error("addEventListener", e))?;

        let node = node.clone();
        let event = event.to_string();
        Ok(Subscription::new(move || {
            // Harmless when the listener already fired
            let _ = node.remove_event_listener_with_callback(&event, callback.as_ref().unchecked_ref());
            drop(callback);
        }))
    }
}
