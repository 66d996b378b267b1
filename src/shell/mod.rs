//! Presentation shell
//!
//! The shell owns the DOM subtree of one chart: a container mounted under
//! the caller's element, a body the renderer draws into, and an overlay
//! that sits on top of the body to show loading and error content. The
//! controller never touches the body.
//!
//! DOM access goes through the [`Dom`] trait so the same controller runs in
//! the browser ([`web::WebDom`], wasm32 only) and headless
//! ([`memory::MemoryDom`]).

pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::fmt;

use crate::error::{ChartisanError, Result};
use crate::renderers::REFRESH_CLASS;

pub const CONTROLLER_CLASS: &str = "chartisan-controller";
pub const BODY_CLASS: &str = "chartisan-body";
pub const MODAL_CLASS: &str = "chartisan-modal";

/// Minimal DOM surface the shell needs
pub trait Dom {
    type Node: Clone;

    /// First element matching `selector`, if any
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Node>>;

    fn create_element(&self, tag: &str) -> Result<Self::Node>;

    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    fn add_class(&self, node: &Self::Node, class: &str) -> Result<()>;

    fn set_inner_html(&self, node: &Self::Node, html: &str);

    fn set_style(&self, node: &Self::Node, property: &str, value: &str) -> Result<()>;

    /// First descendant of `root` carrying `class`
    fn find_by_class(&self, root: &Self::Node, class: &str) -> Option<Self::Node>;

    /// Register a handler that fires at most once for `event` on `node`.
    /// Dropping the returned token removes the handler.
    fn listen_once(
        &self,
        node: &Self::Node,
        event: &str,
        handler: Box<dyn FnOnce()>,
    ) -> Result<Subscription>;
}

/// Cancellable registration. Releases on drop.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release now
    pub fn cancel(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Overlay settings
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    pub show: bool,
    /// Background while shown
    pub color: Option<String>,
    /// New inner markup. `None` keeps the current content.
    pub content: Option<String>,
}

impl OverlayOptions {
    pub fn hidden() -> Self {
        Self {
            show: false,
            color: None,
            content: None,
        }
    }

    pub fn shown(content: String, color: impl Into<String>) -> Self {
        Self {
            show: true,
            color: Some(color.into()),
            content: Some(content),
        }
    }
}

/// Where a chart is mounted: a selector looked up in the document, or an
/// element the caller already holds
#[derive(Debug, Clone, PartialEq)]
pub enum MountTarget<N> {
    Selector(String),
    Node(N),
}

impl<N> From<&str> for MountTarget<N> {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl<N> From<String> for MountTarget<N> {
    fn from(selector: String) -> Self {
        MountTarget::Selector(selector)
    }
}

/// The DOM nodes owned by one chart
pub struct Shell<D: Dom> {
    dom: D,
    element: D::Node,
    container: D::Node,
    body: D::Node,
    overlay: D::Node,
}

impl<D: Dom> Shell<D> {
    /// Build the subtree under `target`
    pub fn mount(dom: D, target: MountTarget<D::Node>) -> Result<Self> {
        let element = match target {
            MountTarget::Selector(selector) => {
                let element = dom
                    .query_selector(&selector)?
                    .ok_or(ChartisanError::MountTargetNotFound { selector: selector.clone() })?;
                log::debug!("mounting shell under '{}'", selector);
                element
            }
            MountTarget::Node(element) => element,
        };

        let container = dom.create_element("div")?;
        dom.add_class(&container, CONTROLLER_CLASS)?;
        dom.set_style(&container, "position", "relative")?;

        let body = dom.create_element("div")?;
        dom.add_class(&body, BODY_CLASS)?;

        let overlay = dom.create_element("div")?;
        dom.add_class(&overlay, MODAL_CLASS)?;
        for (property, value) in [
            ("position", "absolute"),
            ("top", "0"),
            ("left", "0"),
            ("right", "0"),
            ("bottom", "0"),
            ("align-items", "center"),
            ("justify-content", "center"),
            ("display", "none"),
        ] {
            dom.set_style(&overlay, property, value)?;
        }

        dom.append_child(&container, &body)?;
        dom.append_child(&container, &overlay)?;
        dom.append_child(&element, &container)?;

        Ok(Self {
            dom,
            element,
            container,
            body,
            overlay,
        })
    }

    /// Set overlay visibility and, when shown, its background and content
    pub fn set_overlay(&self, options: OverlayOptions) -> Result<()> {
        if !options.show {
            return self.dom.set_style(&self.overlay, "display", "none");
        }
        if let Some(color) = &options.color {
            self.dom.set_style(&self.overlay, "background-color", color)?;
        }
        if let Some(content) = &options.content {
            self.dom.set_inner_html(&self.overlay, content);
        }
        self.dom.set_style(&self.overlay, "display", "flex")
    }

    /// Bind a one-shot click handler to the refresh affordance of the
    /// current overlay content. `None` when the content has no affordance.
    pub fn bind_retry(&self, handler: Box<dyn FnOnce()>) -> Result<Option<Subscription>> {
        let Some(refresh) = self.dom.find_by_class(&self.overlay, REFRESH_CLASS) else {
            log::warn!("overlay has no '{}' element, retry disabled", REFRESH_CLASS);
            return Ok(None);
        };
        self.dom.listen_once(&refresh, "click", handler).map(Some)
    }

    /// The caller's mount element
    pub fn element(&self) -> &D::Node {
        &self.element
    }

    pub fn container(&self) -> &D::Node {
        &self.container
    }

    /// Where the renderer draws
    pub fn body(&self) -> &D::Node {
        &self.body
    }

    pub fn overlay(&self) -> &D::Node {
        &self.overlay
    }
}
