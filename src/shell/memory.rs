//! In-memory DOM
//!
//! A small node tree implementing [`Dom`] for headless use and tests.
//! Markup injected with `set_inner_html` is kept verbatim; every element
//! tag found in it becomes a (flat) child node carrying its `id` and
//! `class` attributes, which is enough to locate affordances such as the
//! refresh button and to dispatch clicks to them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::{Dom, Subscription};
use crate::error::{ChartisanError, Result};

/// Handle to a node of a [`MemoryDom`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

struct Listener {
    id: u64,
    event: String,
    handler: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct NodeData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    inner_html: String,
    style: BTreeMap<String, String>,
    listeners: Vec<Listener>,
}

#[derive(Default)]
struct Tree {
    nodes: Vec<NodeData>,
    next_listener: u64,
}

impl Tree {
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    // Depth first, document order
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(root).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    // Detach every child of `id`, handing back their listeners so they can
    // be dropped outside the borrow
    fn clear_children(&mut self, id: NodeId) -> Vec<Listener> {
        let mut dropped = Vec::new();
        for child in self.descendants(id) {
            let node = self.node_mut(child);
            node.parent = None;
            dropped.append(&mut node.listeners);
        }
        self.node_mut(id).children.clear();
        dropped
    }
}

/// Shared in-memory document. Clones refer to the same tree.
#[derive(Clone)]
pub struct MemoryDom {
    tree: Rc<RefCell<Tree>>,
}

impl MemoryDom {
    /// New document with an empty `body` root
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.push(NodeData {
            tag: "body".to_string(),
            ..NodeData::default()
        });
        Self {
            tree: Rc::new(RefCell::new(tree)),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Create an element and append it to `parent`
    pub fn add_element(
        &self,
        parent: NodeId,
        tag: &str,
        id: Option<&str>,
        classes: &[&str],
    ) -> NodeId {
        let mut tree = self.tree.borrow_mut();
        let node = tree.push(NodeData {
            tag: tag.to_string(),
            id: id.map(str::to_string),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            parent: Some(parent),
            ..NodeData::default()
        });
        tree.node_mut(parent).children.push(node);
        node
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.borrow().node(node).children.clone()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.tree.borrow().node(node).classes.iter().any(|c| c == class)
    }

    pub fn tag(&self, node: NodeId) -> String {
        self.tree.borrow().node(node).tag.clone()
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.tree.borrow().node(node).style.get(property).cloned()
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        self.tree.borrow().node(node).inner_html.clone()
    }

    /// Number of pending listeners on `node`
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.tree.borrow().node(node).listeners.len()
    }

    /// Dispatch a click. Returns whether any handler ran.
    pub fn click(&self, node: NodeId) -> bool {
        let handlers: Vec<Listener> = {
            let mut tree = self.tree.borrow_mut();
            let listeners = std::mem::take(&mut tree.node_mut(node).listeners);
            let (fire, keep): (Vec<_>, Vec<_>) =
                listeners.into_iter().partition(|l| l.event == "click");
            tree.node_mut(node).listeners = keep;
            fire
        };
        let fired = !handlers.is_empty();
        for listener in handlers {
            (listener.handler)();
        }
        fired
    }

    fn matches(node: &NodeData, selector: &SimpleSelector) -> bool {
        selector.tag.as_deref().map_or(true, |tag| node.tag.eq_ignore_ascii_case(tag))
            && selector.id.as_deref().map_or(true, |id| node.id.as_deref() == Some(id))
            && selector
                .classes
                .iter()
                .all(|class| node.classes.iter().any(|c| c == class))
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let selector = SimpleSelector::parse(selector)?;
        let tree = self.tree.borrow();
        let root = self.root();
        Ok(std::iter::once(root)
            .chain(tree.descendants(root))
            .find(|id| Self::matches(tree.node(*id), &selector)))
    }

    fn create_element(&self, tag: &str) -> Result<NodeId> {
        Ok(self.tree.borrow_mut().push(NodeData {
            tag: tag.to_string(),
            ..NodeData::default()
        }))
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        let mut tree = self.tree.borrow_mut();
        if let Some(old) = tree.node(*child).parent {
            tree.node_mut(old).children.retain(|c| c != child);
        }
        tree.node_mut(*child).parent = Some(*parent);
        tree.node_mut(*parent).children.push(*child);
        Ok(())
    }

    fn add_class(&self, node: &NodeId, class: &str) -> Result<()> {
        let mut tree = self.tree.borrow_mut();
        let classes = &mut tree.node_mut(*node).classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        Ok(())
    }

    fn set_inner_html(&self, node: &NodeId, html: &str) {
        let dropped = {
            let mut tree = self.tree.borrow_mut();
            let dropped = tree.clear_children(*node);
            tree.node_mut(*node).inner_html = html.to_string();
            for element in parse_markup(html) {
                let child = tree.push(NodeData {
                    tag: element.tag,
                    id: element.id,
                    classes: element.classes,
                    parent: Some(*node),
                    ..NodeData::default()
                });
                tree.node_mut(*node).children.push(child);
            }
            dropped
        };
        drop(dropped);
    }

    fn set_style(&self, node: &NodeId, property: &str, value: &str) -> Result<()> {
        self.tree
            .borrow_mut()
            .node_mut(*node)
            .style
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn find_by_class(&self, root: &NodeId, class: &str) -> Option<NodeId> {
        let tree = self.tree.borrow();
        tree.descendants(*root)
            .into_iter()
            .find(|id| tree.node(*id).classes.iter().any(|c| c == class))
    }

    fn listen_once(
        &self,
        node: &NodeId,
        event: &str,
        handler: Box<dyn FnOnce()>,
    ) -> Result<Subscription> {
        let id = {
            let mut tree = self.tree.borrow_mut();
            tree.next_listener += 1;
            let id = tree.next_listener;
            tree.node_mut(*node).listeners.push(Listener {
                id,
                event: event.to_string(),
                handler,
            });
            id
        };

        let tree: Weak<RefCell<Tree>> = Rc::downgrade(&self.tree);
        let node = *node;
        Ok(Subscription::new(move || {
            let Some(tree) = tree.upgrade() else {
                return;
            };
            let removed: Vec<Listener> = {
                let mut tree = tree.borrow_mut();
                let listeners = std::mem::take(&mut tree.node_mut(node).listeners);
                let (removed, keep): (Vec<_>, Vec<_>) =
                    listeners.into_iter().partition(|l| l.id == id);
                tree.node_mut(node).listeners = keep;
                removed
            };
            drop(removed);
        }))
    }
}

/// `tag`, `#id` and `.class` parts without combinators
#[derive(Debug, Default, PartialEq)]
struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl SimpleSelector {
    fn parse(selector: &str) -> Result<Self> {
        let selector = selector.trim();
        let unsupported = || ChartisanError::Dom(format!("unsupported selector '{}'", selector));
        if selector.is_empty()
            || selector.contains(|c: char| {
                c.is_whitespace() || matches!(c, '>' | '+' | '~' | ',' | '[' | ':' | '*')
            })
        {
            return Err(unsupported());
        }

        let mut parsed = SimpleSelector::default();
        let mut kind = None;
        let mut current = String::new();
        for c in selector.chars().chain(std::iter::once('\0')) {
            if c == '.' || c == '#' || c == '\0' {
                match kind {
                    None if current.is_empty() => {}
                    None => parsed.tag = Some(std::mem::take(&mut current)),
                    Some(_) if current.is_empty() => return Err(unsupported()),
                    Some('#') => parsed.id = Some(std::mem::take(&mut current)),
                    Some(_) => parsed.classes.push(std::mem::take(&mut current)),
                }
                kind = Some(c);
            } else {
                current.push(c);
            }
        }
        Ok(parsed)
    }
}

struct MarkupElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
}

// Collect opening tags with their id/class attributes
fn parse_markup(html: &str) -> Vec<MarkupElement> {
    let mut elements = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        rest = &rest[start + 1..];
        let end = rest.find('>').unwrap_or(rest.len());
        let tag_text = &rest[..end];
        rest = &rest[end..];

        let tag: String = tag_text
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        if tag.is_empty() {
            // closing tags, comments, doctype
            continue;
        }
        elements.push(MarkupElement {
            tag,
            id: attribute(tag_text, "id"),
            classes: attribute(tag_text, "class")
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        });
    }
    elements
}

fn attribute(tag_text: &str, name: &str) -> Option<String> {
    let pattern = format!("{}=\"", name);
    let mut offset = 0;
    while let Some(pos) = tag_text[offset..].find(&pattern) {
        let at = offset + pos;
        let preceded_by_space = tag_text[..at].ends_with(char::is_whitespace);
        let value_start = at + pattern.len();
        if preceded_by_space {
            let value_end = tag_text[value_start..].find('"')? + value_start;
            return Some(tag_text[value_start..value_end].to_string());
        }
        offset = value_start;
    }
    None
}
