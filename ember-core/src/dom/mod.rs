//! Headless Document
//!
//! The runtime materializes into a [`Document`]: an arena of element and
//! text nodes with attributes, inline styles, event listeners, a location
//! fragment and a history stack. It models exactly the part of a browser
//! page the runtime touches, so the whole pipeline (hydration, routing,
//! scheduling, rendering) runs natively and is testable without a browser.
//!
//! # Locking
//!
//! The tree lives behind a single mutex. Every method takes the lock for the
//! duration of one structural operation only. Listeners are cloned out of
//! the tree and invoked after the lock is released, so a handler may freely
//! call back into the document or write signals.

mod location;

pub use location::{LocationEvent, LocationEventKind, LocationListener};

use std::collections::HashMap;
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{error, trace};

use crate::error::panic_message;
use location::Location;

/// Identifier of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomId(u64);

impl DomId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Identifier returned when registering a location listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An event delivered to element listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event type, e.g. `click`.
    pub kind: String,
    /// The node the event was dispatched on.
    pub target: DomId,
}

/// Callback bound to an element event.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    listeners: Vec<(String, EventHandler)>,
}

enum NodeData {
    Element(ElementData),
    Text(String),
}

struct DomNode {
    data: NodeData,
    parent: Option<DomId>,
    children: SmallVec<[DomId; 4]>,
}

struct DomTree {
    nodes: HashMap<DomId, DomNode>,
    next_id: u64,
    body: DomId,
    location: Location,
    ready: bool,
}

impl DomTree {
    fn insert(&mut self, data: NodeData) -> DomId {
        let id = DomId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            DomNode {
                data,
                parent: None,
                children: SmallVec::new(),
            },
        );
        id
    }

    fn element_mut(&mut self, id: DomId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(&id).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element(&self, id: DomId) -> Option<&ElementData> {
        match self.nodes.get(&id).map(|node| &node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn detach(&mut self, id: DomId) {
        let parent = self.nodes.get_mut(&id).and_then(|node| node.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
    }

    /// Drop a subtree from the arena.
    fn destroy(&mut self, id: DomId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
            }
        }
    }

    fn collect_text(&self, id: DomId, out: &mut String) {
        if let Some(node) = self.nodes.get(&id) {
            match &node.data {
                NodeData::Text(text) => out.push_str(text),
                NodeData::Element(_) => {
                    for child in &node.children {
                        self.collect_text(*child, out);
                    }
                }
            }
        }
    }

    fn write_html(&self, id: DomId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeData::Element(element) => {
                let _ = write!(out, "<{}", element.tag);
                for (name, value) in &element.attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{}\"", html_escape::encode_double_quoted_attribute(value));
                    }
                }
                if !element.style.is_empty() {
                    let css: Vec<String> = element
                        .style
                        .iter()
                        .map(|(property, value)| format!("{property}: {value}"))
                        .collect();
                    let _ = write!(out, " style=\"{}\"", html_escape::encode_double_quoted_attribute(&css.join("; ")));
                }
                out.push('>');
                for child in &node.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
        }
    }
}

/// A shared handle to a headless document.
///
/// Cloning is cheap; clones refer to the same tree.
#[derive(Clone)]
pub struct Document {
    tree: Arc<Mutex<DomTree>>,
}

impl Document {
    /// Create an empty document with a `<body>` element and an empty
    /// location fragment.
    pub fn new() -> Self {
        Self::with_fragment("")
    }

    /// Create an empty document whose location fragment is `fragment`
    /// (with or without the leading `#`).
    pub fn with_fragment(fragment: &str) -> Self {
        let mut tree = DomTree {
            nodes: HashMap::new(),
            next_id: 0,
            body: DomId(0),
            location: Location::new(fragment),
            ready: false,
        };
        tree.body = tree.insert(NodeData::Element(ElementData {
            tag: "body".to_string(),
            ..ElementData::default()
        }));
        Self {
            tree: Arc::new(Mutex::new(tree)),
        }
    }

    /// The `<body>` element.
    pub fn body(&self) -> DomId {
        self.tree.lock().body
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: DomId) -> bool {
        self.tree.lock().nodes.contains_key(&id)
    }

    /// Number of live nodes, including the body.
    pub fn node_count(&self) -> usize {
        self.tree.lock().nodes.len()
    }

    /// Create a detached element. An empty tag creates a `div`.
    pub fn create_element(&self, tag: &str) -> DomId {
        let tag = if tag.is_empty() { "div" } else { tag };
        self.tree.lock().insert(NodeData::Element(ElementData {
            tag: tag.to_string(),
            ..ElementData::default()
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> DomId {
        self.tree.lock().insert(NodeData::Text(text.to_string()))
    }

    /// Append `child` to `parent`, detaching it from its previous parent.
    ///
    /// Returns `false` when either node is missing or `parent` is a text node.
    pub fn append_child(&self, parent: DomId, child: DomId) -> bool {
        let mut tree = self.tree.lock();
        if tree.element(parent).is_none() || !tree.nodes.contains_key(&child) || parent == child {
            return false;
        }
        tree.detach(child);
        if let Some(node) = tree.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = tree.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        true
    }

    /// Remove every child of `container` and append `children` in order.
    /// The previous children are dropped from the document.
    pub fn replace_children(&self, container: DomId, children: &[DomId]) -> bool {
        let mut tree = self.tree.lock();
        if tree.element(container).is_none() {
            return false;
        }
        let old = tree
            .nodes
            .get_mut(&container)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in old {
            if !children.contains(&child) {
                tree.destroy(child);
            }
        }
        for &child in children {
            tree.detach(child);
            if let Some(node) = tree.nodes.get_mut(&child) {
                node.parent = Some(container);
            }
            if let Some(node) = tree.nodes.get_mut(&container) {
                node.children.push(child);
            }
        }
        true
    }

    /// Remove a node and its subtree from the document.
    pub fn remove(&self, id: DomId) {
        let mut tree = self.tree.lock();
        if id == tree.body {
            return;
        }
        tree.detach(id);
        tree.destroy(id);
    }

    /// Children of `id` in document order.
    pub fn children(&self, id: DomId) -> Vec<DomId> {
        self.tree
            .lock()
            .nodes
            .get(&id)
            .map(|node| node.children.to_vec())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: DomId) -> Option<DomId> {
        self.tree.lock().nodes.get(&id).and_then(|node| node.parent)
    }

    /// Tag name of an element, `None` for text nodes.
    pub fn tag(&self, id: DomId) -> Option<String> {
        self.tree.lock().element(id).map(|element| element.tag.clone())
    }

    /// Text of a text node, `None` for elements.
    pub fn text(&self, id: DomId) -> Option<String> {
        match self.tree.lock().nodes.get(&id).map(|node| &node.data) {
            Some(NodeData::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Concatenated text of `id` and all of its descendants.
    pub fn text_content(&self, id: DomId) -> String {
        let mut out = String::new();
        self.tree.lock().collect_text(id, &mut out);
        out
    }

    pub fn set_attribute(&self, id: DomId, name: &str, value: &str) {
        if let Some(element) = self.tree.lock().element_mut(id) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attribute(&self, id: DomId, name: &str) -> Option<String> {
        self.tree
            .lock()
            .element(id)
            .and_then(|element| element.attributes.get(name).cloned())
    }

    pub fn remove_attribute(&self, id: DomId, name: &str) {
        if let Some(element) = self.tree.lock().element_mut(id) {
            element.attributes.shift_remove(name);
        }
    }

    /// Set the element's class list.
    pub fn set_class(&self, id: DomId, class: &str) {
        self.set_attribute(id, "class", class);
    }

    /// Set one inline style property.
    pub fn set_style(&self, id: DomId, property: &str, value: &str) {
        if let Some(element) = self.tree.lock().element_mut(id) {
            element.style.insert(property.to_string(), value.to_string());
        }
    }

    pub fn style(&self, id: DomId, property: &str) -> Option<String> {
        self.tree
            .lock()
            .element(id)
            .and_then(|element| element.style.get(property).cloned())
    }

    /// Bind `handler` to `event` on an element.
    pub fn add_event_listener(&self, id: DomId, event: &str, handler: EventHandler) {
        if let Some(element) = self.tree.lock().element_mut(id) {
            trace!(node = id.0, event, "listener bound");
            element.listeners.push((event.to_string(), handler));
        }
    }

    /// Number of listeners bound to `event` on an element.
    pub fn listener_count(&self, id: DomId, event: &str) -> usize {
        self.tree
            .lock()
            .element(id)
            .map(|element| element.listeners.iter().filter(|(e, _)| e == event).count())
            .unwrap_or(0)
    }

    /// Invoke every listener bound to `event` on `id`, in binding order.
    ///
    /// A panicking handler is logged and does not stop the others. Returns
    /// the number of handlers invoked.
    pub fn dispatch(&self, id: DomId, event: &str) -> usize {
        let handlers: Vec<EventHandler> = match self.tree.lock().element(id) {
            Some(element) => element
                .listeners
                .iter()
                .filter(|(kind, _)| kind == event)
                .map(|(_, handler)| Arc::clone(handler))
                .collect(),
            None => return 0,
        };

        let payload = Event {
            kind: event.to_string(),
            target: id,
        };
        for handler in &handlers {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| handler(&payload))) {
                error!(node = id.0, event, panic = %panic_message(&*panic), "event handler panicked");
            }
        }
        handlers.len()
    }

    /// First element, in document order from the body, whose `id`
    /// attribute equals `element_id`.
    pub fn element_by_id(&self, element_id: &str) -> Option<DomId> {
        let tree = self.tree.lock();
        let mut stack = vec![tree.body];
        while let Some(next) = stack.pop() {
            let node = tree.nodes.get(&next)?;
            if let NodeData::Element(element) = &node.data {
                if element.attributes.get("id").map(String::as_str) == Some(element_id) {
                    return Some(next);
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Serialize `id` and its subtree as HTML.
    pub fn to_html(&self, id: DomId) -> String {
        let mut out = String::new();
        self.tree.lock().write_html(id, &mut out);
        out
    }

    /// Serialize the children of `id` as HTML.
    pub fn inner_html(&self, id: DomId) -> String {
        let tree = self.tree.lock();
        let mut out = String::new();
        if let Some(node) = tree.nodes.get(&id) {
            for child in &node.children {
                tree.write_html(*child, &mut out);
            }
        }
        out
    }

    pub fn is_ready(&self) -> bool {
        self.tree.lock().ready
    }

    /// Mark the document as fully loaded.
    pub fn mark_ready(&self) {
        self.tree.lock().ready = true;
    }

    /// Current location fragment, without the leading `#`.
    pub fn fragment(&self) -> String {
        self.tree.lock().location.current().to_string()
    }

    /// Push a new fragment onto the history stack and fire `hashchange`.
    pub fn set_fragment(&self, fragment: &str) {
        let (event, listeners) = {
            let mut tree = self.tree.lock();
            if !tree.location.push(fragment) {
                return;
            }
            let fragment = tree.location.current().to_string();
            (
                LocationEvent {
                    kind: LocationEventKind::HashChange,
                    fragment,
                },
                tree.location.listeners(),
            )
        };
        Self::fire(&event, &listeners);
    }

    /// Pop the history stack and fire `popstate`. Returns `false` when
    /// there is no earlier entry.
    pub fn back(&self) -> bool {
        let (event, listeners) = {
            let mut tree = self.tree.lock();
            if !tree.location.pop() {
                return false;
            }
            let fragment = tree.location.current().to_string();
            (
                LocationEvent {
                    kind: LocationEventKind::PopState,
                    fragment,
                },
                tree.location.listeners(),
            )
        };
        Self::fire(&event, &listeners);
        true
    }

    /// Number of entries in the history stack.
    pub fn history_len(&self) -> usize {
        self.tree.lock().location.len()
    }

    /// Register a callback for `hashchange` and `popstate`.
    pub fn on_location_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&LocationEvent) + Send + Sync + 'static,
    {
        self.tree.lock().location.listen(Arc::new(listener))
    }

    /// Remove a location callback.
    pub fn remove_location_listener(&self, id: ListenerId) -> bool {
        self.tree.lock().location.unlisten(id)
    }

    fn fire(event: &LocationEvent, listeners: &[LocationListener]) {
        for listener in listeners {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                error!(kind = ?event.kind, panic = %panic_message(&*panic), "location listener panicked");
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.tree.lock();
        f.debug_struct("Document")
            .field("nodes", &tree.nodes.len())
            .field("fragment", &tree.location.current())
            .field("ready", &tree.ready)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn build_and_serialize() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "id", "root");
        doc.set_class(div, "card");
        doc.set_style(div, "color", "red");
        let text = doc.create_text("a < b");
        doc.append_child(div, text);
        doc.append_child(doc.body(), div);

        assert_eq!(
            doc.to_html(div),
            r#"<div id="root" class="card" style="color: red">a &lt; b</div>"#
        );
        assert_eq!(doc.text_content(doc.body()), "a < b");
        assert_eq!(doc.element_by_id("root"), Some(div));
    }

    #[test]
    fn serialized_markup_is_escaped() {
        let doc = Document::new();
        let link = doc.create_element("a");
        doc.set_attribute(link, "title", r#"say "hi" & <go>"#);
        let text = doc.create_text("<script>alert('x')</script> & more");
        doc.append_child(link, text);

        assert_eq!(
            doc.to_html(link),
            concat!(
                r#"<a title="say &quot;hi&quot; &amp; &lt;go&gt;">"#,
                "&lt;script&gt;alert('x')&lt;/script&gt; &amp; more</a>"
            )
        );
    }

    #[test]
    fn empty_tag_creates_div() {
        let doc = Document::new();
        let node = doc.create_element("");
        assert_eq!(doc.tag(node).as_deref(), Some("div"));
    }

    #[test]
    fn replace_children_drops_old_subtrees() {
        let doc = Document::new();
        let container = doc.create_element("div");
        let old = doc.create_element("span");
        let old_text = doc.create_text("old");
        doc.append_child(old, old_text);
        doc.append_child(container, old);

        let new = doc.create_text("new");
        assert!(doc.replace_children(container, &[new]));

        assert_eq!(doc.children(container), vec![new]);
        assert!(!doc.contains(old));
        assert!(!doc.contains(old_text));
        assert_eq!(doc.parent(new), Some(container));
    }

    #[test]
    fn append_to_text_node_is_rejected() {
        let doc = Document::new();
        let text = doc.create_text("leaf");
        let child = doc.create_element("b");
        assert!(!doc.append_child(text, child));
    }

    #[test]
    fn dispatch_runs_matching_listeners_in_order() {
        let doc = Document::new();
        let button = doc.create_element("button");
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        doc.add_event_listener(button, "click", Arc::new(move |_| first.lock().push(1)));
        let second = order.clone();
        doc.add_event_listener(button, "click", Arc::new(move |_| second.lock().push(2)));
        doc.add_event_listener(button, "input", Arc::new(|_| panic!("wrong event")));

        assert_eq!(doc.dispatch(button, "click"), 2);
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn panicking_handler_does_not_stop_siblings() {
        let doc = Document::new();
        let button = doc.create_element("button");
        let hits = Arc::new(AtomicUsize::new(0));

        doc.add_event_listener(button, "click", Arc::new(|_| panic!("handler failure")));
        let counter = hits.clone();
        doc.add_event_listener(
            button,
            "click",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(doc.dispatch(button, "click"), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_reenter_document() {
        let doc = Document::new();
        let button = doc.create_element("button");
        let inner = doc.clone();
        doc.add_event_listener(
            button,
            "click",
            Arc::new(move |event| inner.set_attribute(event.target, "data-clicked", "")),
        );

        doc.dispatch(button, "click");
        assert_eq!(doc.attribute(button, "data-clicked").as_deref(), Some(""));
    }

    #[test]
    fn location_events_fire_for_push_and_back() {
        let doc = Document::with_fragment("#/login");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = doc.on_location_change(move |event| {
            sink.lock().push((event.kind, event.fragment.clone()));
        });

        doc.set_fragment("/home");
        assert_eq!(doc.fragment(), "/home");
        assert!(doc.back());
        assert!(!doc.back());

        assert_eq!(
            *seen.lock(),
            vec![
                (LocationEventKind::HashChange, "/home".to_string()),
                (LocationEventKind::PopState, "/login".to_string()),
            ]
        );

        assert!(doc.remove_location_listener(id));
        doc.set_fragment("/other");
        assert_eq!(seen.lock().len(), 2);
    }
}
