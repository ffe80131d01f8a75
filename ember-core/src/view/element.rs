//! Element Tree
//!
//! An inert description of what to display: a tag, a property map and an
//! ordered list of children. Compiled component functions build these trees
//! with [`h`]; the materializer turns them into document nodes.
//!
//! A tag is either a native element name or a [`Component`]. Component tags
//! are resolved lazily, one level at a time, when the tree is materialized.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::dom::{Event, EventHandler};

/// Signature of a component function.
pub type ComponentFn = Arc<dyn Fn(Props) -> Node + Send + Sync>;

/// A named component function used as an element tag.
#[derive(Clone)]
pub struct Component {
    name: String,
    render: ComponentFn,
}

impl Component {
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(Props) -> Node + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            render: Arc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the component with `props`.
    pub fn call(&self, props: Props) -> Node {
        (self.render)(props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// The tag of an element node.
#[derive(Debug, Clone)]
pub enum Tag {
    /// A native element such as `div` or `button`.
    Native(String),
    /// A component to invoke with the element's props.
    Component(Component),
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Tag::Native(tag.to_string())
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Tag::Native(tag)
    }
}

impl From<Component> for Tag {
    fn from(component: Component) -> Self {
        Tag::Component(component)
    }
}

/// A single property value.
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Event handler; bound as a listener when the key starts with `on`.
    Handler(EventHandler),
    /// Inline style map; applied entry by entry under the `style` key.
    Style(IndexMap<String, String>),
    /// Child nodes folded into a component's props.
    Children(Vec<Node>),
    /// Any other structured value.
    Json(Value),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(text) => Some(text),
            PropValue::Json(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            PropValue::Json(value) => value.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            PropValue::Json(value) => value.as_bool(),
            _ => None,
        }
    }

    /// Attribute text for this value. `None` means the attribute is omitted.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Null | PropValue::Bool(false) => None,
            PropValue::Bool(true) => Some(String::new()),
            PropValue::Number(n) => Some(format_number(*n)),
            PropValue::Text(text) => Some(text.clone()),
            PropValue::Handler(_) | PropValue::Children(_) => None,
            PropValue::Style(map) => Some(
                map.iter()
                    .map(|(property, value)| format!("{property}: {value}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            PropValue::Json(Value::Null) | PropValue::Json(Value::Bool(false)) => None,
            PropValue::Json(Value::Bool(true)) => Some(String::new()),
            PropValue::Json(Value::String(text)) => Some(text.clone()),
            PropValue::Json(Value::Number(n)) => Some(n.to_string()),
            PropValue::Json(other) => Some(other.to_string()),
        }
    }
}

/// Integral numbers print without a fractional part, as the host page would.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            PropValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            PropValue::Text(t) => f.debug_tuple("Text").field(t).finish(),
            PropValue::Handler(_) => f.write_str("Handler(..)"),
            PropValue::Style(map) => f.debug_tuple("Style").field(map).finish(),
            PropValue::Children(children) => f.debug_tuple("Children").field(children).finish(),
            PropValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Json(value)
    }
}

impl From<IndexMap<String, String>> for PropValue {
    fn from(map: IndexMap<String, String>) -> Self {
        PropValue::Style(map)
    }
}

/// Ordered property map of an element.
#[derive(Debug, Clone, Default)]
pub struct Props(IndexMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style event binding: `on("click", f)` stores `f` under
    /// `onClick`.
    pub fn on<F>(mut self, event: &str, handler: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut key = String::from("on");
        let mut chars = event.chars();
        if let Some(first) = chars.next() {
            key.extend(first.to_uppercase());
            key.push_str(chars.as_str());
        }
        self.0.insert(key, PropValue::Handler(Arc::new(handler)));
        self
    }

    /// Builder-style inline style entry.
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        match self.0.entry("style".to_string()).or_insert_with(|| PropValue::Style(IndexMap::new())) {
            PropValue::Style(map) => {
                map.insert(property.into(), value.into());
            }
            other => {
                let mut map = IndexMap::new();
                map.insert(property.into(), value.into());
                *other = PropValue::Style(map);
            }
        }
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    /// Text value of `key`, if it holds one.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    /// Children folded in by the materializer; empty if none.
    pub fn children(&self) -> &[Node] {
        match self.0.get("children") {
            Some(PropValue::Children(children)) => children,
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An element node: tag, props and non-null children.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) tag: Tag,
    pub(crate) props: Props,
    pub(crate) children: Vec<Node>,
}

impl Element {
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// A node of the element tree.
#[derive(Debug, Clone, Default)]
pub enum Node {
    /// Nothing; materializes to an empty text node.
    #[default]
    Null,
    Text(String),
    Element(Element),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Build an element node. Null children are dropped.
pub fn h<C>(tag: impl Into<Tag>, props: Props, children: C) -> Node
where
    C: IntoIterator,
    C::Item: Into<Node>,
{
    Node::Element(Element {
        tag: tag.into(),
        props,
        children: children
            .into_iter()
            .map(Into::into)
            .filter(|child: &Node| !child.is_null())
            .collect(),
    })
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Text(n.to_string())
    }
}

impl From<i32> for Node {
    fn from(n: i32) -> Self {
        Node::Text(n.to_string())
    }
}

impl From<f64> for Node {
    fn from(n: f64) -> Self {
        Node::Text(format_number(n))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Text(b.to_string())
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map(Into::into).unwrap_or(Node::Null)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

// ----------------------------------------------------------------------------
// Serialization
// ----------------------------------------------------------------------------

impl Serialize for PropValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropValue::Null | PropValue::Handler(_) => serializer.serialize_unit(),
            PropValue::Bool(b) => serializer.serialize_bool(*b),
            PropValue::Number(n) => serializer.serialize_f64(*n),
            PropValue::Text(text) => serializer.serialize_str(text),
            PropValue::Style(map) => map.serialize(serializer),
            PropValue::Children(children) => children.serialize(serializer),
            PropValue::Json(value) => value.serialize(serializer),
        }
    }
}

impl Serialize for Props {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Text(text) => serializer.serialize_str(text),
            Node::Element(element) => {
                let tag = match &element.tag {
                    Tag::Native(name) => name.as_str(),
                    Tag::Component(component) => component.name(),
                };
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("tag", tag)?;
                map.serialize_entry("props", &element.props)?;
                map.serialize_entry("children", &element.children)?;
                map.end()
            }
        }
    }
}
