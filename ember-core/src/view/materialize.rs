//! Materializer
//!
//! Converts an element tree into document nodes and mounts it, replacing
//! the container's previous content wholesale. There is no diffing.
//!
//! Materialization runs in two phases:
//!
//! 1. **Resolve**: component tags are invoked (lazily, one level at a time)
//!    until only native elements and text remain. This phase runs user
//!    code, so it holds no locks and is guarded against panics.
//! 2. **Build**: the resolved tree is turned into document nodes, props are
//!    applied, and the result replaces the container's children.
//!
//! If resolution panics, the container is left untouched.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::element::{Element, Node, PropValue, Props, Tag};
use crate::dom::{Document, DomId};
use crate::error::panic_message;

/// A tree with every component tag invoked.
enum Resolved {
    Text(String),
    Element {
        tag: String,
        props: Props,
        children: Vec<Resolved>,
    },
}

fn resolve(node: Node) -> Resolved {
    match node {
        Node::Null => Resolved::Text(String::new()),
        Node::Text(text) => Resolved::Text(text),
        Node::Element(Element {
            tag,
            mut props,
            children,
        }) => match tag {
            Tag::Component(component) => {
                if !children.is_empty() {
                    props.insert("children", PropValue::Children(children));
                }
                resolve(component.call(props))
            }
            Tag::Native(tag) => Resolved::Element {
                tag,
                props,
                children: children
                    .into_iter()
                    .filter(|child| !child.is_null())
                    .map(resolve)
                    .collect(),
            },
        },
    }
}

fn build(document: &Document, resolved: Resolved) -> DomId {
    match resolved {
        Resolved::Text(text) => document.create_text(&text),
        Resolved::Element {
            tag,
            props,
            children,
        } => {
            let id = document.create_element(&tag);
            apply_props(document, id, &props);
            for child in children {
                let child = build(document, child);
                document.append_child(id, child);
            }
            id
        }
    }
}

fn is_event_key(key: &str) -> bool {
    key.len() > 2 && key.starts_with("on")
}

fn apply_props(document: &Document, id: DomId, props: &Props) {
    for (key, value) in props.iter() {
        match (key, value) {
            ("children", _) => {}
            (key, PropValue::Handler(handler)) if is_event_key(key) => {
                document.add_event_listener(id, &key[2..].to_lowercase(), Arc::clone(handler));
            }
            (key, PropValue::Handler(_)) => {
                warn!(key, "handler prop without an `on` prefix ignored");
            }
            ("class" | "className", value) => {
                if let Some(class) = value.to_attribute() {
                    document.set_class(id, &class);
                }
            }
            ("style", PropValue::Style(map)) => {
                for (property, value) in map {
                    document.set_style(id, property, value);
                }
            }
            ("style", PropValue::Json(Value::Object(map))) => {
                for (property, value) in map {
                    match value {
                        Value::String(text) => document.set_style(id, property, text),
                        other => document.set_style(id, property, &other.to_string()),
                    }
                }
            }
            (key, value) => {
                if let Some(text) = value.to_attribute() {
                    document.set_attribute(id, key, &text);
                }
            }
        }
    }
}

/// Replace the content of `container` with the materialized `node`.
///
/// Returns `false` (after logging) when a component panicked or the
/// container does not exist; the container is then left as it was.
pub fn render(document: &Document, node: Node, container: DomId) -> bool {
    let resolved = match panic::catch_unwind(AssertUnwindSafe(|| resolve(node))) {
        Ok(resolved) => resolved,
        Err(panic) => {
            error!(
                container = container.raw(),
                panic = %panic_message(&*panic),
                "component panicked during materialization"
            );
            return false;
        }
    };

    if !document.contains(container) {
        error!(container = container.raw(), "render target is not in the document");
        return false;
    }

    let root = build(document, resolved);
    let mounted = document.replace_children(container, &[root]);
    debug!(container = container.raw(), mounted, "materialized tree");
    mounted
}
