//! View Layer
//!
//! The element tree that component functions produce, and the materializer
//! that mounts it into a [`Document`](crate::dom::Document).

pub mod element;
pub mod materialize;

pub use element::{h, Component, ComponentFn, Element, Node, PropValue, Props, Tag};
pub use materialize::render;

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::RenderError;

/// What a root producer or client function returns: a ready tree, or a
/// future that resolves to one.
pub enum Rendered {
    Ready(Node),
    Deferred(BoxFuture<'static, Result<Node, RenderError>>),
}

impl Rendered {
    /// Wrap a future as a deferred render.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Node, RenderError>> + Send + 'static,
    {
        Rendered::Deferred(future.boxed())
    }
}

impl From<Node> for Rendered {
    fn from(node: Node) -> Self {
        Rendered::Ready(node)
    }
}

impl fmt::Debug for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Ready(node) => f.debug_tuple("Ready").field(node).finish(),
            Rendered::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}
