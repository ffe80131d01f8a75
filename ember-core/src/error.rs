//! Error Types
//!
//! Configuration problems (missing anchors, malformed payloads, unknown
//! modules) surface as [`HydrationError`]. Failures inside user code are
//! contained at the reactive boundary and only ever logged; the ones that
//! need to be reported to a caller are [`RenderError`]s.

use std::any::Any;

use thiserror::Error;

/// Errors raised while reviving a server-rendered page.
#[derive(Debug, Error)]
pub enum HydrationError {
    /// The payload anchor element is not present in the document.
    #[error("hydration anchor `{0}` not found")]
    MissingAnchor(String),

    /// The root container element is not present in the document.
    #[error("root container `{0}` not found")]
    MissingRoot(String),

    /// The anchor text is not a valid JSON payload.
    #[error("malformed hydration payload: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The binary payload is not valid MessagePack.
    #[error("malformed hydration payload: {0}")]
    MalformedMsgpack(#[from] rmp_serde::decode::Error),

    /// No module was named and none has been registered, or the named
    /// module was never registered.
    #[error("client module {} is not registered", .0.as_deref().unwrap_or("<none>"))]
    UnknownModule(Option<String>),

    /// The target function could not be resolved.
    #[error("function `{function}` not found in module `{module}`")]
    UnknownFunction { module: String, function: String },

    /// Invoking or mounting the target function failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors raised while producing or mounting a component.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// A deferred component resolved to an error.
    #[error("component rejected: {0}")]
    Rejected(String),

    /// A component function panicked.
    #[error("component panicked: {0}")]
    Panicked(String),

    /// A deferred component was produced outside of an async executor.
    #[error("no async executor available to drive a deferred component")]
    NoExecutor,
}

/// Errors raised while loading a [`RuntimeConfig`](crate::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Extract a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
