//! Hydration
//!
//! Server-rendered pages carry a payload naming a client function and its
//! arguments. Hydration revives that invocation on the client and makes it
//! the root producer, so later signal writes re-render through it.
//!
//! # How Hydration Works
//!
//! 1. Client modules register the functions they expose
//!    ([`Runtime::register_client_module`]); the first registration arms
//!    hydration.
//! 2. When the document becomes ready, the host calls [`Runtime::ready`].
//!    A module whose registration arms hydration after that point hydrates
//!    straight away.
//! 3. The payload anchor is marked as consumed, its text parsed, and the
//!    target function resolved through the [`ModuleRegistry`].
//! 4. Arguments are reconstructed in declared order, payload globals are
//!    installed, and the function is mounted into the root container.
//!
//! A payload is consumed once: the marker attribute set in step 3 turns
//! every later call into a no-op.

mod payload;
mod registry;
mod scope;

pub use payload::HydrationPayload;
pub use registry::{Args, ClientFunction, Collision, ModuleRecord, ModuleRegistry};
pub use scope::GlobalScope;

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::HydrationError;
use crate::reactive::runtime::{Mount, RootProducer};
use crate::reactive::{ComponentId, Runtime};

/// Outcome of a hydration attempt.
#[derive(Debug)]
pub enum Hydrated {
    /// The function's tree was mounted into the root container.
    Mounted(ComponentId),
    /// The function returned a deferred render. Once the task completes,
    /// the tree mounts on the host scheduler's next callback.
    Pending(ComponentId, JoinHandle<()>),
    /// The function ran but its tree could not be materialized. The
    /// failure has been logged and the server markup is left in place.
    Unmounted(ComponentId),
    /// The payload was consumed by an earlier call.
    AlreadyHydrated,
}

impl Hydrated {
    pub fn component(&self) -> Option<ComponentId> {
        match self {
            Hydrated::Mounted(id) | Hydrated::Pending(id, _) | Hydrated::Unmounted(id) => Some(*id),
            Hydrated::AlreadyHydrated => None,
        }
    }
}

impl Runtime {
    /// Register a client module: record the named functions from the
    /// global scope and seed the module's global defaults. Returns the
    /// number of functions recorded.
    ///
    /// If this registration arms hydration and the document is already
    /// ready, the page is hydrated before returning; the outcome is logged.
    pub fn register_client_module<I, K>(&self, module: &str, function_names: &[&str], global_defaults: I) -> usize
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let (recorded, armed) = {
            let mut registry = self.registry().lock();
            let was_armed = registry.is_armed();
            let recorded = registry.register(self.globals(), module, function_names, global_defaults);
            (recorded, !was_armed && registry.is_armed())
        };

        if armed && self.document().is_ready() {
            debug!(module = %module, "module registered after document ready; hydrating");
            if let Ok(outcome) = self.hydrate() {
                debug!(component = ?outcome.component(), "late hydration finished");
            }
        }
        recorded
    }

    /// Host ready-state hook. Marks the document ready and hydrates when a
    /// module has been registered; returns `None` otherwise.
    pub fn ready(&self) -> Option<Result<Hydrated, HydrationError>> {
        self.document().mark_ready();
        if !self.registry().lock().is_armed() {
            debug!("document ready; no client module registered");
            return None;
        }
        Some(self.hydrate())
    }

    /// Revive the page's embedded payload. Errors are logged before they
    /// are returned.
    pub fn hydrate(&self) -> Result<Hydrated, HydrationError> {
        self.hydrate_anchor().map_err(|err| {
            error!(error = %err, "hydration aborted");
            err
        })
    }

    /// Revive an already-decoded payload, bypassing the document anchor.
    pub fn hydrate_payload(&self, payload: HydrationPayload) -> Result<Hydrated, HydrationError> {
        self.revive(payload).map_err(|err| {
            error!(error = %err, "hydration aborted");
            err
        })
    }

    fn hydrate_anchor(&self) -> Result<Hydrated, HydrationError> {
        let config = self.config();
        let document = self.document();

        let anchor = document
            .element_by_id(&config.payload_anchor_id)
            .ok_or_else(|| HydrationError::MissingAnchor(config.payload_anchor_id.clone()))?;
        if document.attribute(anchor, &config.hydrated_marker).is_some() {
            debug!("payload already consumed");
            return Ok(Hydrated::AlreadyHydrated);
        }
        document.set_attribute(anchor, &config.hydrated_marker, "");

        let payload = HydrationPayload::from_json(&document.text_content(anchor))?;
        self.revive(payload)
    }

    fn revive(&self, payload: HydrationPayload) -> Result<Hydrated, HydrationError> {
        let config = self.config();
        let container = self
            .document()
            .element_by_id(&config.root_id)
            .ok_or_else(|| HydrationError::MissingRoot(config.root_id.clone()))?;

        let (module, function) = {
            let registry = self.registry().lock();
            let module = payload
                .module
                .clone()
                .or_else(|| registry.default_module().map(str::to_string))
                .ok_or(HydrationError::UnknownModule(None))?;
            if !registry.contains_module(&module) {
                return Err(HydrationError::UnknownModule(Some(module)));
            }
            let function = registry
                .resolve(&module, &payload.function)
                .ok_or_else(|| HydrationError::UnknownFunction {
                    module: module.clone(),
                    function: payload.function.clone(),
                })?;
            (module, function)
        };

        let args = payload.positional_args();
        for (name, value) in &payload.globals {
            self.globals().set(name.clone(), value.clone());
        }
        self.registry().lock().install_globals(&module, &payload.globals);

        info!(module = %module, function = %payload.function, args = args.len(), "hydrating");
        let producer: RootProducer = Arc::new(move |runtime: &Runtime| function(runtime, args.clone()));
        let id = self.install_root(container, producer);

        Ok(match self.render_component(id)? {
            Mount::Mounted => Hydrated::Mounted(id),
            Mount::Deferred(handle) => Hydrated::Pending(id, handle),
            Mount::Unchanged | Mount::NoRoot => Hydrated::Unmounted(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, DomId};
    use crate::view::{h, Node, Props, Rendered};
    use crate::RuntimeConfig;
    use serde_json::json;

    fn page(payload: &str) -> (Runtime, DomId) {
        let document = Document::new();
        let anchor = document.create_element("script");
        document.set_attribute(anchor, "id", "__ember_hydration__");
        let text = document.create_text(payload);
        document.append_child(anchor, text);
        document.append_child(document.body(), anchor);

        let root = document.create_element("div");
        document.set_attribute(root, "id", "root");
        document.append_child(document.body(), root);

        (Runtime::with_document(RuntimeConfig::default(), document), root)
    }

    fn define_sum(runtime: &Runtime) {
        runtime.globals().define_function("Sum", |_, args: Args| {
            let total: i64 = args.iter().flatten().filter_map(Value::as_i64).sum();
            Rendered::Ready(h("span", Props::new(), [total]))
        });
    }

    #[test]
    fn ready_without_modules_does_nothing() {
        let (rt, _) = page("{}");
        assert!(rt.ready().is_none());
        assert!(rt.document().is_ready());
    }

    #[test]
    fn hydrates_once() {
        let (rt, root) = page(r#"{"function":"Sum","argOrder":["x","y"],"args":{"y":2,"x":1}}"#);
        define_sum(&rt);
        rt.register_client_module("main", &["Sum"], Vec::<(String, Value)>::new());

        let first = rt.ready().unwrap().unwrap();
        assert!(matches!(first, Hydrated::Mounted(_)));
        assert_eq!(rt.document().inner_html(root), "<span>3</span>");

        assert!(matches!(rt.hydrate().unwrap(), Hydrated::AlreadyHydrated));
        assert_eq!(rt.render_count(), 1);
    }

    #[test]
    fn registration_after_ready_hydrates() {
        let (rt, root) = page(r#"{"function":"Sum","argOrder":["a","b"],"args":{"a":4,"b":5}}"#);
        assert!(rt.ready().is_none());

        define_sum(&rt);
        rt.register_client_module("main", &["Sum"], Vec::<(String, Value)>::new());

        assert_eq!(rt.document().inner_html(root), "<span>9</span>");
        assert!(matches!(rt.hydrate().unwrap(), Hydrated::AlreadyHydrated));
        assert_eq!(rt.render_count(), 1);
    }

    #[test]
    fn registration_before_ready_waits_for_ready() {
        let (rt, root) = page(r#"{"function":"Sum","argOrder":["a"],"args":{"a":1}}"#);
        define_sum(&rt);
        rt.register_client_module("main", &["Sum"], Vec::<(String, Value)>::new());
        assert_eq!(rt.document().inner_html(root), "");

        assert!(matches!(rt.ready(), Some(Ok(Hydrated::Mounted(_)))));
        assert_eq!(rt.document().inner_html(root), "<span>1</span>");
    }

    #[test]
    fn missing_anchor_is_reported() {
        let rt = Runtime::new(RuntimeConfig::default());
        assert!(matches!(rt.hydrate(), Err(HydrationError::MissingAnchor(_))));
    }

    #[test]
    fn malformed_payload_consumes_marker() {
        let (rt, _) = page("{oops");
        define_sum(&rt);
        rt.register_client_module("main", &["Sum"], Vec::<(String, Value)>::new());

        assert!(matches!(rt.hydrate(), Err(HydrationError::MalformedJson(_))));
        assert!(matches!(rt.hydrate().unwrap(), Hydrated::AlreadyHydrated));
    }

    #[test]
    fn unknown_module_and_function() {
        let (rt, _) = page(r#"{"function":"Sum","module":"other"}"#);
        define_sum(&rt);
        rt.register_client_module("main", &["Sum"], Vec::<(String, Value)>::new());
        assert!(matches!(
            rt.hydrate(),
            Err(HydrationError::UnknownModule(Some(module))) if module == "other"
        ));

        let (rt, _) = page(r#"{"function":"Nope"}"#);
        define_sum(&rt);
        rt.register_client_module("main", &["Sum"], Vec::<(String, Value)>::new());
        assert!(matches!(rt.hydrate(), Err(HydrationError::UnknownFunction { .. })));
    }

    #[test]
    fn payload_globals_are_installed() {
        let (rt, root) = page(r#"{"function":"Greet","globals":{"user":"ada"}}"#);
        rt.globals().define_function("Greet", |rt: &Runtime, _| {
            let user = rt.globals().get("user").and_then(|v| v.as_str().map(str::to_string));
            Rendered::Ready(Node::from(user))
        });
        rt.register_client_module("main", &["Greet"], [("user", json!("nobody"))]);

        rt.hydrate().unwrap();

        assert_eq!(rt.document().inner_html(root), "ada");
        rt.with_registry(|registry| {
            assert_eq!(registry.global_state("main").unwrap().get("user"), Some(&json!("ada")));
        });
    }

    #[test]
    fn hydrated_function_becomes_root_producer() {
        let (rt, root) = page(r#"{"function":"Counter","argOrder":["step"],"args":{"step":10}}"#);
        let count = rt.create_signal(0_i64);
        let reader = count.clone();
        rt.globals().define_function("Counter", move |_, args: Args| {
            let step = args.first().cloned().flatten().and_then(|v| v.as_i64()).unwrap_or(1);
            Rendered::Ready(Node::from(reader.get() * step))
        });
        rt.register_client_module("main", &["Counter"], Vec::<(String, Value)>::new());
        rt.hydrate().unwrap();
        assert_eq!(rt.document().inner_html(root), "0");

        count.set(4);
        rt.run_frame();
        assert_eq!(rt.document().inner_html(root), "40");
    }

    #[test]
    fn decoded_payload_hydrates_without_anchor() {
        let (rt, root) = page("");
        define_sum(&rt);
        rt.register_client_module("main", &["Sum"], Vec::<(String, Value)>::new());

        let payload = HydrationPayload {
            function: "Sum".into(),
            module: None,
            arg_order: vec!["a".into()],
            args: json!({"a": 5}).as_object().cloned().unwrap(),
            globals: Default::default(),
        };
        assert!(matches!(rt.hydrate_payload(payload).unwrap(), Hydrated::Mounted(_)));
        assert_eq!(rt.document().inner_html(root), "<span>5</span>");
    }
}
