//! Hash Router
//!
//! The router keeps the current path in a signal. Any component that calls
//! [`Router::render`] reads that signal, so navigation schedules a
//! re-render through the ordinary reactive path rather than a bespoke one.
//!
//! # How Routing Works
//!
//! 1. The path is seeded from the document's location fragment (`#/users`
//!    becomes `/users`; an empty fragment yields the default path).
//! 2. `hashchange` and `popstate` notifications recompute the path and
//!    write it into the signal.
//! 3. `render` looks the path up by exact string match, consults the
//!    route's guard, and invokes the route component.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::dom::{Document, ListenerId};
use crate::error::panic_message;
use crate::reactive::{Runtime, Signal};
use crate::view::{h, Node, Props};

/// Produces the view for a route.
pub type RouteView = Arc<dyn Fn() -> Node + Send + Sync>;

/// Decides whether a route may render.
pub type RouteGuard = Arc<dyn Fn() -> bool + Send + Sync>;

/// One entry of the route table.
#[derive(Clone)]
pub struct Route {
    path: String,
    component: RouteView,
    guard: Option<RouteGuard>,
}

impl Route {
    pub fn new<F>(path: impl Into<String>, component: F) -> Self
    where
        F: Fn() -> Node + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            component: Arc::new(component),
            guard: None,
        }
    }

    /// Attach a guard. When it returns `false` the access-denied
    /// placeholder renders instead of the component.
    pub fn guard<G>(mut self, guard: G) -> Self
    where
        G: Fn() -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    fn allows(&self) -> bool {
        let Some(guard) = &self.guard else {
            return true;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| guard())) {
            Ok(allowed) => allowed,
            Err(panic) => {
                error!(path = %self.path, panic = %panic_message(&*panic), "route guard panicked; access denied");
                false
            }
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

struct RouterInner {
    current_path: Signal<String>,
    routes: Vec<Route>,
    default_path: String,
    document: Document,
    listener: Mutex<Option<ListenerId>>,
}

/// Signal-backed hash router. Cloning yields another handle to the same
/// router.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Create a router and make it the runtime's active router, replacing
    /// any previous one.
    pub fn new(runtime: &Runtime, routes: Vec<Route>, default_path: &str) -> Self {
        let document = runtime.document().clone();
        let default_path = normalize(default_path, "/");
        let current_path = runtime.create_signal(normalize(&document.fragment(), &default_path));

        let path = current_path.clone();
        let fallback = default_path.clone();
        let listener = document.on_location_change(move |event| {
            let next = normalize(&event.fragment, &fallback);
            debug!(kind = ?event.kind, path = %next, "location changed");
            path.set(next);
        });

        let router = Self {
            inner: Arc::new(RouterInner {
                current_path,
                routes,
                default_path,
                document,
                listener: Mutex::new(Some(listener)),
            }),
        };
        debug!(
            routes = router.inner.routes.len(),
            path = %router.inner.current_path.get_untracked(),
            "router installed"
        );
        runtime.install_router(router.clone());
        router
    }

    /// Create a router using the configured default path.
    pub fn from_config(runtime: &Runtime, routes: Vec<Route>) -> Self {
        let default_path = runtime.config().default_path.clone();
        Self::new(runtime, routes, &default_path)
    }

    /// The current path, subscribing the running effect or component.
    pub fn current_path(&self) -> String {
        self.inner.current_path.get()
    }

    pub fn default_path(&self) -> &str {
        &self.inner.default_path
    }

    /// Push `path` onto the location history and switch to it.
    pub fn navigate(&self, path: &str) {
        let next = normalize(path, &self.inner.default_path);
        debug!(path = %next, "navigate");
        self.inner.document.set_fragment(&next);
        self.inner.current_path.set(next);
    }

    /// Render the view for the current path.
    pub fn render(&self) -> Node {
        let path = self.inner.current_path.get();
        match self.inner.routes.iter().find(|route| route.path == path) {
            Some(route) if !route.allows() => {
                debug!(path = %path, "route guard denied access");
                access_denied()
            }
            Some(route) => (route.component)(),
            None => not_found(&path),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.inner.routes
    }

    /// Stop following location changes.
    pub(crate) fn detach(&self) {
        if let Some(id) = self.inner.listener.lock().take() {
            self.inner.document.remove_location_listener(id);
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("current_path", &self.inner.current_path.get_untracked())
            .field("routes", &self.inner.routes)
            .finish()
    }
}

fn normalize(fragment: &str, default_path: &str) -> String {
    let path = fragment.strip_prefix('#').unwrap_or(fragment);
    if path.is_empty() {
        default_path.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn access_denied() -> Node {
    h("div", Props::new().with("class", "route-denied"), ["Access denied"])
}

fn not_found(path: &str) -> Node {
    h(
        "div",
        Props::new().with("class", "route-not-found"),
        [format!("Not found: {path}")],
    )
}
