//! Reactive Runtime
//!
//! The runtime is the central coordinator. It is constructed once at
//! application start and passed to every entry point; there is no ambient
//! global state. It owns:
//!
//! - the context stack used for automatic dependency tracking,
//! - the pending re-render queue and the host scheduling capability,
//! - the canonical root producer and its container,
//! - the active router,
//! - the document, the global scope and the module registry.
//!
//! # Update propagation
//!
//! When a signal's value changes, the runtime receives a snapshot of its
//! subscribers:
//!
//! 1. Effects re-run synchronously (or once at the end of a batch).
//! 2. Components are appended to the pending queue and a flush is requested.
//! 3. The flush re-invokes the root producer under each pending component
//!    and re-mounts the result.
//!
//! # Thread Safety
//!
//! `Runtime` is `Send + Sync` so deferred renders can resolve on a tokio
//! task, but the reactive graph is meant to be driven from one thread. A
//! resolved deferred render is handed back to the host scheduler and mounts
//! wherever the host runs its callbacks. The context stack is kept per
//! thread, so work that does run elsewhere never tracks into the host
//! thread's frames. No lock is held while user code runs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use super::context::ContextStack;
use super::effect::Effect;
use super::signal::Signal;
use super::state::{Record, State};
use super::subscriber::{ComponentId, Subscriber, SubscriberId};
use crate::config::{RuntimeConfig, SchedulerPolicy};
use crate::dom::{Document, DomId};
use crate::error::{panic_message, RenderError};
use crate::hydration::{GlobalScope, ModuleRegistry};
use crate::router::Router;
use crate::scheduler::{FrameQueue, HostScheduler, ImmediateScheduler, RenderQueue, TimerScheduler};
use crate::view::{materialize, Node, Rendered};

/// The canonical producer re-invoked on every root re-render.
pub type RootProducer = Arc<dyn Fn(&Runtime) -> Rendered + Send + Sync>;

#[derive(Clone)]
struct RootComponent {
    id: ComponentId,
    producer: RootProducer,
    container: DomId,
}

#[derive(Default)]
struct BatchState {
    depth: usize,
    queued: IndexMap<SubscriberId, Effect>,
    /// A flush was claimed inside the batch; it is posted when the
    /// outermost batch ends.
    flush_held: bool,
}

/// Result of rendering the root once.
#[derive(Debug)]
pub(crate) enum Mount {
    /// The tree was materialized into the container.
    Mounted,
    /// Materialization failed; the previous content stays.
    Unchanged,
    /// No root producer is registered.
    NoRoot,
    /// The producer returned a future. When the task completes the tree is
    /// handed to the host scheduler, which mounts it on its next callback.
    Deferred(JoinHandle<()>),
}

pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    context: ContextStack,
    queue: RenderQueue,
    host: Arc<dyn HostScheduler>,
    frames: Option<Arc<FrameQueue>>,
    batch: Mutex<BatchState>,
    root: Mutex<Option<RootComponent>>,
    router: Mutex<Option<Router>>,
    document: Document,
    globals: GlobalScope,
    registry: Mutex<ModuleRegistry>,
    render_count: AtomicUsize,
    flushing: AtomicBool,
    /// A flush was attempted while another was running.
    reflush: AtomicBool,
}

/// Handle to the reactive runtime. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime over an empty document.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_document(config, Document::new())
    }

    /// Create a runtime over `document`, picking the host scheduler from
    /// `config.scheduler`.
    pub fn with_document(config: RuntimeConfig, document: Document) -> Self {
        let (host, frames): (Arc<dyn HostScheduler>, Option<Arc<FrameQueue>>) = match config.scheduler {
            SchedulerPolicy::Frame => {
                let frames = Arc::new(FrameQueue::new());
                let host: Arc<dyn HostScheduler> = frames.clone();
                (host, Some(frames))
            }
            SchedulerPolicy::Timer => {
                let delay = Duration::from_millis(config.timer_delay_ms);
                let host: Arc<dyn HostScheduler> = Arc::new(TimerScheduler::new(delay));
                (host, None)
            }
            SchedulerPolicy::Immediate => {
                let host: Arc<dyn HostScheduler> = Arc::new(ImmediateScheduler::new());
                (host, None)
            }
        };
        Self::build(config, document, host, frames)
    }

    /// Create a runtime with a caller-supplied host scheduler.
    pub fn with_host(config: RuntimeConfig, document: Document, host: Arc<dyn HostScheduler>) -> Self {
        Self::build(config, document, host, None)
    }

    fn build(
        config: RuntimeConfig,
        document: Document,
        host: Arc<dyn HostScheduler>,
        frames: Option<Arc<FrameQueue>>,
    ) -> Self {
        let registry = ModuleRegistry::new(config.fallback);
        debug!(scheduler = ?config.scheduler, fallback = ?config.fallback, "runtime created");
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                context: ContextStack::new(),
                queue: RenderQueue::new(),
                host,
                frames,
                batch: Mutex::new(BatchState::default()),
                root: Mutex::new(None),
                router: Mutex::new(None),
                document,
                globals: GlobalScope::default(),
                registry: Mutex::new(registry),
                render_count: AtomicUsize::new(0),
                flushing: AtomicBool::new(false),
                reflush: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<RuntimeInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// The ambient scope compiled code defines functions and globals into.
    pub fn globals(&self) -> &GlobalScope {
        &self.inner.globals
    }

    pub fn context(&self) -> &ContextStack {
        &self.inner.context
    }

    pub(crate) fn registry(&self) -> &Mutex<ModuleRegistry> {
        &self.inner.registry
    }

    /// Inspect the module registry.
    pub fn with_registry<R>(&self, f: impl FnOnce(&ModuleRegistry) -> R) -> R {
        f(&self.inner.registry.lock())
    }

    // ------------------------------------------------------------------------
    // Reactive primitives
    // ------------------------------------------------------------------------

    /// Create a signal. Use [`Signal::split`] for separate getter and setter
    /// halves.
    pub fn create_signal<T>(&self, initial: T) -> Signal<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Signal::new(self, initial)
    }

    /// Create a state container whose setter merges partial records.
    pub fn create_state(&self, initial: Record) -> State {
        State::new(Signal::new(self, initial))
    }

    /// Create an effect and run it once immediately.
    pub fn create_effect<F>(&self, f: F) -> Effect
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Effect::new_lazy(self, f);
        effect.run();
        effect
    }

    /// Run `f` without subscribing the current effect or component to
    /// anything it reads.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = self.inner.context.enter_untracked();
        f()
    }

    /// Run `f`, deferring effect re-runs until it returns. Each effect
    /// notified during the batch runs once afterwards, and a flush requested
    /// during the batch is handed to the host only then.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.batch.lock().depth += 1;
        let _guard = BatchGuard { runtime: self };
        f()
    }

    /// Whether an effect or component is currently being tracked.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_active()
    }

    /// The component currently rendering, if any.
    pub fn current_component(&self) -> Option<ComponentId> {
        self.inner.context.current_component()
    }

    /// Fan a change out to a snapshot of subscribers.
    pub(crate) fn notify(&self, subscribers: Vec<Subscriber>) {
        for subscriber in subscribers {
            match subscriber {
                Subscriber::Effect(effect) => {
                    let deferred = {
                        let mut batch = self.inner.batch.lock();
                        if batch.depth > 0 {
                            batch.queued.entry(effect.id()).or_insert_with(|| effect.clone());
                            true
                        } else {
                            false
                        }
                    };
                    if !deferred {
                        effect.run();
                    }
                }
                Subscriber::Component(id) => self.schedule_rerender(id),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------------

    /// Mark `id` for re-render at the next flush.
    pub fn schedule_rerender(&self, id: ComponentId) {
        let enqueued = self.inner.queue.enqueue(id);
        if enqueued.added {
            trace!(component = %id, "re-render scheduled");
        }
        if enqueued.request_flush {
            self.post_flush();
        }
    }

    /// Ask the host for a flush unless one is already outstanding.
    pub fn request_flush(&self) {
        if self.inner.queue.claim_flush() {
            self.post_flush();
        }
    }

    fn post_flush(&self) {
        {
            let mut batch = self.inner.batch.lock();
            if batch.depth > 0 {
                batch.flush_held = true;
                return;
            }
        }
        trace!("flush requested");
        let runtime = self.downgrade();
        self.inner.host.request_callback(Box::new(move || {
            if let Some(runtime) = Runtime::upgrade(&runtime) {
                runtime.flush();
            }
        }));
    }

    /// Re-render the captured batch of pending components. Requests made
    /// during the flush go to the next batch. Returns the batch size.
    ///
    /// A flush started while another is running does nothing; the running
    /// flush asks the host for another callback when it finishes.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            trace!("flush already running; deferred to next callback");
            self.inner.reflush.store(true, Ordering::SeqCst);
            return 0;
        }
        let count = {
            let _flushing = FlushGuard(&self.inner.flushing);
            let batch = self.inner.queue.take_batch();
            if !batch.is_empty() {
                debug!(components = batch.len(), "flushing re-render batch");
            }
            for id in &batch {
                if let Err(err) = self.render_component(*id) {
                    error!(component = %id, error = %err, "re-render failed");
                }
            }
            batch.len()
        };
        if self.inner.reflush.swap(false, Ordering::SeqCst) {
            self.post_flush();
        }
        count
    }

    /// Run one host frame when the frame policy is in use. Returns the
    /// number of callbacks run.
    pub fn run_frame(&self) -> usize {
        self.inner.frames.as_ref().map_or(0, |frames| frames.run_frame())
    }

    /// Number of components waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.queue.is_flush_scheduled()
    }

    /// Number of times the root producer has been invoked.
    pub fn render_count(&self) -> usize {
        self.inner.render_count.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Root component
    // ------------------------------------------------------------------------

    /// Register `component` as the root producer for `container` and render
    /// it once.
    pub fn mount<F>(&self, container: DomId, component: F) -> ComponentId
    where
        F: Fn(&Runtime) -> Node + Send + Sync + 'static,
    {
        self.mount_producer(container, Arc::new(move |runtime: &Runtime| Rendered::Ready(component(runtime))))
    }

    /// Register a producer that may return a deferred render.
    pub fn mount_producer(&self, container: DomId, producer: RootProducer) -> ComponentId {
        let id = self.install_root(container, producer);
        if let Err(err) = self.render_component(id) {
            error!(component = %id, error = %err, "initial render failed");
        }
        id
    }

    /// Record the canonical root producer. The root keeps its component id
    /// across re-registrations.
    pub(crate) fn install_root(&self, container: DomId, producer: RootProducer) -> ComponentId {
        let mut root = self.inner.root.lock();
        let id = root.as_ref().map_or_else(ComponentId::new, |root| root.id);
        *root = Some(RootComponent {
            id,
            producer,
            container,
        });
        debug!(component = %id, container = container.raw(), "root producer installed");
        id
    }

    pub fn root_component(&self) -> Option<ComponentId> {
        self.inner.root.lock().as_ref().map(|root| root.id)
    }

    pub fn root_container(&self) -> Option<DomId> {
        self.inner.root.lock().as_ref().map(|root| root.container)
    }

    /// Invoke the root producer with `id` as the current component and
    /// mount the result.
    pub(crate) fn render_component(&self, id: ComponentId) -> Result<Mount, RenderError> {
        let Some(root) = self.inner.root.lock().clone() else {
            warn!(component = %id, "no root producer registered; re-render skipped");
            return Ok(Mount::NoRoot);
        };

        let _ctx = self.inner.context.enter(Subscriber::Component(id));
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| (root.producer)(self)))
            .map_err(|panic| RenderError::Panicked(panic_message(&*panic)))?;
        self.inner.render_count.fetch_add(1, Ordering::SeqCst);

        match rendered {
            Rendered::Ready(node) => {
                if materialize::render(&self.inner.document, node, root.container) {
                    Ok(Mount::Mounted)
                } else {
                    Ok(Mount::Unchanged)
                }
            }
            Rendered::Deferred(future) => self.spawn_deferred(id, root.container, future).map(Mount::Deferred),
        }
    }

    fn spawn_deferred(
        &self,
        id: ComponentId,
        container: DomId,
        future: BoxFuture<'static, Result<Node, RenderError>>,
    ) -> Result<JoinHandle<()>, RenderError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| RenderError::NoExecutor)?;
        let host = Arc::clone(&self.inner.host);
        let runtime = self.downgrade();
        trace!(component = %id, "deferred render spawned");
        Ok(handle.spawn(async move {
            match future.await {
                Ok(node) => {
                    trace!(component = %id, "deferred render resolved");
                    host.request_callback(Box::new(move || {
                        if let Some(runtime) = Runtime::upgrade(&runtime) {
                            runtime.mount_resolved(id, container, node);
                        }
                    }));
                }
                Err(err) => {
                    error!(component = %id, error = %err, "deferred component rejected; mount skipped");
                }
            }
        }))
    }

    fn mount_resolved(&self, id: ComponentId, container: DomId, node: Node) {
        let _ctx = self.inner.context.enter(Subscriber::Component(id));
        if materialize::render(&self.inner.document, node, container) {
            debug!(component = %id, "deferred render mounted");
        }
    }

    // ------------------------------------------------------------------------
    // Router
    // ------------------------------------------------------------------------

    /// The active router, if one has been constructed.
    pub fn router(&self) -> Option<Router> {
        self.inner.router.lock().clone()
    }

    /// Make `router` the active one, detaching the previous router.
    pub(crate) fn install_router(&self, router: Router) {
        let previous = self.inner.router.lock().replace(router);
        if let Some(previous) = previous {
            debug!("active router replaced");
            previous.detach();
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.inner.config.scheduler)
            .field("pending", &self.pending_count())
            .field("root", &self.root_component())
            .field("render_count", &self.render_count())
            .finish()
    }
}

struct BatchGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let (queued, flush_held) = {
            let mut batch = self.runtime.inner.batch.lock();
            batch.depth -= 1;
            if batch.depth == 0 {
                (std::mem::take(&mut batch.queued), std::mem::take(&mut batch.flush_held))
            } else {
                (IndexMap::new(), false)
            }
        };
        for effect in queued.into_values() {
            effect.run();
        }
        if flush_held {
            self.runtime.post_flush();
        }
    }
}

/// Clears the flushing flag on every exit path.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{h, Props};
    use std::sync::atomic::AtomicI32;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::default())
    }

    fn root(runtime: &Runtime) -> DomId {
        let document = runtime.document();
        let root = document.create_element("div");
        document.set_attribute(root, "id", "root");
        document.append_child(document.body(), root);
        root
    }

    #[test]
    fn component_reads_subscribe_root() {
        let rt = runtime();
        let container = root(&rt);
        let count = rt.create_signal(0);

        let reader = count.clone();
        let id = rt.mount(container, move |_| h("p", Props::new(), [reader.get()]));

        assert_eq!(rt.document().inner_html(container), "<p>0</p>");
        assert_eq!(count.subscriber_count(), 1);
        assert_eq!(rt.root_component(), Some(id));
    }

    #[test]
    fn writes_are_batched_until_frame() {
        let rt = runtime();
        let container = root(&rt);
        let a = rt.create_signal(0);
        let b = rt.create_signal(0);

        let (ra, rb) = (a.clone(), b.clone());
        rt.mount(container, move |_| h("p", Props::new(), [format!("{}-{}", ra.get(), rb.get())]));
        assert_eq!(rt.render_count(), 1);

        a.set(1);
        a.set(2);
        b.set(5);
        a.set(3);

        assert_eq!(rt.pending_count(), 1);
        assert!(rt.is_flush_scheduled());
        assert_eq!(rt.render_count(), 1);

        assert_eq!(rt.run_frame(), 1);
        assert_eq!(rt.render_count(), 2);
        assert_eq!(rt.document().inner_html(container), "<p>3-5</p>");
        assert!(!rt.is_flush_scheduled());
    }

    #[test]
    fn requests_during_flush_start_next_batch() {
        let rt = runtime();
        let container = root(&rt);
        let count = rt.create_signal(0);

        let reader = count.clone();
        rt.mount(container, move |_| {
            let value = reader.get();
            // Writing during render marks the root pending again.
            if value == 1 {
                reader.set(2);
            }
            Node::from(value)
        });

        count.set(1);
        assert_eq!(rt.flush(), 1);
        assert_eq!(rt.document().inner_html(container), "1");
        assert_eq!(rt.pending_count(), 1);

        assert_eq!(rt.flush(), 1);
        assert_eq!(rt.document().inner_html(container), "2");
        assert_eq!(rt.flush(), 0);
    }

    #[test]
    fn panicking_root_keeps_previous_view() {
        let rt = runtime();
        let container = root(&rt);
        let fail = rt.create_signal(false);

        let reader = fail.clone();
        rt.mount(container, move |_| {
            if reader.get() {
                panic!("root failure");
            }
            Node::from("ok")
        });

        fail.set(true);
        rt.run_frame();
        assert_eq!(rt.document().inner_html(container), "ok");
        assert_eq!(rt.context().depth(), 0);
    }

    #[test]
    fn flush_without_root_is_harmless() {
        let rt = runtime();
        rt.schedule_rerender(ComponentId::new());
        assert_eq!(rt.flush(), 1);
        assert_eq!(rt.render_count(), 0);
    }

    #[test]
    fn request_flush_is_single_shot() {
        let rt = runtime();
        rt.request_flush();
        rt.request_flush();
        assert!(rt.is_flush_scheduled());
        assert_eq!(rt.run_frame(), 1);
        assert!(!rt.is_flush_scheduled());
    }

    #[test]
    fn immediate_policy_renders_inline() {
        let config = RuntimeConfig {
            scheduler: SchedulerPolicy::Immediate,
            ..RuntimeConfig::default()
        };
        let rt = Runtime::new(config);
        let container = root(&rt);
        let count = rt.create_signal(0);

        let reader = count.clone();
        rt.mount(container, move |_| Node::from(reader.get()));
        count.set(9);

        assert_eq!(rt.document().inner_html(container), "9");
        assert_eq!(rt.pending_count(), 0);
    }

    fn chained_render(rt: &Runtime) -> (DomId, Signal<i32>, Arc<AtomicUsize>) {
        let container = root(rt);
        let count = rt.create_signal(0);
        let deepest = Arc::new(AtomicUsize::new(0));

        let (reader, depth) = (count.clone(), deepest.clone());
        rt.mount(container, move |rt| {
            depth.fetch_max(rt.context().depth(), Ordering::SeqCst);
            let value = reader.get();
            if value > 0 && value < 5 {
                reader.set(value + 1);
            }
            Node::from(value)
        });
        (container, count, deepest)
    }

    #[test]
    fn immediate_policy_renders_writes_from_render_in_turn() {
        let rt = Runtime::new(RuntimeConfig {
            scheduler: SchedulerPolicy::Immediate,
            ..RuntimeConfig::default()
        });
        let (container, count, deepest) = chained_render(&rt);

        count.set(1);

        assert_eq!(rt.document().inner_html(container), "5");
        assert_eq!(rt.render_count(), 6);
        assert_eq!(deepest.load(Ordering::SeqCst), 1);
        assert_eq!(rt.pending_count(), 0);
        assert!(!rt.is_flush_scheduled());
    }

    #[test]
    fn timer_policy_without_executor_renders_writes_from_render_in_turn() {
        let rt = Runtime::new(RuntimeConfig {
            scheduler: SchedulerPolicy::Timer,
            ..RuntimeConfig::default()
        });
        let (container, count, deepest) = chained_render(&rt);

        count.set(1);

        assert_eq!(rt.document().inner_html(container), "5");
        assert_eq!(deepest.load(Ordering::SeqCst), 1);
        assert_eq!(rt.pending_count(), 0);
    }

    #[test]
    fn immediate_policy_coalesces_writes_in_a_batch() {
        let rt = Runtime::new(RuntimeConfig {
            scheduler: SchedulerPolicy::Immediate,
            ..RuntimeConfig::default()
        });
        let container = root(&rt);
        let count = rt.create_signal(0);

        let reader = count.clone();
        rt.mount(container, move |_| Node::from(reader.get()));

        rt.batch(|| {
            count.set(1);
            count.set(2);
            count.set(3);
            assert_eq!(rt.render_count(), 1);
        });

        assert_eq!(rt.render_count(), 2);
        assert_eq!(rt.document().inner_html(container), "3");
    }

    #[test]
    fn flush_called_from_render_is_deferred() {
        let rt = runtime();
        let container = root(&rt);
        let count = rt.create_signal(0);

        let reader = count.clone();
        rt.mount(container, move |rt| {
            let value = reader.get();
            if value == 1 {
                reader.set(2);
                assert_eq!(rt.flush(), 0);
            }
            Node::from(value)
        });

        count.set(1);
        assert_eq!(rt.run_frame(), 1);
        assert_eq!(rt.document().inner_html(container), "1");

        rt.run_frame();
        assert_eq!(rt.document().inner_html(container), "2");
        assert_eq!(rt.context().depth(), 0);
    }

    #[test]
    fn batch_runs_each_effect_once() {
        let rt = runtime();
        let a = rt.create_signal(0);
        let b = rt.create_signal(0);
        let runs = Arc::new(AtomicI32::new(0));

        let (ra, rb, counter) = (a.clone(), b.clone(), runs.clone());
        rt.create_effect(move || {
            ra.get();
            rb.get();
            counter.fetch_add(1, Ordering::SeqCst);
        });

        rt.batch(|| {
            a.set(1);
            b.set(1);
            rt.batch(|| a.set(2));
            assert_eq!(runs.load(Ordering::SeqCst), 1);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn untrack_suppresses_subscription() {
        let rt = runtime();
        let signal = rt.create_signal(1);
        let reader = signal.clone();
        let inner = rt.clone();

        rt.create_effect(move || {
            inner.untrack(|| reader.get());
        });

        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn effect_inside_component_tracks_itself() {
        let rt = runtime();
        let container = root(&rt);
        let outer = rt.create_signal(0);
        let inner = rt.create_signal(0);

        let (ro, ri) = (outer.clone(), inner.clone());
        rt.mount(container, move |rt| {
            let ri = ri.clone();
            rt.create_effect(move || {
                ri.get();
            });
            Node::from(ro.get())
        });

        // The effect took `inner`; the component only took `outer`.
        inner.set(1);
        assert_eq!(rt.pending_count(), 0);
        outer.set(1);
        assert_eq!(rt.pending_count(), 1);
    }

    #[tokio::test]
    async fn deferred_root_mounts_on_next_host_callback() {
        let rt = runtime();
        let container = root(&rt);

        rt.install_root(
            container,
            Arc::new(|_: &Runtime| Rendered::deferred(async { Ok(Node::from("later")) })),
        );
        let id = rt.root_component().unwrap();
        let Ok(Mount::Deferred(handle)) = rt.render_component(id) else {
            panic!("expected a deferred mount");
        };
        handle.await.unwrap();

        // Resolved on the executor, but mounted only when the host runs.
        assert_eq!(rt.document().inner_html(container), "");
        assert_eq!(rt.run_frame(), 1);
        assert_eq!(rt.document().inner_html(container), "later");
        assert_eq!(rt.context().depth(), 0);
    }

    #[test]
    fn deferred_root_outside_executor_is_reported() {
        let rt = runtime();
        let container = root(&rt);
        rt.install_root(
            container,
            Arc::new(|_: &Runtime| Rendered::deferred(async { Ok(Node::from("never")) })),
        );

        let id = rt.root_component().unwrap();
        assert!(matches!(rt.render_component(id), Err(RenderError::NoExecutor)));
    }
}
