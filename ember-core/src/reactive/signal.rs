//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect or component is on top of the
//!    runtime's context stack, the signal records that subscriber. Reading
//!    is the only way subscriptions are formed.
//!
//! 2. When a signal's value changes, every recorded subscriber is notified:
//!    effects re-run synchronously, components are scheduled for re-render.
//!
//! 3. Subscriptions persist across updates. A subscriber is recorded at
//!    most once no matter how often it reads.
//!
//! # Locking
//!
//! The value and the subscriber set sit behind separate locks, and neither
//! is held while subscribers run. Note that [`Signal::with`] holds the read
//! lock while its closure runs, so the closure must not write the same
//! signal.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::runtime::{Runtime, RuntimeInner};
use super::subscriber::{Subscriber, SubscriberKey};

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct SignalInner<T> {
    id: u64,
    value: RwLock<T>,
    subscribers: Mutex<IndexMap<SubscriberKey, Subscriber>>,
    runtime: Weak<RuntimeInner>,
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = runtime.create_signal(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: next_signal_id(),
                value: RwLock::new(value),
                subscribers: Mutex::new(IndexMap::new()),
                runtime: runtime.downgrade(),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the current value, subscribing the running effect or component.
    pub fn get(&self) -> T {
        self.track();
        self.get_untracked()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value, subscribing the running effect or component.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.read())
    }

    /// Set a new value and notify subscribers.
    ///
    /// A value equal to the current one is ignored.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return;
            }
            *guard = value;
        }
        self.notify();
    }

    /// Update the value using a function of the current one.
    ///
    /// `f` sees a copy of the value taken before it runs, so it may read or
    /// write this signal itself.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get_untracked();
        self.set(f(&current));
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Split into read and write halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                signal: self.clone(),
            },
            WriteSignal { signal: self },
        )
    }

    fn track(&self) {
        let Some(runtime) = Runtime::upgrade(&self.inner.runtime) else {
            return;
        };
        let Some(subscriber) = runtime.context().current() else {
            return;
        };

        let mut subscribers = self.inner.subscribers.lock();
        let key = subscriber.key();
        if !subscribers.contains_key(&key) {
            trace!(signal = self.inner.id, subscriber = ?key, "subscribed");
            subscribers.insert(key, subscriber);
        }
    }

    /// Notify all subscribers that the value has changed.
    fn notify(&self) {
        let Some(runtime) = Runtime::upgrade(&self.inner.runtime) else {
            return;
        };

        // Snapshot so that subscribers added during fan-out wait for the
        // next write.
        let snapshot: Vec<Subscriber> = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.retain(|_, subscriber| subscriber.is_live());
            subscribers.values().cloned().collect()
        };

        trace!(signal = self.inner.id, subscribers = snapshot.len(), "signal changed");
        runtime.notify(snapshot);
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.inner.subscribers.lock().len())
            .finish()
    }
}

/// Read half of a signal.
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T> ReadSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn get_untracked(&self) -> T {
        self.signal.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    pub fn id(&self) -> u64 {
        self.signal.id()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

/// Write half of a signal.
pub struct WriteSignal<T> {
    signal: Signal<T>,
}

impl<T> WriteSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn set(&self, value: T) {
        self.signal.set(value);
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.signal.update(f);
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::reactive::{ComponentId, Runtime, Subscriber};
    use crate::RuntimeConfig;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::default())
    }

    #[test]
    fn signal_get_and_set() {
        let rt = runtime();
        let signal = rt.create_signal(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let rt = runtime();
        let signal = rt.create_signal(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn update_closure_may_touch_the_same_signal() {
        let rt = runtime();
        let signal = rt.create_signal(1);
        let handle = signal.clone();

        signal.update(|v| {
            let seen = handle.get();
            handle.set(100);
            v + seen
        });

        assert_eq!(signal.get_untracked(), 2);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let rt = runtime();
        let signal = rt.create_signal(1);
        assert_eq!(signal.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn repeated_reads_subscribe_once() {
        let rt = runtime();
        let signal = rt.create_signal(String::from("a"));
        let id = ComponentId::new();

        {
            let _ctx = rt.context().enter(Subscriber::Component(id));
            signal.get();
            signal.with(|value| value.len());
            signal.get();
        }

        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn split_halves_share_state() {
        let rt = runtime();
        let (read, write) = rt.create_signal(0).split();

        write.set(3);
        assert_eq!(read.get(), 3);

        write.update(|v| v * 2);
        assert_eq!(read.get_untracked(), 6);
    }

    #[test]
    fn signal_clone_shares_state() {
        let rt = runtime();
        let signal1 = rt.create_signal(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let rt = runtime();
        let s1 = rt.create_signal(0);
        let s2 = rt.create_signal(0);

        assert_ne!(s1.id(), s2.id());
    }

    #[test]
    fn signal_outlives_runtime() {
        let signal = runtime().create_signal(1);
        signal.set(2);
        assert_eq!(signal.get(), 2);
    }
}
