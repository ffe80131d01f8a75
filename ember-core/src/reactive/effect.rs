//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately, with itself
//!    on top of the context stack, so every signal it reads subscribes it.
//!
//! 2. When any dependency changes, the effect re-runs synchronously inside
//!    the writer's call (or once at the end of a [`batch`](super::Runtime::batch)).
//!
//! 3. Reads happen again on every run, so new dependencies are picked up
//!    naturally. Old subscriptions are kept.
//!
//! 4. A write to one of the effect's own dependencies while it runs marks
//!    it dirty; the body runs again once the current pass returns, until a
//!    pass leaves it clean or [`MAX_EFFECT_PASSES`] is reached.
//!
//! A panic inside the effect function is caught and logged. It never
//! propagates to the signal writer that triggered the run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tracing::{error, trace, warn};

use super::runtime::{Runtime, RuntimeInner};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::panic_message;

/// Upper bound on back-to-back passes of one effect triggered by its own
/// writes.
pub const MAX_EFFECT_PASSES: usize = 100;

struct EffectInner {
    id: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    runtime: Weak<RuntimeInner>,
    /// Set while the function executes. A notification arriving meanwhile
    /// sets `dirty` instead of re-entering.
    running: AtomicBool,
    dirty: AtomicBool,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = runtime.create_signal(0);
///
/// let counter = count.clone();
/// let effect = runtime.create_effect(move || {
///     println!("Count is: {}", counter.get());
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create an effect without running it.
    pub(crate) fn new_lazy<F>(runtime: &Runtime, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(EffectInner {
                id: SubscriberId::new(),
                run: Box::new(run),
                runtime: runtime.downgrade(),
                running: AtomicBool::new(false),
                dirty: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the subscriber ID for this effect.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Execute the effect function with dependency tracking.
    pub fn run(&self) {
        if self.is_disposed() {
            return;
        }
        let Some(runtime) = Runtime::upgrade(&self.inner.runtime) else {
            trace!(effect = ?self.inner.id, "runtime dropped; effect skipped");
            return;
        };
        if self.inner.running.swap(true, Ordering::SeqCst) {
            trace!(effect = ?self.inner.id, "effect notified while running; marked dirty");
            self.inner.dirty.store(true, Ordering::SeqCst);
            return;
        }

        let mut passes = 0;
        loop {
            self.inner.dirty.store(false, Ordering::SeqCst);
            let result = {
                let _ctx = runtime.context().enter(Subscriber::Effect(self.clone()));
                panic::catch_unwind(AssertUnwindSafe(|| (self.inner.run)()))
            };
            self.inner.run_count.fetch_add(1, Ordering::SeqCst);
            passes += 1;

            if let Err(panic) = result {
                error!(effect = ?self.inner.id, panic = %panic_message(&*panic), "effect panicked");
            }

            if !self.inner.dirty.load(Ordering::SeqCst) || self.is_disposed() {
                break;
            }
            if passes >= MAX_EFFECT_PASSES {
                warn!(effect = ?self.inner.id, passes, "effect did not settle; further passes dropped");
                self.inner.dirty.store(false, Ordering::SeqCst);
                break;
            }
        }

        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Dispose of the effect.
    ///
    /// After disposal, the effect will not run again and is pruned from
    /// subscriber sets on their next write.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
