//! Reactive Context
//!
//! The context stack tracks which computation is currently running. This
//! enables automatic dependency tracking: when a signal is read, the
//! subscriber on top of the stack is registered as a dependent.
//!
//! # Implementation
//!
//! Each [`Runtime`](super::Runtime) owns one stack per thread. Entering a
//! context (running an effect, rendering a component, or suspending
//! tracking) pushes a frame onto the calling thread's stack and returns a
//! [`ContextGuard`]; dropping the guard pops it. The guard also drops during
//! unwinding, so the stack is restored on every exit path.
//!
//! Work running on another thread, such as a timer flush on a tokio worker,
//! sees only its own frames. A read there never subscribes whatever the
//! host thread happens to be running.
//!
//! Nested contexts are supported: an effect created inside a component
//! render tracks its own reads, and the component becomes current again
//! once the effect returns.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::subscriber::{ComponentId, Subscriber, SubscriberKey};
use super::Effect;

/// An entry in the reactive context stack.
#[derive(Clone)]
enum Frame {
    Tracking(Subscriber),
    /// Reads inside this frame do not subscribe anything.
    Untracked,
}

/// Stack of running computations, partitioned by thread.
#[derive(Default)]
pub struct ContextStack {
    frames: Mutex<HashMap<ThreadId, Vec<Frame>>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `subscriber` current until the returned guard is dropped.
    pub fn enter(&self, subscriber: Subscriber) -> ContextGuard<'_> {
        let key = Some(subscriber.key());
        self.push(Frame::Tracking(subscriber));
        ContextGuard { stack: self, key }
    }

    /// Suspend tracking until the returned guard is dropped.
    pub fn enter_untracked(&self) -> ContextGuard<'_> {
        self.push(Frame::Untracked);
        ContextGuard {
            stack: self,
            key: None,
        }
    }

    /// Check if a subscriber is currently being tracked.
    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    /// The subscriber on top of the stack, if tracking.
    pub fn current(&self) -> Option<Subscriber> {
        let frames = self.frames.lock();
        match frames.get(&thread::current().id()).and_then(|stack| stack.last()) {
            Some(Frame::Tracking(subscriber)) => Some(subscriber.clone()),
            _ => None,
        }
    }

    /// The currently executing effect, if the top frame is one.
    pub fn current_effect(&self) -> Option<Effect> {
        match self.current() {
            Some(Subscriber::Effect(effect)) => Some(effect),
            _ => None,
        }
    }

    /// The currently rendering component, if the top frame is one.
    pub fn current_component(&self) -> Option<ComponentId> {
        match self.current() {
            Some(Subscriber::Component(id)) => Some(id),
            _ => None,
        }
    }

    /// Number of frames on the calling thread's stack.
    pub fn depth(&self) -> usize {
        self.frames
            .lock()
            .get(&thread::current().id())
            .map_or(0, Vec::len)
    }

    fn push(&self, frame: Frame) {
        self.frames
            .lock()
            .entry(thread::current().id())
            .or_default()
            .push(frame);
    }

    fn pop(&self) -> Option<Frame> {
        let mut frames = self.frames.lock();
        let id = thread::current().id();
        let stack = frames.get_mut(&id)?;
        let popped = stack.pop();
        if stack.is_empty() {
            frames.remove(&id);
        }
        popped
    }
}

/// Guard that pops the context when dropped.
pub struct ContextGuard<'a> {
    stack: &'a ContextStack,
    key: Option<SubscriberKey>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.pop();

        // Verify we're popping the right context.
        if let Some(frame) = popped {
            let key = match &frame {
                Frame::Tracking(subscriber) => Some(subscriber.key()),
                Frame::Untracked => None,
            };
            debug_assert_eq!(
                key, self.key,
                "ContextGuard mismatch: expected {:?}, got {:?}",
                self.key, key
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_component() {
        let stack = ContextStack::new();
        let id = ComponentId::new();

        assert!(!stack.is_active());
        assert!(stack.current_component().is_none());

        {
            let _ctx = stack.enter(Subscriber::Component(id));

            assert!(stack.is_active());
            assert_eq!(stack.current_component(), Some(id));
            assert!(stack.current_effect().is_none());
        }

        // Context should be cleaned up after drop
        assert!(!stack.is_active());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn nested_contexts() {
        let stack = ContextStack::new();
        let id1 = ComponentId::new();
        let id2 = ComponentId::new();

        {
            let _ctx1 = stack.enter(Subscriber::Component(id1));
            assert_eq!(stack.current_component(), Some(id1));

            {
                let _ctx2 = stack.enter(Subscriber::Component(id2));
                assert_eq!(stack.current_component(), Some(id2));
            }

            // After inner context drops, outer should be current
            assert_eq!(stack.current_component(), Some(id1));
        }

        assert!(stack.current().is_none());
    }

    #[test]
    fn untracked_frame_hides_outer_subscriber() {
        let stack = ContextStack::new();
        let _outer = stack.enter(Subscriber::Component(ComponentId::new()));

        {
            let _untracked = stack.enter_untracked();
            assert!(!stack.is_active());
        }

        assert!(stack.is_active());
    }

    #[test]
    fn guard_restores_stack_on_panic() {
        let stack = ContextStack::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = stack.enter(Subscriber::Component(ComponentId::new()));
            panic!("render failure");
        }));

        assert!(result.is_err());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn threads_do_not_share_frames() {
        use std::sync::Barrier;

        let stack = ContextStack::new();
        let outer = ComponentId::new();
        let inner = ComponentId::new();
        let entered = Barrier::new(2);
        let released = Barrier::new(2);

        let _ctx = stack.enter(Subscriber::Component(outer));
        thread::scope(|scope| {
            scope.spawn(|| {
                assert!(stack.current().is_none());
                let _ctx = stack.enter(Subscriber::Component(inner));
                entered.wait();
                released.wait();
                assert_eq!(stack.current_component(), Some(inner));
                assert_eq!(stack.depth(), 1);
            });

            entered.wait();
            assert_eq!(stack.current_component(), Some(outer));
            assert_eq!(stack.depth(), 1);
            released.wait();
        });

        assert_eq!(stack.current_component(), Some(outer));
        assert_eq!(stack.depth(), 1);
    }
}
