//! Host Scheduling Capabilities
//!
//! The render scheduler never decides by itself when a flush runs; it asks
//! an injected [`HostScheduler`] to call it back. Which policy is used is
//! fixed when the runtime is constructed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{trace, warn};

/// A deferred callback handed to the host.
pub type HostCallback = Box<dyn FnOnce() + Send>;

/// Capability to run a callback at the host's next opportunity.
pub trait HostScheduler: Send + Sync {
    fn request_callback(&self, callback: HostCallback);
}

/// "On next paint" queue. The host drives it by calling
/// [`run_frame`](FrameQueue::run_frame) once per frame.
#[derive(Default)]
pub struct FrameQueue {
    queue: Mutex<VecDeque<HostCallback>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback queued before this call. Callbacks queued while
    /// the frame runs wait for the next frame. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let callbacks: Vec<HostCallback> = self.queue.lock().drain(..).collect();
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        if count > 0 {
            trace!(callbacks = count, "frame ran");
        }
        count
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl HostScheduler for FrameQueue {
    fn request_callback(&self, callback: HostCallback) {
        self.queue.lock().push_back(callback);
    }
}

/// Timer fallback: each callback runs on a tokio task after `delay`.
///
/// Outside a tokio runtime callbacks go through an [`ImmediateScheduler`]
/// instead, so a callback requested from inside another still waits for
/// that one to return.
#[derive(Default)]
pub struct TimerScheduler {
    delay: Duration,
    fallback: ImmediateScheduler,
}

impl TimerScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fallback: ImmediateScheduler::new(),
        }
    }
}

impl HostScheduler for TimerScheduler {
    fn request_callback(&self, callback: HostCallback) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let delay = self.delay;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    callback();
                });
            }
            Err(_) => {
                warn!("no tokio runtime for timer scheduler; running callback without delay");
                self.fallback.request_callback(callback);
            }
        }
    }
}

/// Runs callbacks on the requesting thread before `request_callback`
/// returns.
///
/// A callback requested while another is running is queued and runs once
/// the running one returns, so callbacks never nest.
#[derive(Default)]
pub struct ImmediateScheduler {
    queue: Mutex<VecDeque<HostCallback>>,
    draining: AtomicBool,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn drain(&self) {
        let _draining = DrainGuard(&self.draining);
        loop {
            let next = self.queue.lock().pop_front();
            let Some(callback) = next else {
                break;
            };
            callback();
        }
    }
}

impl HostScheduler for ImmediateScheduler {
    fn request_callback(&self, callback: HostCallback) {
        self.queue.lock().push_back(callback);
        loop {
            if self.draining.swap(true, Ordering::SeqCst) {
                trace!("callback requested while draining; queued");
                return;
            }
            self.drain();
            // A push that raced the end of the drain still has to run.
            if self.queue.lock().is_empty() {
                return;
            }
        }
    }
}

/// Clears the draining flag on every exit path, unwinding included.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
