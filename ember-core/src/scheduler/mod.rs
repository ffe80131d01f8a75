//! Render Scheduler
//!
//! Component re-renders are not run inside the signal write that caused
//! them. The component is appended to a pending queue (at most once) and a
//! single flush is requested from the host. The flush swaps the queue out
//! and re-renders the captured batch in first-marked order.
//!
//! # Guarantees
//!
//! - A burst of writes in one tick re-renders each affected component once.
//! - Requests that arrive while a flush runs start the next batch, so a
//!   flush never recurses into itself.
//!
//! The queue itself lives here; the flush procedure that re-renders lives on
//! [`Runtime`](crate::Runtime) because it needs the root producer and the
//! document.

mod host;

pub use host::{FrameQueue, HostCallback, HostScheduler, ImmediateScheduler, TimerScheduler};

use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::reactive::ComponentId;

#[derive(Default)]
struct QueueState {
    pending: IndexSet<ComponentId>,
    flush_scheduled: bool,
}

/// Pending re-render queue plus the one-shot flush flag.
#[derive(Default)]
pub struct RenderQueue {
    state: Mutex<QueueState>,
}

/// Outcome of [`RenderQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    /// The component was not pending before.
    pub added: bool,
    /// The caller must request a flush from the host.
    pub request_flush: bool,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` pending.
    pub fn enqueue(&self, id: ComponentId) -> Enqueued {
        let mut state = self.state.lock();
        if !state.pending.insert(id) {
            return Enqueued {
                added: false,
                request_flush: false,
            };
        }
        Enqueued {
            added: true,
            request_flush: Self::claim(&mut state),
        }
    }

    /// Set the flush flag. Returns `true` if it was clear, meaning the
    /// caller now owns the single outstanding flush request.
    pub fn claim_flush(&self) -> bool {
        Self::claim(&mut self.state.lock())
    }

    fn claim(state: &mut QueueState) -> bool {
        if state.flush_scheduled {
            false
        } else {
            state.flush_scheduled = true;
            true
        }
    }

    /// Swap the pending queue for an empty one and clear the flush flag.
    pub fn take_batch(&self) -> Vec<ComponentId> {
        let mut state = self.state.lock();
        state.flush_scheduled = false;
        std::mem::take(&mut state.pending).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.state.lock().flush_scheduled
    }
}
