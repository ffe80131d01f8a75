//! Location fragment and history stack.

use std::sync::Arc;

use super::ListenerId;

/// Which navigation produced a [`LocationEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationEventKind {
    /// The fragment was changed by pushing a new entry.
    HashChange,
    /// The history stack was popped.
    PopState,
}

/// Notification delivered to location listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEvent {
    pub kind: LocationEventKind,
    /// The new fragment, without the leading `#`.
    pub fragment: String,
}

/// Callback for location changes.
pub type LocationListener = Arc<dyn Fn(&LocationEvent) + Send + Sync>;

pub(super) struct Location {
    history: Vec<String>,
    listeners: Vec<(ListenerId, LocationListener)>,
    next_listener: u64,
}

impl Location {
    pub(super) fn new(fragment: &str) -> Self {
        Self {
            history: vec![strip_hash(fragment).to_string()],
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub(super) fn current(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or("")
    }

    pub(super) fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns `false` when the fragment is unchanged.
    pub(super) fn push(&mut self, fragment: &str) -> bool {
        let fragment = strip_hash(fragment);
        if fragment == self.current() {
            return false;
        }
        self.history.push(fragment.to_string());
        true
    }

    pub(super) fn pop(&mut self) -> bool {
        if self.history.len() <= 1 {
            return false;
        }
        self.history.pop();
        true
    }

    pub(super) fn listen(&mut self, listener: LocationListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(super) fn unlisten(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub(super) fn listeners(&self) -> Vec<LocationListener> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

fn strip_hash(fragment: &str) -> &str {
    fragment.strip_prefix('#').unwrap_or(fragment)
}
