//! Subscriber types for the reactive system.
//!
//! A Subscriber is anything a signal notifies when it changes: an effect,
//! which re-runs synchronously, or a component, which is handed to the
//! render scheduler.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::Effect;

/// Unique identifier for an effect.
///
/// Each effect gets a unique ID when created. This ID is used to key
/// subscriber sets so that re-subscription is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque identifier naming a renderable root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Generate a new unique component ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Identity of a subscriber inside a signal's subscriber set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberKey {
    Effect(SubscriberId),
    Component(ComponentId),
}

/// A subscriber to reactive values.
#[derive(Clone)]
pub enum Subscriber {
    /// Re-run synchronously on change.
    Effect(Effect),
    /// Re-rendered through the scheduler on change.
    Component(ComponentId),
}

impl Subscriber {
    pub fn key(&self) -> SubscriberKey {
        match self {
            Subscriber::Effect(effect) => SubscriberKey::Effect(effect.id()),
            Subscriber::Component(id) => SubscriberKey::Component(*id),
        }
    }

    /// Disposed effects are pruned from subscriber sets on the next write.
    pub(crate) fn is_live(&self) -> bool {
        match self {
            Subscriber::Effect(effect) => !effect.is_disposed(),
            Subscriber::Component(_) => true,
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriber::Effect(effect) => f.debug_tuple("Effect").field(&effect.id()).finish(),
            Subscriber::Component(id) => f.debug_tuple("Component").field(id).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn component_keys_compare_by_id() {
        let id = ComponentId::new();
        assert_eq!(Subscriber::Component(id).key(), Subscriber::Component(id).key());
        assert_ne!(
            Subscriber::Component(id).key(),
            Subscriber::Component(ComponentId::new()).key()
        );
    }
}
