//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, state
//! containers and effects, plus the runtime that ties them to the render
//! scheduler.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while an effect or component is running, the signal records it as a
//! subscriber. When the value changes, every subscriber is notified.
//!
//! ## State Containers
//!
//! A State is a signal over a structured record whose setter merges a
//! partial record instead of replacing the whole value.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once when created
//! and again whenever a signal it read changes.
//!
//! # Implementation Notes
//!
//! Dependency detection is automatic: the runtime keeps a context stack of
//! the currently running effect or component, and every tracked read
//! consults it. Subscriptions are only ever added, never pruned by a later
//! run that skipped a read.

mod context;
mod effect;
pub(crate) mod runtime;
mod signal;
mod state;
mod subscriber;

pub use context::{ContextGuard, ContextStack};
pub use effect::{Effect, MAX_EFFECT_PASSES};
pub use runtime::{RootProducer, Runtime};
pub use signal::{ReadSignal, Signal, WriteSignal};
pub use state::{record, ReadState, Record, State, WriteState};
pub use subscriber::{ComponentId, Subscriber, SubscriberId, SubscriberKey};
