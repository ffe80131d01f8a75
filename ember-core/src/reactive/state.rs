//! State Containers
//!
//! A state container is a signal holding a structured record. Its setter
//! shallow-merges a partial record into the current value instead of
//! replacing it: keys in the update overwrite, every other key is kept.

use serde_json::{Map, Value};

use super::signal::Signal;

/// A structured record held by a [`State`].
pub type Record = Map<String, Value>;

/// A reactive record with merge-on-write semantics.
#[derive(Clone, Debug)]
pub struct State {
    signal: Signal<Record>,
}

impl State {
    pub(crate) fn new(signal: Signal<Record>) -> Self {
        Self { signal }
    }

    /// The whole record, subscribing the running effect or component.
    pub fn get(&self) -> Record {
        self.signal.get()
    }

    /// One field of the record, subscribing the running effect or component.
    pub fn get_field(&self, key: &str) -> Option<Value> {
        self.signal.with(|record| record.get(key).cloned())
    }

    pub fn get_untracked(&self) -> Record {
        self.signal.get_untracked()
    }

    /// Merge `partial` into the record, one level deep.
    ///
    /// Subscribers are only notified if the merge changed something.
    pub fn set(&self, partial: Record) {
        self.signal.update(|current| merge(current, partial));
    }

    /// Replace the whole record.
    pub fn replace(&self, record: Record) {
        self.signal.set(record);
    }

    pub fn id(&self) -> u64 {
        self.signal.id()
    }

    pub fn subscriber_count(&self) -> usize {
        self.signal.subscriber_count()
    }

    /// Split into read and write halves.
    pub fn split(self) -> (ReadState, WriteState) {
        (ReadState { state: self.clone() }, WriteState { state: self })
    }
}

fn merge(current: &Record, partial: Record) -> Record {
    let mut next = current.clone();
    for (key, value) in partial {
        next.insert(key, value);
    }
    next
}

/// Read half of a state container.
#[derive(Clone, Debug)]
pub struct ReadState {
    state: State,
}

impl ReadState {
    pub fn get(&self) -> Record {
        self.state.get()
    }

    pub fn get_field(&self, key: &str) -> Option<Value> {
        self.state.get_field(key)
    }
}

/// Write half of a state container.
#[derive(Clone, Debug)]
pub struct WriteState {
    state: State,
}

impl WriteState {
    pub fn set(&self, partial: Record) {
        self.state.set(partial);
    }

    pub fn replace(&self, record: Record) {
        self.state.replace(record);
    }
}

/// Build a [`Record`] from a JSON object literal. Non-objects yield an
/// empty record.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
