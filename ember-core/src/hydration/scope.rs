//! The ambient scope compiled client code defines its functions and
//! globals into.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use super::registry::{Args, ClientFunction};
use crate::reactive::Runtime;
use crate::view::Rendered;

/// Named client functions and global bindings.
#[derive(Default)]
pub struct GlobalScope {
    functions: DashMap<String, ClientFunction>,
    values: DashMap<String, Value>,
}

impl GlobalScope {
    /// Define (or redefine) a client function.
    pub fn define_function<F>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(&Runtime, Args) -> Rendered + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<ClientFunction> {
        self.functions.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).map(|entry| entry.value().clone())
    }

    /// Bind `name` to `default` unless it is already bound. Returns the
    /// value the binding ends up with.
    pub fn seed(&self, name: &str, default: Value) -> Value {
        self.values.entry(name.to_string()).or_insert(default).value().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl std::fmt::Debug for GlobalScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalScope")
            .field("functions", &self.functions.len())
            .field("values", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Node;
    use serde_json::json;

    #[test]
    fn seed_keeps_existing_binding() {
        let scope = GlobalScope::default();
        scope.set("theme", json!("dark"));

        assert_eq!(scope.seed("theme", json!("light")), json!("dark"));
        assert_eq!(scope.seed("count", json!(0)), json!(0));
        assert!(scope.contains("count"));
    }

    #[test]
    fn functions_are_shared_handles() {
        let scope = GlobalScope::default();
        scope.define_function("App", |_, _| Rendered::Ready(Node::from("app")));

        assert!(scope.function("App").is_some());
        assert!(scope.function("Missing").is_none());
    }
}
