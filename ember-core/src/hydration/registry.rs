//! Module Registry
//!
//! Each client module records the functions it exposes and the global
//! defaults it seeded. Lookups go to the module's own table first. Under
//! [`FallbackPolicy::Shared`] they then fall through to a table shared by
//! every module, where the most recent registration of a name wins.
//!
//! Collisions in the shared table are not silent: each one is logged and
//! kept for inspection through [`ModuleRegistry::collisions`].

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::scope::GlobalScope;
use crate::config::FallbackPolicy;
use crate::reactive::Runtime;
use crate::view::Rendered;

/// Positional arguments reconstructed from a payload. A name missing from
/// the payload's args is `None` at its position.
pub type Args = Vec<Option<Value>>;

/// A compiled component function.
pub type ClientFunction = Arc<dyn Fn(&Runtime, Args) -> Rendered + Send + Sync>;

/// Functions and globals recorded for one module.
#[derive(Default, Clone)]
pub struct ModuleRecord {
    functions: IndexMap<String, ClientFunction>,
    globals: Map<String, Value>,
}

impl ModuleRecord {
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }
}

impl std::fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("globals", &self.globals)
            .finish()
    }
}

/// A function name registered by two different modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub name: String,
    /// Module whose entry was replaced in the shared table.
    pub first_module: String,
    /// Module that now owns the shared entry.
    pub second_module: String,
}

#[derive(Clone)]
struct FallbackEntry {
    module: String,
    function: ClientFunction,
}

pub struct ModuleRegistry {
    modules: IndexMap<String, ModuleRecord>,
    fallback: IndexMap<String, FallbackEntry>,
    global_values: Map<String, Value>,
    global_state: IndexMap<String, Map<String, Value>>,
    last_registered: Option<String>,
    armed: bool,
    policy: FallbackPolicy,
    collisions: Vec<Collision>,
}

impl ModuleRegistry {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            modules: IndexMap::new(),
            fallback: IndexMap::new(),
            global_values: Map::new(),
            global_state: IndexMap::new(),
            last_registered: None,
            armed: false,
            policy,
            collisions: Vec::new(),
        }
    }

    /// Record `module`'s functions (looked up in `scope`) and seed its
    /// global defaults. Registering arms hydration with `module` as the
    /// default. Returns how many functions were recorded.
    pub fn register<I, K>(&mut self, scope: &GlobalScope, module: &str, function_names: &[&str], global_defaults: I) -> usize
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let record = self.modules.entry(module.to_string()).or_default();
        let mut registered = 0;

        for &name in function_names {
            let Some(function) = scope.function(name) else {
                warn!(module = %module, function = %name, "function not defined in global scope; skipped");
                continue;
            };
            record.functions.insert(name.to_string(), Arc::clone(&function));
            registered += 1;

            if let Some(previous) = self.fallback.get(name) {
                if previous.module != module {
                    warn!(
                        function = %name,
                        previous = %previous.module,
                        module = %module,
                        "function name registered by two modules; shared entry replaced"
                    );
                    self.collisions.push(Collision {
                        name: name.to_string(),
                        first_module: previous.module.clone(),
                        second_module: module.to_string(),
                    });
                }
            }
            self.fallback.insert(
                name.to_string(),
                FallbackEntry {
                    module: module.to_string(),
                    function,
                },
            );
        }

        for (name, default) in global_defaults {
            let name = name.into();
            let value = scope.seed(&name, default);
            record.globals.insert(name.clone(), value.clone());
            self.global_values.insert(name, value);
        }

        self.last_registered = Some(module.to_string());
        if !self.armed {
            debug!(module = %module, "hydration armed");
            self.armed = true;
        }
        debug!(module = %module, functions = registered, "client module registered");
        registered
    }

    /// Find `function` for `module`, honoring the fallback policy.
    pub fn resolve(&self, module: &str, function: &str) -> Option<ClientFunction> {
        if let Some(found) = self.modules.get(module).and_then(|record| record.functions.get(function)) {
            return Some(Arc::clone(found));
        }
        if self.policy == FallbackPolicy::ModuleLocal {
            return None;
        }
        let entry = self.fallback.get(function)?;
        debug!(
            function = %function,
            module = %module,
            owner = %entry.module,
            "resolved through shared fallback"
        );
        Some(Arc::clone(&entry.function))
    }

    pub fn module(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.get(name)
    }

    pub fn contains_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// The most recently registered module.
    pub fn default_module(&self) -> Option<&str> {
        self.last_registered.as_deref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Store payload globals under `module`.
    pub fn install_globals(&mut self, module: &str, globals: &Map<String, Value>) {
        let state = self.global_state.entry(module.to_string()).or_default();
        for (name, value) in globals {
            state.insert(name.clone(), value.clone());
            self.global_values.insert(name.clone(), value.clone());
        }
    }

    pub fn global_state(&self, module: &str) -> Option<&Map<String, Value>> {
        self.global_state.get(module)
    }

    pub fn global_value(&self, name: &str) -> Option<&Value> {
        self.global_values.get(name)
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules)
            .field("armed", &self.armed)
            .field("policy", &self.policy)
            .field("collisions", &self.collisions)
            .finish()
    }
}
