//! Method dispatch table.
//!
//! Maps method names to handlers that run against a server-owned state `S`.
//! Handlers are plain functions of `(&mut S, &Params)`; the event loop that
//! owns the state is the only caller, so handlers never need locking.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_common::protocol::JsonRpcError;
use tracing::error;

/// Named parameters of a request.
pub type Params = Map<String, Value>;

/// Outcome of a handler: a result object or a domain error.
pub type MethodResult = std::result::Result<Value, JsonRpcError>;

type Handler<S> = Box<dyn Fn(&mut S, &Params) -> MethodResult + Send + Sync>;

struct Registered<S> {
    handler: Handler<S>,
    calls: Arc<AtomicU64>,
}

/// Name → handler registry.
///
/// Registering the same name twice is an error at construction time.
pub struct DispatchTable<S> {
    methods: HashMap<String, Registered<S>>,
}

impl<S> DispatchTable<S> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Registers a handler under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketMeshError::DuplicateMethod`] if the name is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&mut S, &Params) -> MethodResult + Send + Sync + 'static,
    {
        let name = name.into();
        if self.methods.contains_key(&name) {
            return Err(TicketMeshError::DuplicateMethod(name));
        }

        self.methods.insert(
            name,
            Registered {
                handler: Box::new(handler),
                calls: Arc::new(AtomicU64::new(0)),
            },
        );
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_method<F>(mut self, name: impl Into<String>, handler: F) -> Result<Self>
    where
        F: Fn(&mut S, &Params) -> MethodResult + Send + Sync + 'static,
    {
        self.register(name, handler)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Shared view of the per-method call counters.
    pub fn stats(&self) -> MethodStats {
        let counters = self
            .methods
            .iter()
            .map(|(name, entry)| (name.clone(), entry.calls.clone()))
            .collect();
        MethodStats {
            counters: Arc::new(counters),
        }
    }

    /// Invokes the handler registered for `method`.
    ///
    /// Unknown methods yield `-32601`. A panicking handler is reported as
    /// `-32603` instead of taking the event loop down.
    pub fn dispatch(&self, state: &mut S, method: &str, params: &Params) -> MethodResult {
        let Some(entry) = self.methods.get(method) else {
            return Err(JsonRpcError::method_not_found());
        };

        entry.calls.fetch_add(1, Ordering::Relaxed);

        match catch_unwind(AssertUnwindSafe(|| (entry.handler)(state, params))) {
            Ok(result) => result,
            Err(_) => {
                error!(method, "Method handler panicked");
                Err(JsonRpcError::internal_error())
            }
        }
    }
}

impl<S> Default for DispatchTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-method invocation counters, readable from any thread.
#[derive(Clone, Default)]
pub struct MethodStats {
    counters: Arc<HashMap<String, Arc<AtomicU64>>>,
}

impl MethodStats {
    /// Number of times `method` was dispatched, `None` if it is not registered.
    pub fn calls(&self, method: &str) -> Option<u64> {
        self.counters
            .get(method)
            .map(|calls| calls.load(Ordering::Relaxed))
    }

    /// Total dispatches across all methods.
    pub fn total(&self) -> u64 {
        self.counters
            .values()
            .map(|calls| calls.load(Ordering::Relaxed))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(_: &mut u32, params: &Params) -> MethodResult {
        Ok(Value::Object(params.clone()))
    }

    #[test]
    fn test_register_and_dispatch() {
        let table = DispatchTable::new().with_method("echo", echo).unwrap();
        let mut state = 0u32;

        let params = json!({"a": 1}).as_object().cloned().unwrap();
        let result = table.dispatch(&mut state, "echo", &params).unwrap();
        assert_eq!(result, json!({"a": 1}));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut table = DispatchTable::<u32>::new();
        assert!(table.register("test", echo).is_ok());
        assert!(matches!(
            table.register("test", echo),
            Err(TicketMeshError::DuplicateMethod(name)) if name == "test"
        ));
        assert!(table.register("test-a", echo).is_ok());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unknown_method() {
        let table = DispatchTable::<u32>::new();
        let err = table.dispatch(&mut 0, "missing", &Params::new()).unwrap_err();
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn test_handler_mutates_state() {
        let table = DispatchTable::new()
            .with_method("bump", |count: &mut u32, _: &Params| {
                *count += 1;
                Ok(json!({"count": *count}))
            })
            .unwrap();

        let mut count = 0;
        table.dispatch(&mut count, "bump", &Params::new()).unwrap();
        table.dispatch(&mut count, "bump", &Params::new()).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_panicking_handler_is_internal_error() {
        let table = DispatchTable::new()
            .with_method("boom", |_: &mut u32, _: &Params| -> MethodResult {
                panic!("handler failure")
            })
            .unwrap();

        let err = table.dispatch(&mut 0, "boom", &Params::new()).unwrap_err();
        assert_eq!(err.code, -32603);
    }

    #[test]
    fn test_stats_count_calls() {
        let table = DispatchTable::new()
            .with_method("echo", echo)
            .unwrap()
            .with_method("other", echo)
            .unwrap();
        let stats = table.stats();

        table.dispatch(&mut 0, "echo", &Params::new()).unwrap();
        table.dispatch(&mut 0, "echo", &Params::new()).unwrap();
        let _ = table.dispatch(&mut 0, "nope", &Params::new());

        assert_eq!(stats.calls("echo"), Some(2));
        assert_eq!(stats.calls("other"), Some(0));
        assert_eq!(stats.calls("nope"), None);
        assert_eq!(stats.total(), 2);
    }
}
