//! Task type to handler routing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::broker::Task;
use crate::error::ProcessError;

/// Processes one task type.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Runs the task. An error makes the processor retry or archive it.
    async fn process_task(&self, task: &Task) -> Result<(), ProcessError>;
}

/// Registry of handlers keyed by task type name.
#[derive(Clone, Default)]
pub struct ServeMux {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl fmt::Debug for ServeMux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ServeMux").field("types", &types).finish()
    }
}

impl ServeMux {
    /// Creates an empty mux.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `type_name`, replacing any previous one.
    pub fn handle(&mut self, type_name: impl Into<String>, handler: impl TaskHandler + 'static) {
        self.handlers.insert(type_name.into(), Arc::new(handler));
    }

    /// Whether a handler is registered for `type_name`.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }
}

#[async_trait]
impl TaskHandler for ServeMux {
    async fn process_task(&self, task: &Task) -> Result<(), ProcessError> {
        let handler = self
            .handlers
            .get(&task.type_name)
            .ok_or_else(|| ProcessError::UnknownType(task.type_name.clone()))?;

        handler.process_task(task).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use uuid::Uuid;

    use super::*;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl TaskHandler for Counting {
        async fn process_task(&self, _task: &Task) -> Result<(), ProcessError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn task(type_name: &str) -> Task {
        Task {
            id: Uuid::now_v7(),
            type_name: type_name.to_string(),
            payload: b"{}".to_vec(),
            queue: "default".to_string(),
            max_retry: 3,
            retried: 0,
        }
    }

    #[tokio::test]
    async fn test_routes_by_type() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut mux = ServeMux::new();
        mux.handle("task:count", Counting(Arc::clone(&calls)));

        mux.process_task(&task("task:count")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(mux.contains("task:count"));
    }

    #[tokio::test]
    async fn test_unknown_type_fails() {
        let mux = ServeMux::new();

        let err = mux.process_task(&task("task:missing")).await.unwrap_err();

        assert!(matches!(err, ProcessError::UnknownType(t) if t == "task:missing"));
    }
}
