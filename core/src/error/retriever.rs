//! Error types for retriever adapter operations.

use std::fmt;

use crate::tasks::TaskKind;

/// Errors surfaced by a single retriever invocation.
///
/// Per the error-handling design, these are recovered locally by the
/// coordinator: the failing task is marked errored in the execution trace
/// and the remaining tasks continue.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverError {
    /// Which retriever variant failed.
    pub task_type: TaskKind,
    /// Human-readable cause, e.g. a graph-store or LLM failure summary.
    pub cause: String,
}

impl RetrieverError {
    /// Build a retriever error for the given task kind.
    #[must_use]
    pub fn new(task_type: TaskKind, cause: impl Into<String>) -> Self {
        Self {
            task_type,
            cause: cause.into(),
        }
    }
}

impl fmt::Display for RetrieverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retriever failure: task={:?}, cause={}",
            self.task_type, self.cause
        )
    }
}

impl std::error::Error for RetrieverError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_task_type_and_cause() {
        let err = RetrieverError::new(TaskKind::GlobalSearch, "graph store unreachable");
        let msg = err.to_string();
        assert!(msg.contains("GlobalSearch"));
        assert!(msg.contains("graph store unreachable"));
    }
}
