//! Retrieval task types emitted by the retrieval planner and dispatched
//! by the coordinator.

use serde::{Deserialize, Serialize};

/// The four retriever variants the planner can request.
///
/// This is a closed set matched exhaustively by the coordinator's dispatch
/// loop; there is no dynamic string-based dispatch anywhere downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Retrieve from a localized neighborhood of the graph around a single topic.
    LocalSearch,
    /// Retrieve a global, corpus-wide summary view.
    GlobalSearch,
    /// Explore outward from a starting point without a fixed entity list.
    Exploration,
    /// Follow entity-to-entity relationships across multiple hops.
    ChainExploration,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::LocalSearch => write!(f, "local_search"),
            TaskKind::GlobalSearch => write!(f, "global_search"),
            TaskKind::Exploration => write!(f, "exploration"),
            TaskKind::ChainExploration => write!(f, "chain_exploration"),
        }
    }
}

/// A single unit of retrieval work produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Which retriever should handle this task.
    pub kind: TaskKind,
    /// The query text passed to the retriever.
    pub query: String,
    /// Scheduling priority; higher runs first.
    pub priority: u8,
    /// Entities to seed a `ChainExploration` task with, if known up front.
    pub entities: Option<Vec<String>>,
    /// Position in the planner's original task list, used as a tiebreaker
    /// when two tasks share a priority.
    pub insertion_index: usize,
}

impl Task {
    /// Sort key implementing the plan-ordering invariant: tasks run in
    /// descending priority, and ties break by original insertion order.
    #[must_use]
    pub fn sort_key(&self) -> (std::cmp::Reverse<u8>, usize) {
        (std::cmp::Reverse(self.priority), self.insertion_index)
    }
}

/// Sorts tasks by `(-priority, insertion_index)`, matching the plan-ordering
/// invariant: the result is a permutation of `tasks` ordered for dispatch.
#[must_use]
pub fn ordered_for_dispatch(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by_key(Task::sort_key);
    tasks
}
