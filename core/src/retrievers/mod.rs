//! Retriever adapters: one struct per [`crate::tasks::TaskKind`] variant,
//! each a thin, idempotent wrapper over the LLM/graph/embedding interfaces.
//! None of these write to the graph store.

pub mod chain_exploration;
pub mod entity_extraction;
pub mod exploration;
pub mod global;
pub mod local;

pub use chain_exploration::ChainExplorationRetriever;
pub use entity_extraction::extract_entities;
pub use exploration::ExplorationRetriever;
pub use global::GlobalSearchRetriever;
pub use local::LocalSearchRetriever;

use async_trait::async_trait;

use crate::error::Result;
use crate::tasks::Task;

/// One step of a chain-exploration hop across the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationStep {
    /// 1-indexed position in the walk.
    pub step: u32,
    /// Identifier of the node landed on at this step.
    pub node_id: String,
    /// Why this hop was taken, as reported by the retriever.
    pub reasoning: String,
}

/// A piece of retrieved text content, optionally tied back to an evidence
/// identifier for later citation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSnippet {
    pub text: String,
    pub evidence_id: Option<String>,
}

impl ContentSnippet {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            evidence_id: None,
        }
    }

    #[must_use]
    pub fn with_evidence_id(mut self, evidence_id: impl Into<String>) -> Self {
        self.evidence_id = Some(evidence_id.into());
        self
    }
}

/// What a single retriever invocation produced. The coordinator matches on
/// the originating task's kind to know which variant to expect and where to
/// file it in a [`ResultsByType`].
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalResult {
    /// A single block of prose (local search, exploration).
    Text(String),
    /// Independent partial summaries to be reduced later (global search's
    /// map phase).
    Summaries(Vec<String>),
    /// A bounded graph walk plus the content gathered along it.
    ChainExploration {
        exploration_path: Vec<ExplorationStep>,
        content: Vec<ContentSnippet>,
    },
}

/// Uniform contract implemented by every retriever variant.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Executes `task` and returns its retrieved content.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::RetrieverFailure`] wrapping the
    /// underlying cause; the coordinator recovers from this by marking the
    /// task errored in the execution trace and continuing with the rest of
    /// the plan.
    async fn search(&self, task: &Task) -> Result<RetrievalResult>;
}

/// Retrieval results bucketed by the task kind that produced them, ready for
/// the synthesizer to fold into a final answer.
#[derive(Debug, Clone, Default)]
pub struct ResultsByType {
    pub local: Vec<String>,
    pub global: Vec<String>,
    pub exploration: Vec<String>,
    pub chain_exploration: Vec<(Vec<ExplorationStep>, Vec<ContentSnippet>)>,
}

impl ResultsByType {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_local(&mut self, text: String) {
        self.local.push(text);
    }

    pub fn push_global(&mut self, summaries: Vec<String>) {
        self.global.extend(summaries);
    }

    pub fn push_exploration(&mut self, text: String) {
        self.exploration.push(text);
    }

    pub fn push_chain_exploration(
        &mut self,
        path: Vec<ExplorationStep>,
        content: Vec<ContentSnippet>,
    ) {
        self.chain_exploration.push((path, content));
    }

    /// Files a [`RetrievalResult`] into the bucket implied by its shape.
    /// Used by the coordinator, which already knows the task kind but
    /// benefits from not having to re-derive the match arm per call site.
    pub fn record(&mut self, kind: crate::tasks::TaskKind, result: RetrievalResult) {
        use crate::tasks::TaskKind;
        match (kind, result) {
            (TaskKind::LocalSearch, RetrievalResult::Text(text)) => self.push_local(text),
            (TaskKind::GlobalSearch, RetrievalResult::Summaries(summaries)) => {
                self.push_global(summaries);
            }
            (TaskKind::Exploration, RetrievalResult::Text(text)) => self.push_exploration(text),
            (
                TaskKind::ChainExploration,
                RetrievalResult::ChainExploration { exploration_path, content },
            ) => self.push_chain_exploration(exploration_path, content),
            (_, other) => {
                // A retriever returned a shape its own task kind wouldn't
                // produce; file it as text rather than dropping it.
                let text = match other {
                    RetrievalResult::Text(t) => t,
                    RetrievalResult::Summaries(s) => s.join("\n"),
                    RetrievalResult::ChainExploration { content, .. } => content
                        .into_iter()
                        .map(|c| c.text)
                        .collect::<Vec<_>>()
                        .join("\n"),
                };
                self.push_local(text);
            }
        }
    }
}
