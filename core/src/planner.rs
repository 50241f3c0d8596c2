//! Turns a question into an ordered retrieval plan via one LLM call,
//! cross-checked by a deterministic complexity heuristic.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::external::llm::{LlmClient, Message};
use crate::tasks::{Task, TaskKind};

/// Output of the planner: a complexity estimate and an ordered task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalPlan {
    pub complexity: f64,
    #[serde(default)]
    pub knowledge_areas: Vec<String>,
    #[serde(default)]
    pub key_entities: Vec<String>,
    #[serde(default)]
    pub requires_global_view: bool,
    #[serde(default)]
    pub requires_path_tracking: bool,
    #[serde(default)]
    pub has_temporal_aspects: bool,
    pub tasks: Vec<Task>,
}

impl RetrievalPlan {
    /// The plan used when the LLM's JSON can't be parsed: a single
    /// medium-priority local-search task over the raw question.
    #[must_use]
    pub fn default_for(question: &str) -> Self {
        Self {
            complexity: 0.5,
            knowledge_areas: Vec::new(),
            key_entities: Vec::new(),
            requires_global_view: false,
            requires_path_tracking: false,
            has_temporal_aspects: false,
            tasks: vec![Task {
                kind: TaskKind::LocalSearch,
                query: question.to_string(),
                priority: 3,
                entities: None,
                insertion_index: 0,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(rename = "type")]
    kind: TaskKind,
    query: String,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default)]
    entities: Option<Vec<String>>,
}

fn default_priority() -> u8 {
    3
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    complexity: f64,
    #[serde(default)]
    knowledge_areas: Vec<String>,
    #[serde(default)]
    key_entities: Vec<String>,
    #[serde(default)]
    requires_global_view: bool,
    #[serde(default)]
    requires_path_tracking: bool,
    #[serde(default)]
    has_temporal_aspects: bool,
    tasks: Vec<RawTask>,
}

const COMPARATIVE_MARKERS: &[&str] = &[
    "more", "most", "less", "least", "better", "best", "worse", "worst",
];

/// Deterministic complexity cross-check: question length, interrogative
/// count, comma count, and presence of comparative/superlative markers.
#[must_use]
pub fn heuristic_complexity(question: &str) -> f64 {
    let lower = question.to_lowercase();
    let length_term = (question.chars().count() as f64 / 200.0).min(1.0);

    let interrogatives = ["who", "what", "when", "where", "why", "how", "which"];
    let interrogative_count = lower
        .split_whitespace()
        .filter(|w| interrogatives.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
        .count();
    let interrogative_term = (interrogative_count as f64 / 3.0).min(1.0);

    let comma_term = (question.matches(',').count() as f64 / 3.0).min(1.0);

    let has_comparative = COMPARATIVE_MARKERS.iter().any(|m| lower.contains(m))
        || lower.split_whitespace().any(|w| w.ends_with("er") || w.ends_with("est"));
    let comparative_term = if has_comparative { 1.0 } else { 0.0 };

    ((length_term + interrogative_term + comma_term + comparative_term) / 4.0).clamp(0.0, 1.0)
}

/// Produces a [`RetrievalPlan`] for `question` via one LLM call, falling
/// back to [`RetrievalPlan::default_for`] on parse failure, with the final
/// complexity taken as `max(LLM, heuristic)`.
pub struct RetrievalPlanner {
    llm: Arc<dyn LlmClient>,
}

impl RetrievalPlanner {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if the underlying LLM
    /// call fails; a malformed (but present) response yields the default
    /// plan rather than an error, per [`RetrievalPlan::default_for`].
    pub async fn plan(&self, question: &str) -> Result<RetrievalPlan> {
        let prompt = format!(
            "Produce a JSON retrieval plan for this question with fields complexity, \
             knowledge_areas, key_entities, requires_global_view, requires_path_tracking, \
             has_temporal_aspects, and tasks (each with type, query, priority, entities?): \
             {question}"
        );
        let response = self
            .llm
            .invoke(&[Message::user(prompt)])
            .await
            .map_err(|e| crate::error::Error::LLMFailure {
                stage: "planning".to_string(),
                cause: e.to_string(),
            })?;

        let mut plan = parse_plan(&response).unwrap_or_else(|| RetrievalPlan::default_for(question));
        plan.complexity = plan.complexity.max(heuristic_complexity(question)).clamp(0.0, 1.0);
        for (index, task) in plan.tasks.iter_mut().enumerate() {
            task.insertion_index = index;
        }
        Ok(plan)
    }
}

fn parse_plan(response: &str) -> Option<RetrievalPlan> {
    let raw: RawPlan = serde_json::from_str(response).ok()?;
    if raw.tasks.is_empty() {
        return None;
    }
    Some(RetrievalPlan {
        complexity: raw.complexity,
        knowledge_areas: raw.knowledge_areas,
        key_entities: raw.key_entities,
        requires_global_view: raw.requires_global_view,
        requires_path_tracking: raw.requires_path_tracking,
        has_temporal_aspects: raw.has_temporal_aspects,
        tasks: raw
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, t)| Task {
                kind: t.kind,
                query: t.query,
                priority: t.priority,
                entities: t.entities,
                insertion_index: index,
            })
            .collect(),
    })
}
