//! The thinking engine: iterative reasoning over a branching tree of steps,
//! with hypothesis generation, verification, and bounded outbound search.

pub mod branch;
pub mod parsing;
pub mod search_protocol;

pub use branch::ReasoningStep;
pub use parsing::{Hypothesis, HypothesisStatus};
pub use search_protocol::{SearchQueryOutcome, SearchQueryStatus};

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAIN_BRANCH, THINK_CLOSE_TAG, THINK_OPEN_TAG, TRUNCATED_REASONING_TAIL,
    TRUNCATED_REASONING_THRESHOLD,
};
use crate::error::Result;
use crate::external::llm::{LlmClient, Message};

use branch::BranchTree;

/// A verification judgment for one [`Hypothesis`], appended to the
/// verification chain in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub hypothesis: String,
    pub verification_text: String,
    pub status: HypothesisStatus,
}

/// Per-request reasoning state. Never shared across requests.
pub struct ThinkingEngine {
    llm: Arc<dyn LlmClient>,
    tree: BranchTree,
    current_branch: String,
    executed_queries: HashSet<String>,
    verification_chain: Vec<VerificationRecord>,
    max_search_iterations: u32,
    search_iterations: u32,
    query: String,
}

impl ThinkingEngine {
    /// Builds an engine bounded to `max_search_iterations` outbound search
    /// queries over its lifetime.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, max_search_iterations: u32) -> Self {
        Self {
            llm,
            tree: BranchTree::new(),
            current_branch: MAIN_BRANCH.to_string(),
            executed_queries: HashSet::new(),
            verification_chain: Vec::new(),
            max_search_iterations,
            search_iterations: 0,
            query: String::new(),
        }
    }

    /// Resets the trace and seeds the main branch with the query.
    pub fn initialize(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.tree = BranchTree::new();
        self.current_branch = MAIN_BRANCH.to_string();
        self.executed_queries.clear();
        self.verification_chain.clear();
        self.search_iterations = 0;
        self.tree.append(MAIN_BRANCH, format!("User question: {}", self.query));
    }

    /// Requests an initial open-ended analysis of the query from the LLM
    /// and appends it as a reasoning step.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if the call fails.
    pub async fn generate_initial_thinking(&mut self) -> Result<String> {
        let prompt = format!(
            "Think step by step about how to answer this question: {}",
            self.query
        );
        let text = self.invoke_llm("initial_thinking", &prompt).await?;
        self.tree.append(&self.current_branch.clone(), text.clone());
        Ok(text)
    }

    /// Generates candidate hypotheses from the initial analysis.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if the call fails.
    pub async fn generate_hypotheses(&mut self, initial: &str) -> Result<Vec<Hypothesis>> {
        let prompt = format!(
            "Based on this analysis, list distinct hypotheses as a JSON array of \
             objects with \"hypothesis\" and \"reasoning\" fields:\n\n{initial}"
        );
        let text = self.invoke_llm("hypotheses", &prompt).await?;
        Ok(parsing::parse_hypotheses(&text, initial))
    }

    /// Verifies one hypothesis: requests verification text, then classifies
    /// it into `{supported, rejected, uncertain}` with a second call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if either call fails.
    pub async fn verify_hypothesis(&mut self, hypothesis: &Hypothesis) -> Result<VerificationRecord> {
        let verify_prompt = format!(
            "Evaluate this hypothesis against the available evidence: {}",
            hypothesis.hypothesis
        );
        let verification_text = self.invoke_llm("verification", &verify_prompt).await?;

        let classify_prompt = format!(
            "Classify this verification as exactly one word, \"supported\", \
             \"rejected\", or \"uncertain\":\n\n{verification_text}"
        );
        let classification = self.invoke_llm("verification_classification", &classify_prompt).await?;
        let status = classify_status(&classification);

        let record = VerificationRecord {
            hypothesis: hypothesis.hypothesis.clone(),
            verification_text,
            status,
        };
        self.verification_chain.push(record.clone());
        Ok(record)
    }

    /// Summarizes verification counts by status and requests a revised
    /// synthesis incorporating them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if the call fails.
    pub async fn update_thinking_based_on_verification(
        &mut self,
        verifications: &[VerificationRecord],
    ) -> Result<String> {
        let supported = verifications.iter().filter(|v| v.status == HypothesisStatus::Supported).count();
        let rejected = verifications.iter().filter(|v| v.status == HypothesisStatus::Rejected).count();
        let uncertain = verifications.iter().filter(|v| v.status == HypothesisStatus::Uncertain).count();
        let prompt = format!(
            "Of {} hypotheses: {supported} supported, {rejected} rejected, {uncertain} uncertain. \
             Revise the reasoning to incorporate these verification results.",
            verifications.len()
        );
        let text = self.invoke_llm("revised_thinking", &prompt).await?;
        self.tree.append(&self.current_branch.clone(), text.clone());
        Ok(text)
    }

    /// Appends an externally-produced summary (e.g. from a just-completed
    /// retriever task) as a step on the current branch.
    pub fn record_external_step(&mut self, summary: impl Into<String>) {
        self.tree.append(&self.current_branch.clone(), summary.into());
    }

    /// Requests one final LLM pass over the accumulated reasoning and
    /// appends it as a step. Used once all retrieval tasks have finished.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if the call fails.
    pub async fn finalize_thinking(&mut self) -> Result<String> {
        let prompt = format!(
            "Given all reasoning and evidence gathered so far, produce a concise \
             final synthesis of your thinking:\n\n{}",
            self.get_full_thinking()
        );
        let text = self.invoke_llm("final_thinking", &prompt).await?;
        self.tree.append(&self.current_branch.clone(), text.clone());
        Ok(text)
    }

    /// Creates `name` as a copy of `base` and switches to it.
    pub fn branch(&mut self, name: &str, base: &str) {
        self.tree.branch_from(name, base);
        self.current_branch = name.to_string();
    }

    /// Switches the current branch; returns `false` if it doesn't exist.
    pub fn switch_branch(&mut self, name: &str) -> bool {
        if !self.tree.exists(name) {
            return false;
        }
        self.current_branch = name.to_string();
        true
    }

    /// Merges `src` into `dst` (default `"main"` at the call site).
    pub fn merge_branches(&mut self, src: &str, dst: &str) -> bool {
        self.tree.merge(src, dst)
    }

    /// Branches off, runs counter-analysis and comparison, returns to
    /// `"main"`, and appends a conclusion step there.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if either call fails.
    pub async fn counter_factual_analysis(&mut self, hypothesis: &Hypothesis) -> Result<String> {
        let branch_name = format!("counterfactual-{}", self.tree.steps(MAIN_BRANCH).len());
        self.branch(&branch_name, MAIN_BRANCH);

        let counter_prompt = format!(
            "Assume the opposite of this hypothesis is true and reason about the \
             consequences: {}",
            hypothesis.hypothesis
        );
        let counter_text = self.invoke_llm("counterfactual", &counter_prompt).await?;
        self.tree.append(&branch_name, counter_text.clone());

        let comparison_prompt = format!(
            "Compare the original hypothesis to this counterfactual and state which \
             is better supported:\n\nOriginal: {}\nCounterfactual: {counter_text}",
            hypothesis.hypothesis
        );
        let comparison = self.invoke_llm("counterfactual_comparison", &comparison_prompt).await?;

        self.switch_branch(MAIN_BRANCH);
        let conclusion = format!("Counterfactual analysis concluded: {comparison}");
        self.tree.append(MAIN_BRANCH, conclusion.clone());
        Ok(conclusion)
    }

    /// Advances the iterative search protocol by one LLM call. Enforces
    /// `max_search_iterations`: once exhausted, forces `answer_ready`
    /// without an LLM call.
    pub async fn generate_next_query(&mut self) -> SearchQueryOutcome {
        if self.search_iterations >= self.max_search_iterations {
            return SearchQueryOutcome {
                status: SearchQueryStatus::AnswerReady,
                content: "search iteration limit reached".to_string(),
                queries: Vec::new(),
            };
        }

        let prompt = self.prepare_truncated_reasoning();
        match self.invoke_llm("next_query", &prompt).await {
            Ok(text) => {
                let outcome = search_protocol::parse_search_response(&text);
                if outcome.status == SearchQueryStatus::HasQuery {
                    self.search_iterations += 1;
                }
                outcome
            }
            Err(e) => SearchQueryOutcome::error(e.to_string()),
        }
    }

    /// Whether `query` (trimmed, case-sensitive) has already been executed.
    #[must_use]
    pub fn has_executed_query(&self, query: &str) -> bool {
        self.executed_queries.contains(query.trim())
    }

    /// Records `query` as executed, preventing duplicate searches.
    pub fn add_executed_query(&mut self, query: &str) {
        self.executed_queries.insert(query.trim().to_string());
    }

    /// Bounds prompt size: beyond [`TRUNCATED_REASONING_THRESHOLD`] steps,
    /// keeps the first step, the last [`TRUNCATED_REASONING_TAIL`] steps,
    /// and any middle step mentioning a search marker, joined with `"..."`.
    #[must_use]
    pub fn prepare_truncated_reasoning(&self) -> String {
        let steps = self.tree.steps(&self.current_branch);
        if steps.len() <= TRUNCATED_REASONING_THRESHOLD {
            return steps.iter().map(|s| s.content.as_str()).collect::<Vec<_>>().join("\n");
        }

        let tail_start = steps.len().saturating_sub(TRUNCATED_REASONING_TAIL);
        let mut kept: Vec<&str> = Vec::new();
        kept.push(steps[0].content.as_str());
        for (i, step) in steps.iter().enumerate().skip(1).take(tail_start.saturating_sub(1)) {
            if step.content.contains("BEGIN_SEARCH_QUERY") || step.content.contains("END_SEARCH_QUERY") {
                let _ = i;
                kept.push(step.content.as_str());
            }
        }
        for step in &steps[tail_start..] {
            kept.push(step.content.as_str());
        }
        kept.join("\n...\n")
    }

    /// Concatenates all steps of the current branch, stripping query/result
    /// markers, wrapped in `<think>...</think>`.
    #[must_use]
    pub fn get_full_thinking(&self) -> String {
        let body = self
            .tree
            .steps(&self.current_branch)
            .iter()
            .map(|s| {
                s.content
                    .replace("BEGIN_SEARCH_QUERY", "")
                    .replace("END_SEARCH_QUERY", "")
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("{THINK_OPEN_TAG}{body}{THINK_CLOSE_TAG}")
    }

    async fn invoke_llm(&self, stage: &str, prompt: &str) -> Result<String> {
        self.llm
            .invoke(&[Message::user(prompt)])
            .await
            .map_err(|e| crate::error::Error::LLMFailure {
                stage: stage.to_string(),
                cause: e.to_string(),
            })
    }
}

fn classify_status(classification: &str) -> HypothesisStatus {
    let lower = classification.trim().to_lowercase();
    if lower.contains("supported") {
        HypothesisStatus::Supported
    } else if lower.contains("rejected") {
        HypothesisStatus::Rejected
    } else {
        HypothesisStatus::Uncertain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fake::FakeLlmClient;

    fn engine_with(responses: Vec<&str>) -> ThinkingEngine {
        let llm = Arc::new(FakeLlmClient::with_script(
            responses.into_iter().map(str::to_string).collect(),
        ));
        let mut engine = ThinkingEngine::new(llm, 5);
        engine.initialize("what is the capital of France?");
        engine
    }

    #[tokio::test]
    async fn initial_thinking_is_appended_to_main_branch() {
        let mut engine = engine_with(vec!["Paris is likely the answer."]);
        let text = engine.generate_initial_thinking().await.unwrap();
        assert_eq!(text, "Paris is likely the answer.");
        assert!(engine.tree.steps(MAIN_BRANCH).len() >= 2);
    }

    #[tokio::test]
    async fn hypotheses_fallback_to_regex_on_non_json() {
        let mut engine = engine_with(vec!["Hypothesis 1: Paris Reason: capital city"]);
        let hyps = engine.generate_hypotheses("analysis").await.unwrap();
        assert_eq!(hyps.len(), 1);
        assert_eq!(hyps[0].hypothesis, "Paris");
    }

    #[tokio::test]
    async fn verify_hypothesis_classifies_status() {
        let mut engine = engine_with(vec!["Paris is indeed the capital.", "supported"]);
        let hypothesis = Hypothesis {
            hypothesis: "Paris is the capital".to_string(),
            reasoning: "common knowledge".to_string(),
            status: HypothesisStatus::Pending,
        };
        let record = engine.verify_hypothesis(&hypothesis).await.unwrap();
        assert_eq!(record.status, HypothesisStatus::Supported);
    }

    #[test]
    fn executed_query_tracking_is_trimmed_and_case_sensitive() {
        let mut engine = engine_with(vec![]);
        engine.add_executed_query("  when was it founded  ");
        assert!(engine.has_executed_query("when was it founded"));
        assert!(!engine.has_executed_query("When was it founded"));
    }

    #[tokio::test]
    async fn generate_next_query_stops_at_iteration_limit() {
        let llm = Arc::new(FakeLlmClient::new(
            "BEGIN_SEARCH_QUERY another query END_SEARCH_QUERY",
        ));
        let mut engine = ThinkingEngine::new(llm, 2);
        engine.initialize("q");
        for _ in 0..2 {
            let outcome = engine.generate_next_query().await;
            assert_eq!(outcome.status, SearchQueryStatus::HasQuery);
        }
        let outcome = engine.generate_next_query().await;
        assert_eq!(outcome.status, SearchQueryStatus::AnswerReady);
    }

    #[test]
    fn truncated_reasoning_keeps_first_and_last_steps() {
        let mut engine = engine_with(vec![]);
        for i in 0..10 {
            engine.tree.append(MAIN_BRANCH, format!("step {i}"));
        }
        let truncated = engine.prepare_truncated_reasoning();
        let first_step = engine.tree.steps(MAIN_BRANCH)[0].content.clone();
        assert!(truncated.contains(&first_step));
        for step in engine.tree.steps(MAIN_BRANCH).iter().rev().take(TRUNCATED_REASONING_TAIL) {
            assert!(truncated.contains(&step.content));
        }
    }

    #[tokio::test]
    async fn finalize_thinking_appends_a_step() {
        let mut engine = engine_with(vec!["final synthesis of the reasoning"]);
        let before = engine.tree.steps(MAIN_BRANCH).len();
        let text = engine.finalize_thinking().await.unwrap();
        assert_eq!(text, "final synthesis of the reasoning");
        assert_eq!(engine.tree.steps(MAIN_BRANCH).len(), before + 1);
    }

    #[test]
    fn record_external_step_appends_to_current_branch() {
        let mut engine = engine_with(vec![]);
        let before = engine.tree.steps(MAIN_BRANCH).len();
        engine.record_external_step("local_search task completed: 3 facts found");
        assert_eq!(engine.tree.steps(MAIN_BRANCH).len(), before + 1);
    }

    #[test]
    fn full_thinking_strips_search_markers_and_wraps_tags() {
        let mut engine = engine_with(vec![]);
        engine.tree.append(MAIN_BRANCH, "BEGIN_SEARCH_QUERY x END_SEARCH_QUERY");
        let full = engine.get_full_thinking();
        assert!(full.starts_with(THINK_OPEN_TAG));
        assert!(full.ends_with(THINK_CLOSE_TAG));
        assert!(!full.contains("BEGIN_SEARCH_QUERY"));
    }
}
