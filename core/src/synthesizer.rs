//! Fuses retriever outputs and the reasoning trace into a final answer.
//! Pure with respect to the LLM: no graph I/O happens here.

use std::sync::Arc;

use crate::constants::{
    CHAIN_EXPLORATION_CONTENT_PREVIEW, CHAIN_EXPLORATION_PATH_PREVIEW,
    CHAIN_EXPLORATION_SNIPPET_CHARS, CITATIONS_SECTION_HEADER, NO_RELEVANT_RESULT,
    THINK_CLOSE_TAG, THINK_OPEN_TAG,
};
use crate::error::Result;
use crate::external::llm::{LlmClient, Message};
use crate::planner::RetrievalPlan;
use crate::retrievers::{ContentSnippet, ExplorationStep, ResultsByType};

/// Composes the synthesis prompt and calls the LLM once to produce the
/// final answer.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
}

impl Synthesizer {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// The LLM client backing this synthesizer, shared with callers that
    /// need to drive their own LLM calls against the same adapter (e.g. the
    /// coordinator's thinking engine).
    #[must_use]
    pub fn llm(&self) -> Arc<dyn LlmClient> {
        self.llm.clone()
    }

    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] with `stage = "synthesis"`
    /// if the call fails; per the error-handling design this is fatal to
    /// the request (never cached, surfaced to the caller).
    pub async fn synthesize(
        &self,
        question: &str,
        results: &ResultsByType,
        plan: &RetrievalPlan,
        thinking_text: Option<&str>,
    ) -> Result<String> {
        let prompt = build_prompt(question, results, plan, thinking_text);
        self.llm
            .invoke(&[Message::user(prompt)])
            .await
            .map_err(|e| crate::error::Error::LLMFailure {
                stage: "synthesis".to_string(),
                cause: e.to_string(),
            })
    }
}

fn build_prompt(
    question: &str,
    results: &ResultsByType,
    plan: &RetrievalPlan,
    thinking_text: Option<&str>,
) -> String {
    let mut sections = vec![format!("Question: {question}")];

    sections.push(format!(
        "Local search results:\n{}",
        format_text_list(&results.local)
    ));
    sections.push(format!(
        "Global search results:\n{}",
        format_text_list(&results.global)
    ));
    sections.push(format!(
        "Exploration results:\n{}",
        format_text_list(&results.exploration)
    ));
    sections.push(format!(
        "Chain exploration results:\n{}",
        format_chain_exploration(&results.chain_exploration)
    ));

    if plan.requires_global_view {
        sections.push("Note: this question requires a corpus-wide view.".to_string());
    }
    if plan.requires_path_tracking {
        sections.push("Note: this question requires tracking relationship paths.".to_string());
    }

    if let Some(text) = thinking_text {
        sections.push(format!("Reasoning trace:\n{text}"));
    }

    sections.push("Compose a single, well-cited answer from the above.".to_string());
    sections.join("\n\n")
}

fn format_text_list(items: &[String]) -> String {
    if items.is_empty() {
        return NO_RELEVANT_RESULT.to_string();
    }
    items.join("\n")
}

fn format_chain_exploration(runs: &[(Vec<ExplorationStep>, Vec<ContentSnippet>)]) -> String {
    if runs.is_empty() {
        return NO_RELEVANT_RESULT.to_string();
    }
    let mut out = Vec::new();
    for (path, content) in runs {
        for step in path.iter().take(CHAIN_EXPLORATION_PATH_PREVIEW) {
            out.push(format!(
                "step {}: node {} — {}",
                step.step, step.node_id, step.reasoning
            ));
        }
        for snippet in content.iter().take(CHAIN_EXPLORATION_CONTENT_PREVIEW) {
            let truncated: String = snippet.text.chars().take(CHAIN_EXPLORATION_SNIPPET_CHARS).collect();
            out.push(format!("content: {truncated}"));
        }
    }
    out.join("\n")
}

/// Strips any `<think>...</think>` block and any trailing `"#### Citations"`
/// section from a synthesized answer before it is cached or returned.
#[must_use]
pub fn sanitize_final_answer(answer: &str) -> String {
    let without_thinking = strip_think_block(answer);
    strip_citations_section(&without_thinking).trim().to_string()
}

fn strip_think_block(text: &str) -> String {
    let mut result = String::new();
    let mut rest = text;
    loop {
        let Some(start) = rest.find(THINK_OPEN_TAG) else {
            result.push_str(rest);
            break;
        };
        result.push_str(&rest[..start]);
        let after_open = &rest[start + THINK_OPEN_TAG.len()..];
        match after_open.find(THINK_CLOSE_TAG) {
            Some(end) => rest = &after_open[end + THINK_CLOSE_TAG.len()..],
            None => break,
        }
    }
    result
}

fn strip_citations_section(text: &str) -> String {
    text.find(CITATIONS_SECTION_HEADER)
        .map_or_else(|| text.to_string(), |idx| text[..idx].to_string())
}
