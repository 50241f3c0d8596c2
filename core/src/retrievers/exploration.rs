//! Exploration: open-ended reasoning without a fixed entity list. Owns a
//! fresh, bounded [`ThinkingEngine`] per call; nothing is shared across
//! requests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, RetrieverError, Result};
use crate::external::graph::GraphStore;
use crate::external::llm::LlmClient;
use crate::tasks::{Task, TaskKind};
use crate::thinking::search_protocol::SearchQueryStatus;
use crate::thinking::ThinkingEngine;

use super::{RetrievalResult, Retriever};

const EXPLORATION_SEARCH_CYPHER: &str =
    "MATCH (n) WHERE n.name CONTAINS $query OR n.text CONTAINS $query \
     RETURN n.name AS name, n.text AS text LIMIT 10";

pub struct ExplorationRetriever {
    llm: Arc<dyn LlmClient>,
    graph: Arc<dyn GraphStore>,
    max_search_iterations: u32,
}

impl ExplorationRetriever {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, graph: Arc<dyn GraphStore>, max_search_iterations: u32) -> Self {
        Self {
            llm,
            graph,
            max_search_iterations,
        }
    }

    async fn run_search_findings(&self, engine: &mut ThinkingEngine) -> Result<Vec<String>> {
        let mut findings = Vec::new();
        loop {
            let outcome = engine.generate_next_query().await;
            match outcome.status {
                SearchQueryStatus::HasQuery => {
                    for query in &outcome.queries {
                        if engine.has_executed_query(query) {
                            continue;
                        }
                        engine.add_executed_query(query);
                        let mut params = HashMap::new();
                        params.insert("query".to_string(), Value::String(query.clone()));
                        let rows = self
                            .graph
                            .query(EXPLORATION_SEARCH_CYPHER, &params)
                            .await
                            .map_err(|e| {
                                Error::RetrieverFailure(RetrieverError::new(TaskKind::Exploration, e.to_string()))
                            })?;
                        for row in rows {
                            if let Some(text) = row.get("text").and_then(|v| v.as_str()) {
                                findings.push(text.to_string());
                            }
                        }
                    }
                }
                SearchQueryStatus::AnswerReady | SearchQueryStatus::Empty => break,
                SearchQueryStatus::Error => {
                    return Err(Error::RetrieverFailure(RetrieverError::new(
                        TaskKind::Exploration,
                        outcome.content,
                    )));
                }
            }
        }
        Ok(findings)
    }
}

#[async_trait]
impl Retriever for ExplorationRetriever {
    async fn search(&self, task: &Task) -> Result<RetrievalResult> {
        let mut engine = ThinkingEngine::new(self.llm.clone(), self.max_search_iterations);
        engine.initialize(task.query.clone());

        let wrap = |e: Error| Error::RetrieverFailure(RetrieverError::new(TaskKind::Exploration, e.to_string()));

        let initial = engine.generate_initial_thinking().await.map_err(wrap)?;
        let hypotheses = engine.generate_hypotheses(&initial).await.map_err(wrap)?;

        let mut verifications = Vec::with_capacity(hypotheses.len());
        for hypothesis in &hypotheses {
            let record = engine.verify_hypothesis(hypothesis).await.map_err(wrap)?;
            verifications.push(record);
        }
        if !verifications.is_empty() {
            engine
                .update_thinking_based_on_verification(&verifications)
                .await
                .map_err(wrap)?;
        }

        let findings = self.run_search_findings(&mut engine).await?;

        let mut text = engine.get_full_thinking();
        if !findings.is_empty() {
            text.push_str("\n\nSearch findings:\n");
            text.push_str(&findings.join("\n"));
        }
        Ok(RetrievalResult::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fake::{FailingGraphStore, FakeGraphStore, FakeLlmClient};

    fn task() -> Task {
        Task {
            kind: TaskKind::Exploration,
            query: "what is unusual about this dataset?".to_string(),
            priority: 3,
            entities: None,
            insertion_index: 0,
        }
    }

    #[tokio::test]
    async fn exploration_with_no_hypotheses_still_returns_wrapped_thinking() {
        let llm = Arc::new(FakeLlmClient::with_script(vec![
            "initial analysis".to_string(),
            "[]".to_string(),
            "**Final Answer** nothing more to search".to_string(),
        ]));
        let graph = Arc::new(FakeGraphStore::new());
        let retriever = ExplorationRetriever::new(llm, graph, 3);
        let result = retriever.search(&task()).await.unwrap();
        match result {
            RetrievalResult::Text(text) => {
                assert!(text.contains("<think>"));
                assert!(text.contains("initial analysis"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn graph_failure_during_search_findings_is_wrapped() {
        let llm = Arc::new(FakeLlmClient::with_script(vec![
            "initial analysis".to_string(),
            "[]".to_string(),
            "BEGIN_SEARCH_QUERY more context END_SEARCH_QUERY".to_string(),
        ]));
        let graph = Arc::new(FailingGraphStore::new("unreachable"));
        let retriever = ExplorationRetriever::new(llm, graph, 3);
        let err = retriever.search(&task()).await.unwrap_err();
        match err {
            Error::RetrieverFailure(e) => assert_eq!(e.task_type, TaskKind::Exploration),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
