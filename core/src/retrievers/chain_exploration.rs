//! Chain exploration: a bounded multi-hop walk across the graph, each hop
//! chosen by vector similarity to the question, seeded from either the
//! task's explicit entities or the regex-based entity heuristic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, RetrieverError, Result};
use crate::external::embedding::EmbeddingClient;
use crate::external::graph::GraphStore;
use crate::external::llm::LlmClient;
use crate::tasks::{Task, TaskKind};

use super::entity_extraction::extract_entities;
use super::{ContentSnippet, ExplorationStep, RetrievalResult, Retriever};

const NODE_SIMILARITY_INDEX: &str = "graph_nodes";
const NODE_TEXT_CYPHER: &str = "MATCH (n {id: $id}) RETURN n.text AS text";

pub struct ChainExplorationRetriever {
    #[allow(dead_code)]
    llm: Arc<dyn LlmClient>,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingClient>,
    max_steps: usize,
}

impl ChainExplorationRetriever {
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingClient>,
        max_steps: usize,
    ) -> Self {
        Self {
            llm,
            graph,
            embedder,
            max_steps,
        }
    }

    fn wrap(e: impl ToString) -> Error {
        Error::RetrieverFailure(RetrieverError::new(TaskKind::ChainExploration, e.to_string()))
    }
}

#[async_trait]
impl Retriever for ChainExplorationRetriever {
    async fn search(&self, task: &Task) -> Result<RetrievalResult> {
        let seeds: Vec<String> = task
            .entities
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| extract_entities(&task.query));

        if seeds.is_empty() {
            return Ok(RetrievalResult::ChainExploration {
                exploration_path: Vec::new(),
                content: Vec::new(),
            });
        }

        let query_vectors = self
            .embedder
            .embed(&[task.query.clone()])
            .await
            .map_err(Self::wrap)?;
        let query_vector = query_vectors.into_iter().next().unwrap_or_default();

        let mut visited: HashSet<String> = HashSet::new();
        let mut exploration_path = Vec::new();
        let mut content = Vec::new();

        for seed in &seeds {
            visited.insert(seed.clone());
        }

        let mut step_number = 0u32;
        while step_number < self.max_steps as u32 {
            let candidates = self
                .graph
                .vector_search(NODE_SIMILARITY_INDEX, &query_vector, self.max_steps * 2 + seeds.len())
                .await
                .map_err(Self::wrap)?;

            let Some(next) = candidates.iter().find(|m| !visited.contains(&m.id)) else {
                break;
            };

            visited.insert(next.id.clone());
            step_number += 1;

            let mut params = HashMap::new();
            params.insert("id".to_string(), Value::String(next.id.clone()));
            let rows = self.graph.query(NODE_TEXT_CYPHER, &params).await.map_err(Self::wrap)?;
            let text = rows
                .first()
                .and_then(|r| r.get("text"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            exploration_path.push(ExplorationStep {
                step: step_number,
                node_id: next.id.clone(),
                reasoning: format!("similarity score {:.3} to the question", next.score),
            });
            if !text.is_empty() {
                content.push(ContentSnippet::new(text).with_evidence_id(next.id.clone()));
            }
        }

        Ok(RetrievalResult::ChainExploration {
            exploration_path,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fake::{FailingGraphStore, FakeEmbeddingClient, FakeGraphStore, FakeLlmClient};
    use crate::external::graph::{GraphRow, VectorMatch};

    fn task(entities: Option<Vec<String>>) -> Task {
        Task {
            kind: TaskKind::ChainExploration,
            query: "how does Alpha relate to Bravo?".to_string(),
            priority: 5,
            entities,
            insertion_index: 0,
        }
    }

    #[tokio::test]
    async fn missing_entities_yield_empty_result() {
        let llm = Arc::new(FakeLlmClient::new("unused"));
        let graph = Arc::new(FakeGraphStore::new());
        let embedder = Arc::new(FakeEmbeddingClient::default());
        let retriever = ChainExplorationRetriever::new(llm, graph, embedder, 3);
        let task = Task {
            entities: Some(Vec::new()),
            ..task(None)
        };
        let result = retriever.search(&task).await.unwrap();
        assert_eq!(
            result,
            RetrievalResult::ChainExploration {
                exploration_path: Vec::new(),
                content: Vec::new()
            }
        );
    }

    #[tokio::test]
    async fn walk_visits_new_nodes_up_to_max_steps() {
        let mut node_row = GraphRow::new();
        node_row.insert("text".to_string(), Value::String("Bravo is a subsidiary of Alpha.".to_string()));
        let graph = Arc::new(
            FakeGraphStore::new()
                .with_vector_result(
                    NODE_SIMILARITY_INDEX,
                    vec![
                        VectorMatch { id: "Alpha".to_string(), score: 0.9 },
                        VectorMatch { id: "Bravo".to_string(), score: 0.8 },
                    ],
                )
                .with_query_result(NODE_TEXT_CYPHER, vec![node_row]),
        );
        let llm = Arc::new(FakeLlmClient::new("unused"));
        let embedder = Arc::new(FakeEmbeddingClient::default());
        let retriever = ChainExplorationRetriever::new(llm, graph, embedder, 2);
        let task = task(Some(vec!["Alpha".to_string()]));
        let result = retriever.search(&task).await.unwrap();
        match result {
            RetrievalResult::ChainExploration { exploration_path, content } => {
                assert_eq!(exploration_path.len(), 1);
                assert_eq!(exploration_path[0].node_id, "Bravo");
                assert_eq!(content.len(), 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn graph_failure_is_wrapped() {
        let llm = Arc::new(FakeLlmClient::new("unused"));
        let graph = Arc::new(FailingGraphStore::new("down"));
        let embedder = Arc::new(FakeEmbeddingClient::default());
        let retriever = ChainExplorationRetriever::new(llm, graph, embedder, 2);
        let task = task(Some(vec!["Alpha".to_string()]));
        let err = retriever.search(&task).await.unwrap_err();
        match err {
            Error::RetrieverFailure(e) => assert_eq!(e.task_type, TaskKind::ChainExploration),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
