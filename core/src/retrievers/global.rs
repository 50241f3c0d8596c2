//! Global search: maps the question over every community summary in the
//! graph, producing one partial summary per community for later reduction
//! by the synthesizer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, RetrieverError, Result};
use crate::external::graph::GraphStore;
use crate::external::llm::{LlmClient, Message};
use crate::tasks::{Task, TaskKind};

use super::{RetrievalResult, Retriever};

const COMMUNITY_SUMMARIES_CYPHER: &str = "MATCH (c:Community) RETURN c.id AS id, c.summary AS summary";

pub struct GlobalSearchRetriever {
    llm: Arc<dyn LlmClient>,
    graph: Arc<dyn GraphStore>,
}

impl GlobalSearchRetriever {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, graph: Arc<dyn GraphStore>) -> Self {
        Self { llm, graph }
    }
}

#[async_trait]
impl Retriever for GlobalSearchRetriever {
    async fn search(&self, task: &Task) -> Result<RetrievalResult> {
        let rows = self
            .graph
            .query(COMMUNITY_SUMMARIES_CYPHER, &HashMap::new())
            .await
            .map_err(|e| Error::RetrieverFailure(RetrieverError::new(TaskKind::GlobalSearch, e.to_string())))?;

        if rows.is_empty() {
            return Ok(RetrievalResult::Summaries(Vec::new()));
        }

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let community_summary = row
                .get("summary")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if community_summary.is_empty() {
                continue;
            }
            let prompt = format!(
                "Given this community summary, extract anything relevant to the \
                 question. If nothing is relevant, say so briefly.\n\n\
                 Question: {}\n\nCommunity summary:\n{community_summary}",
                task.query
            );
            let partial = self
                .llm
                .invoke(&[Message::user(prompt)])
                .await
                .map_err(|e| Error::RetrieverFailure(RetrieverError::new(TaskKind::GlobalSearch, e.to_string())))?;
            summaries.push(partial);
        }
        Ok(RetrievalResult::Summaries(summaries))
    }
}
