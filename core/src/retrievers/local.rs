//! Local search: retrieves a localized neighborhood of the graph around the
//! task's topic and asks the LLM to weave it into prose.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, RetrieverError, Result};
use crate::external::graph::GraphStore;
use crate::external::llm::{LlmClient, Message};
use crate::tasks::{Task, TaskKind};

use super::{RetrievalResult, Retriever};

const LOCAL_NEIGHBORHOOD_CYPHER: &str =
    "MATCH (n)-[r]-(m) WHERE n.name CONTAINS $query OR m.name CONTAINS $query \
     RETURN n.name AS subject, type(r) AS relation, m.name AS object LIMIT 20";

pub struct LocalSearchRetriever {
    llm: Arc<dyn LlmClient>,
    graph: Arc<dyn GraphStore>,
}

impl LocalSearchRetriever {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, graph: Arc<dyn GraphStore>) -> Self {
        Self { llm, graph }
    }
}

#[async_trait]
impl Retriever for LocalSearchRetriever {
    async fn search(&self, task: &Task) -> Result<RetrievalResult> {
        let mut params = HashMap::new();
        params.insert("query".to_string(), Value::String(task.query.clone()));

        let rows = self
            .graph
            .query(LOCAL_NEIGHBORHOOD_CYPHER, &params)
            .await
            .map_err(|e| Error::RetrieverFailure(RetrieverError::new(TaskKind::LocalSearch, e.to_string())))?;

        if rows.is_empty() {
            return Ok(RetrievalResult::Text(String::new()));
        }

        let context = format_rows(&rows);
        let prompt = format!(
            "Using only this graph context, answer the question concisely.\n\n\
             Question: {}\n\nContext:\n{context}",
            task.query
        );
        let text = self
            .llm
            .invoke(&[Message::user(prompt)])
            .await
            .map_err(|e| Error::RetrieverFailure(RetrieverError::new(TaskKind::LocalSearch, e.to_string())))?;
        Ok(RetrievalResult::Text(text))
    }
}

fn format_rows(rows: &[crate::external::graph::GraphRow]) -> String {
    rows.iter()
        .map(|row| {
            let subject = row.get("subject").map_or_else(String::new, value_to_string);
            let relation = row.get("relation").map_or_else(String::new, value_to_string);
            let object = row.get("object").map_or_else(String::new, value_to_string);
            format!("{subject} -{relation}-> {object}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn value_to_string(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), str::to_string)
}
