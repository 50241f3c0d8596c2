//! Deterministic in-process adapters used by tests and the CLI's offline
//! mode. None of these talk to a real model or database.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

use super::embedding::EmbeddingClient;
use super::graph::{GraphRow, GraphStore, VectorMatch};
use super::llm::{LlmClient, Message};

/// Returns a scripted sequence of responses, one per call, then repeats a
/// default response once the script is exhausted.
pub struct FakeLlmClient {
    script: Mutex<VecDeque<String>>,
    default_response: String,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl FakeLlmClient {
    /// A client that always returns `default_response`.
    #[must_use]
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_response: default_response.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client that returns each of `responses` in order, then falls back
    /// to an empty string.
    #[must_use]
    pub fn with_script(responses: Vec<String>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            default_response: String::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of times `invoke` has been called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn invoke(&self, messages: &[Message]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let mut script = self.script.lock().unwrap();
        Ok(script.pop_front().unwrap_or_else(|| self.default_response.clone()))
    }
}

/// An [`LlmClient`] that always fails, for exercising failure-isolation
/// paths.
pub struct FailingLlmClient {
    cause: String,
}

impl FailingLlmClient {
    #[must_use]
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn invoke(&self, _messages: &[Message]) -> Result<String> {
        Err(crate::error::Error::LLMFailure {
            stage: "unspecified".to_string(),
            cause: self.cause.clone(),
        })
    }
}

/// Deterministic embedding: hashes each token into a fixed-size vector.
/// Cosine similarity between texts sharing tokens is higher than between
/// texts that share none, which is all the chain-exploration retriever
/// needs from a fake.
pub struct FakeEmbeddingClient {
    dimension: usize,
}

impl FakeEmbeddingClient {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for FakeEmbeddingClient {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    for token in text.split_whitespace() {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        use std::hash::{Hash, Hasher};
        token.to_lowercase().hash(&mut hasher);
        let bucket = (hasher.finish() as usize) % dimension;
        vector[bucket] += 1.0;
    }
    vector
}

/// An in-memory graph store backed by canned rows and vector matches keyed
/// by the exact cypher/index string a test configures.
#[derive(Default)]
pub struct FakeGraphStore {
    query_results: HashMap<String, Vec<GraphRow>>,
    vector_results: HashMap<String, Vec<VectorMatch>>,
}

impl FakeGraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the rows returned for an exact-match `cypher` string.
    #[must_use]
    pub fn with_query_result(mut self, cypher: impl Into<String>, rows: Vec<GraphRow>) -> Self {
        self.query_results.insert(cypher.into(), rows);
        self
    }

    /// Registers the matches returned for an exact-match `index_name`.
    #[must_use]
    pub fn with_vector_result(
        mut self,
        index_name: impl Into<String>,
        matches: Vec<VectorMatch>,
    ) -> Self {
        self.vector_results.insert(index_name.into(), matches);
        self
    }
}

#[async_trait]
impl GraphStore for FakeGraphStore {
    async fn query(&self, cypher: &str, _params: &HashMap<String, Value>) -> Result<Vec<GraphRow>> {
        Ok(self.query_results.get(cypher).cloned().unwrap_or_default())
    }

    async fn vector_search(
        &self,
        index_name: &str,
        _query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let mut matches = self.vector_results.get(index_name).cloned().unwrap_or_default();
        matches.truncate(k);
        Ok(matches)
    }
}

/// A [`GraphStore`] that always fails, for exercising the circuit breaker
/// and retriever failure isolation.
pub struct FailingGraphStore {
    cause: String,
}

impl FailingGraphStore {
    #[must_use]
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

#[async_trait]
impl GraphStore for FailingGraphStore {
    async fn query(&self, _cypher: &str, _params: &HashMap<String, Value>) -> Result<Vec<GraphRow>> {
        Err(crate::error::Error::GraphStoreFailure(self.cause.clone()))
    }

    async fn vector_search(
        &self,
        _index_name: &str,
        _query_vector: &[f32],
        _k: usize,
    ) -> Result<Vec<VectorMatch>> {
        Err(crate::error::Error::GraphStoreFailure(self.cause.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_llm_client_replays_script_then_default() {
        let client = FakeLlmClient::with_script(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(client.invoke(&[]).await.unwrap(), "first");
        assert_eq!(client.invoke(&[]).await.unwrap(), "second");
        assert_eq!(client.invoke(&[]).await.unwrap(), "");
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn fake_embedding_client_is_deterministic() {
        let client = FakeEmbeddingClient::new(8);
        let a = client.embed(&["hello world".to_string()]).await.unwrap();
        let b = client.embed(&["hello world".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fake_graph_store_returns_registered_rows() {
        let mut row = GraphRow::new();
        row.insert("name".to_string(), Value::String("Alpha".to_string()));
        let store = FakeGraphStore::new().with_query_result("MATCH (n) RETURN n", vec![row.clone()]);
        let rows = store.query("MATCH (n) RETURN n", &HashMap::new()).await.unwrap();
        assert_eq!(rows, vec![row]);
    }

    #[tokio::test]
    async fn failing_graph_store_reports_graph_store_failure() {
        let store = FailingGraphStore::new("connection refused");
        let err = store.query("MATCH (n) RETURN n", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::GraphStoreFailure(_)));
    }
}
