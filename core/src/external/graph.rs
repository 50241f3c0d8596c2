//! The graph store interface: read-only Cypher-like queries plus a native
//! vector index.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One row of a tabular query result; column name to JSON value.
pub type GraphRow = HashMap<String, Value>;

/// A vector search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    /// Node or chunk identifier.
    pub id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
}

/// Read-only query interface over the property graph and its vector index.
/// The core never writes to the graph store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Runs a Cypher-like query and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::GraphStoreFailure`] on any backend
    /// error.
    async fn query(&self, cypher: &str, params: &HashMap<String, Value>) -> Result<Vec<GraphRow>>;

    /// Runs a k-nearest-neighbor vector search against a named index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::GraphStoreFailure`] on any backend
    /// error.
    async fn vector_search(
        &self,
        index_name: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<VectorMatch>>;
}
