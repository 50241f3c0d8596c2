//! End-to-end coverage of the coordinator pipeline against fake adapters,
//! one test per observable property: caching, dispatch ordering,
//! complexity-driven thinking, entity-seeded chain exploration, retriever
//! failure isolation, and single-flight deduplication under concurrency.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ragcoord_core::cache::CacheManager;
use ragcoord_core::config::{CacheConfig, Config};
use ragcoord_core::external::fake::{FakeEmbeddingClient, FakeGraphStore, FakeLlmClient};
use ragcoord_core::{AgentCoordinator, CacheRequest, Error, GraphStore};

fn coordinator(llm_responses: Vec<&str>) -> AgentCoordinator {
    coordinator_with_graph(llm_responses, Arc::new(FakeGraphStore::new()))
}

fn coordinator_with_graph(
    llm_responses: Vec<&str>,
    graph: Arc<dyn GraphStore>,
) -> AgentCoordinator {
    let config = Config::default();
    let cache = Arc::new(CacheManager::in_memory(&CacheConfig::default()));
    let llm = Arc::new(FakeLlmClient::with_script(
        llm_responses.into_iter().map(str::to_string).collect(),
    ));
    let embedder = Arc::new(FakeEmbeddingClient::default());
    AgentCoordinator::new(config, cache, llm, embedder, graph)
}

/// A [`GraphStore`] that fails only the query `global_search` issues
/// (matched by its distinctive `Community` node label) while every other
/// query or vector search delegates to a plain [`FakeGraphStore`].
struct PartiallyFailingGraphStore {
    inner: FakeGraphStore,
}

#[async_trait]
impl GraphStore for PartiallyFailingGraphStore {
    async fn query(
        &self,
        cypher: &str,
        params: &HashMap<String, Value>,
    ) -> ragcoord_core::error::Result<Vec<ragcoord_core::external::graph::GraphRow>> {
        if cypher.contains("Community") {
            return Err(Error::GraphStoreFailure("community index unreachable".to_string()));
        }
        self.inner.query(cypher, params).await
    }

    async fn vector_search(
        &self,
        index_name: &str,
        query_vector: &[f32],
        k: usize,
    ) -> ragcoord_core::error::Result<Vec<ragcoord_core::external::graph::VectorMatch>> {
        self.inner.vector_search(index_name, query_vector, k).await
    }
}

#[tokio::test]
async fn simple_cached_hit_skips_the_whole_pipeline() {
    let cache = Arc::new(CacheManager::in_memory(&CacheConfig::default()));
    let question = "What are the requirements?";
    cache
        .get_or_compute(&CacheRequest::new(question), || async {
            Ok("a previously computed answer".to_string())
        })
        .await
        .unwrap();

    let config = Config::default();
    let llm = Arc::new(FakeLlmClient::new("should never be invoked"));
    let embedder = Arc::new(FakeEmbeddingClient::default());
    let graph = Arc::new(FakeGraphStore::new());
    let coordinator = AgentCoordinator::new(config, cache, llm.clone(), embedder, graph);

    let outcome = coordinator.process_query(question, None).await.unwrap();

    assert_eq!(outcome.answer, "a previously computed answer");
    assert!(outcome.metrics.served_from_cache);
    assert_eq!(llm.call_count(), 0);
    assert_eq!(outcome.trace.events().len(), 1);
    assert_eq!(outcome.trace.events()[0].event_type, "cache_hit");
}

#[tokio::test]
async fn two_local_search_tasks_dispatch_in_priority_order() {
    let plan = r#"{"complexity":0.1,"tasks":[
        {"type":"local_search","query":"first query","priority":5},
        {"type":"local_search","query":"second query","priority":3}
    ]}"#;
    let coordinator = coordinator(vec![plan, "the synthesized answer"]);

    let outcome = coordinator.process_query("which matters more?", None).await.unwrap();

    assert_eq!(outcome.answer, "the synthesized answer");
    assert_eq!(outcome.results.local, vec!["".to_string(), "".to_string()]);

    let started_queries: Vec<&str> = outcome
        .trace
        .events()
        .iter()
        .filter(|e| e.event_type == "task_started")
        .map(|e| e.data.as_ref().and_then(|d| d["query"].as_str()).unwrap_or_default())
        .collect();
    assert_eq!(started_queries, vec!["first query", "second query"]);
}

#[tokio::test]
async fn high_complexity_enables_thinking_and_caches_a_clean_answer() {
    let long_question = "who, what, when, where is the more complex, most complex thing that \
        requires very long explanation spanning many many words to exceed the length threshold \
        for complexity scoring in this heuristic evaluation pass entirely and fully"
        .to_string();
    let plan = format!(
        r#"{{"complexity":0.9,"tasks":[{{"type":"local_search","query":"{long_question}","priority":3}}]}}"#
    );
    let coordinator = coordinator(vec![&plan, "initial thinking text", "final thinking text", "the answer"]);

    let outcome = coordinator.process_query(&long_question, None).await.unwrap();

    assert!(outcome.thinking.is_some());
    assert_eq!(outcome.answer, "the answer");
    assert!(!outcome.answer.contains("<think>"));
    assert!(outcome.trace.events().iter().any(|e| e.event_type == "initial_thinking"));
    assert!(outcome.trace.events().iter().any(|e| e.event_type == "final_thinking"));
}

#[tokio::test]
async fn chain_exploration_seeds_entities_from_prior_exploration_text() {
    let plan = r#"{"complexity":0.1,"tasks":[
        {"type":"exploration","query":"investigate mentions","priority":5},
        {"type":"chain_exploration","query":"follow up on what was found","priority":3}
    ]}"#;
    let coordinator = coordinator(vec![
        plan,
        "实体: Alpha\n[Bravo] was also mentioned",
        "[]",
        "**Final Answer** nothing more to search",
        "final synthesized answer",
    ]);

    let outcome = coordinator.process_query("what's unusual here?", None).await.unwrap();

    assert_eq!(outcome.metrics.tasks_skipped, 0);
    assert_eq!(outcome.metrics.tasks_completed, 2);
    assert_eq!(outcome.results.chain_exploration.len(), 1);
    assert!(outcome
        .trace
        .events()
        .iter()
        .any(|e| e.event_type == "task_completed" && e.description.contains("chain_exploration")));
}

#[tokio::test(start_paused = true)]
async fn global_search_failure_is_isolated_from_other_retrievers() {
    let plan = r#"{"complexity":0.2,"tasks":[
        {"type":"local_search","query":"background","priority":5},
        {"type":"global_search","query":"corpus overview","priority":4},
        {"type":"exploration","query":"explore the gap","priority":3}
    ]}"#;
    let graph: Arc<dyn GraphStore> = Arc::new(PartiallyFailingGraphStore { inner: FakeGraphStore::new() });
    let coordinator = coordinator_with_graph(
        vec![
            plan,
            "exploration initial analysis",
            "[]",
            "**Final Answer** nothing more to search",
            "synthesized from the survivors",
        ],
        graph,
    );

    let outcome = coordinator.process_query("what happened?", None).await.unwrap();

    assert_eq!(outcome.answer, "synthesized from the survivors");
    assert_eq!(outcome.metrics.tasks_completed, 2);
    assert_eq!(outcome.metrics.tasks_errored, 1);
    assert!(outcome
        .trace
        .events()
        .iter()
        .any(|e| e.event_type == "task_error" && e.description.contains("global_search")));
    assert!(!outcome.metrics.served_from_cache);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_queries_are_single_flighted() {
    let plan = r#"{"complexity":0.1,"tasks":[{"type":"local_search","query":"q","priority":3}]}"#;
    let config = Config::default();
    let cache = Arc::new(CacheManager::in_memory(&CacheConfig::default()));
    let llm = Arc::new(FakeLlmClient::with_script(vec![
        plan.to_string(),
        "the one true answer".to_string(),
    ]));
    let embedder = Arc::new(FakeEmbeddingClient::default());
    let graph = Arc::new(FakeGraphStore::new());
    let coordinator = Arc::new(AgentCoordinator::new(config, cache.clone(), llm.clone(), embedder, graph));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.process_query("what is the shared question?", None).await })
        })
        .collect();

    let mut answers = Vec::with_capacity(handles.len());
    for handle in handles {
        answers.push(handle.await.unwrap().unwrap().answer);
    }

    assert!(answers.iter().all(|a| a == "the one true answer"));
    assert_eq!(llm.call_count(), 2);
}
