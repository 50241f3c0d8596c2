//! The agent coordinator: turns a question into an ordered task list and
//! drives retrievers, the thinking engine, and the synthesizer to produce a
//! cited answer, in both batch and streaming modes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Notify, Semaphore};
use uuid::Uuid;

use crate::cache::{CacheManager, CacheRequest};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::evidence::{EvidenceEntry, EvidenceSummary, EvidenceTracker};
use crate::external::embedding::EmbeddingClient;
use crate::external::graph::GraphStore;
use crate::external::llm::LlmClient;
use crate::planner::{RetrievalPlan, RetrievalPlanner};
use crate::retrievers::{
    ChainExplorationRetriever, ExplorationRetriever, GlobalSearchRetriever, LocalSearchRetriever,
    RetrievalResult, Retriever, ResultsByType,
};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::synthesizer::{sanitize_final_answer, Synthesizer};
use crate::tasks::{ordered_for_dispatch, Task, TaskKind};
use crate::trace::ExecutionTrace;

/// Cooperative cancellation signal shared between a caller and an in-flight
/// [`AgentCoordinator::process_query_stream`] run.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Requests cancellation; idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A progress marker emitted during [`AgentCoordinator::process_query_stream`].
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A named pipeline stage started or advanced.
    Stage {
        stage: String,
        progress: f64,
        message: String,
    },
    /// A chunk of the final answer, emitted once synthesis completes.
    AnswerChunk(String),
}

/// Coarse timing and outcome counters for one request.
#[derive(Debug, Clone, Default)]
pub struct QueryMetrics {
    pub total_duration: Duration,
    pub tasks_completed: usize,
    pub tasks_errored: usize,
    pub tasks_skipped: usize,
    pub served_from_cache: bool,
}

/// Everything [`AgentCoordinator::process_query`] produces for one question.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: String,
    pub plan: RetrievalPlan,
    pub results: ResultsByType,
    pub thinking: Option<String>,
    pub trace: ExecutionTrace,
    pub metrics: QueryMetrics,
    pub evidence_summary: Option<EvidenceSummary>,
}

impl QueryOutcome {
    fn cached(answer: String, elapsed: Duration) -> Self {
        let mut trace = ExecutionTrace::new();
        trace.record("cache_hit", "served from cache, pipeline skipped");
        Self {
            answer,
            plan: RetrievalPlan::default_for(""),
            results: ResultsByType::default(),
            thinking: None,
            trace,
            metrics: QueryMetrics {
                total_duration: elapsed,
                served_from_cache: true,
                ..Default::default()
            },
            evidence_summary: None,
        }
    }
}

/// Planner/dispatcher that turns a query into an ordered task list and
/// drives retrievers and the synthesizer.
pub struct AgentCoordinator {
    config: Config,
    cache: Arc<CacheManager>,
    planner: RetrievalPlanner,
    synthesizer: Synthesizer,
    retrievers: HashMap<TaskKind, Arc<dyn Retriever>>,
    circuit_breaker: CircuitBreaker,
    worker_pool: Arc<Semaphore>,
}

impl AgentCoordinator {
    #[must_use]
    pub fn new(
        config: Config,
        cache: Arc<CacheManager>,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingClient>,
        graph: Arc<dyn GraphStore>,
    ) -> Self {
        let mut retrievers: HashMap<TaskKind, Arc<dyn Retriever>> = HashMap::new();
        retrievers.insert(
            TaskKind::LocalSearch,
            Arc::new(LocalSearchRetriever::new(llm.clone(), graph.clone())),
        );
        retrievers.insert(
            TaskKind::GlobalSearch,
            Arc::new(GlobalSearchRetriever::new(llm.clone(), graph.clone())),
        );
        retrievers.insert(
            TaskKind::Exploration,
            Arc::new(ExplorationRetriever::new(
                llm.clone(),
                graph.clone(),
                config.thinking.max_search_iterations,
            )),
        );
        retrievers.insert(
            TaskKind::ChainExploration,
            Arc::new(ChainExplorationRetriever::new(
                llm.clone(),
                graph,
                embedder,
                config.chain_exploration.max_steps as usize,
            )),
        );

        Self {
            planner: RetrievalPlanner::new(llm.clone()),
            synthesizer: Synthesizer::new(llm),
            circuit_breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            worker_pool: Arc::new(Semaphore::new(config.coordinator.worker_pool_size)),
            cache,
            retrievers,
            config,
        }
    }

    /// Answers `question`, optionally scoped to a conversation `thread_id`
    /// for session-tier caching, with no progress reporting.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails; individual retriever failures
    /// are recovered locally and recorded in the trace instead.
    pub async fn process_query(&self, question: &str, thread_id: Option<&str>) -> Result<QueryOutcome> {
        self.run(question, thread_id, None, CancellationToken::new()).await
    }

    /// Answers `question` like [`Self::process_query`], but schedules each
    /// retriever invocation on the worker pool and reports [`ProgressEvent`]s
    /// on `progress` as the pipeline advances. `cancel` may be triggered by
    /// the caller to abort before completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires before completion, or
    /// any error [`Self::process_query`] would return.
    pub async fn process_query_stream(
        &self,
        question: &str,
        thread_id: Option<&str>,
        progress: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<QueryOutcome> {
        self.run(question, thread_id, Some(progress), cancel).await
    }

    async fn run(
        &self,
        question: &str,
        thread_id: Option<&str>,
        progress: Option<mpsc::Sender<ProgressEvent>>,
        cancel: CancellationToken,
    ) -> Result<QueryOutcome> {
        let start = Instant::now();
        let request = thread_id.map_or_else(
            || CacheRequest::new(question),
            |t| CacheRequest::new(question).with_thread_id(t),
        );

        let side_channel: Arc<tokio::sync::Mutex<Option<QueryOutcome>>> =
            Arc::new(tokio::sync::Mutex::new(None));
        let side_channel_for_compute = side_channel.clone();

        let answer = self
            .cache
            .get_or_compute(&request, || async move {
                let outcome = self.run_pipeline(question, progress, cancel).await?;
                let sanitized = sanitize_final_answer(&outcome.answer);
                *side_channel_for_compute.lock().await = Some(QueryOutcome {
                    answer: sanitized.clone(),
                    ..outcome
                });
                Ok(sanitized)
            })
            .await?;

        let mut outcome = side_channel
            .lock()
            .await
            .take()
            .unwrap_or_else(|| QueryOutcome::cached(answer.clone(), start.elapsed()));
        outcome.answer = answer;
        outcome.metrics.total_duration = start.elapsed();
        Ok(outcome)
    }

    async fn run_pipeline(
        &self,
        question: &str,
        progress: Option<mpsc::Sender<ProgressEvent>>,
        cancel: CancellationToken,
    ) -> Result<QueryOutcome> {
        let start = Instant::now();
        let deadline = start + Duration::from_secs(self.config.coordinator.total_timeout_seconds);
        let mut trace = ExecutionTrace::new();
        let mut metrics = QueryMetrics::default();
        let query_id = Uuid::new_v4();
        let mut evidence = EvidenceTracker::new();
        evidence.start(query_id);

        emit(&progress, "planning", 0.0, "decomposing the question").await;
        trace.record("planning", "invoking retrieval planner");
        let plan = self.planner.plan(question).await?;

        let mut thinking = if plan.complexity > self.config.plan.complexity_threshold {
            let mut engine = crate::thinking::ThinkingEngine::new(
                self.synthesizer.llm(),
                self.config.thinking.max_search_iterations,
            );
            engine.initialize(question);
            let initial = engine.generate_initial_thinking().await;
            trace.record("initial_thinking", "thinking engine initialized");
            match initial {
                Ok(_) => Some(engine),
                Err(e) => {
                    trace.record_with_data(
                        "initial_thinking_failed",
                        "thinking engine disabled after initial call failed",
                        Some(serde_json::json!({ "cause": e.to_string() })),
                    );
                    None
                }
            }
        } else {
            None
        };

        let ordered_tasks = ordered_for_dispatch(plan.tasks.clone());
        let mut results = ResultsByType::new();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        for task in &ordered_tasks {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if Instant::now() >= deadline {
                trace.record("deadline_exceeded", "whole-query timeout reached, synthesizing partial answer");
                break;
            }

            let resolved_task = self.resolve_entities(task, &results, &mut trace, &mut metrics);
            let Some(resolved_task) = resolved_task else {
                continue;
            };

            emit(
                &progress,
                "retrieving",
                0.0,
                &format!("running {} task", resolved_task.kind),
            )
            .await;
            trace.record_with_data(
                "task_started",
                &format!("{} task started", resolved_task.kind),
                Some(serde_json::json!({ "query": resolved_task.query })),
            );

            match self.dispatch(&resolved_task).await {
                Ok(result) => {
                    metrics.tasks_completed += 1;
                    trace.record("task_completed", &format!("{} task completed", resolved_task.kind));
                    self.record_evidence(&mut evidence, query_id, &result);
                    if let Some(engine) = thinking.as_mut() {
                        engine.record_external_step(summarize_result(&resolved_task, &result));
                    }
                    results.record(resolved_task.kind, result);
                }
                Err(e) => {
                    metrics.tasks_errored += 1;
                    trace.record_with_data(
                        "task_error",
                        &format!("{} task failed", resolved_task.kind),
                        Some(serde_json::json!({ "cause": e.to_string() })),
                    );
                }
            }
        }

        if let Some(engine) = thinking.as_mut() {
            emit(&progress, "final_thinking", 0.8, "finalizing reasoning").await;
            trace.record("final_thinking", "requesting final reasoning update");
            let _ = engine.finalize_thinking().await;
        }
        let thinking_text = thinking.as_ref().map(crate::thinking::ThinkingEngine::get_full_thinking);

        emit(&progress, "synthesizing", 0.9, "composing final answer").await;
        trace.record("synthesizing", "invoking synthesizer");
        let answer = self
            .synthesizer
            .synthesize(question, &results, &plan, thinking_text.as_deref())
            .await?;

        if let Some(tx) = &progress {
            let _ = tx.send(ProgressEvent::AnswerChunk(answer.clone())).await;
        }

        metrics.total_duration = start.elapsed();
        trace.record("done", "query complete");
        let evidence_summary = evidence.get_summary(query_id);

        Ok(QueryOutcome {
            answer,
            plan,
            results,
            thinking: thinking_text,
            trace,
            metrics,
            evidence_summary,
        })
    }

    /// Dispatches `task` to its adapter through the circuit breaker and a
    /// fresh retry policy, on a worker-pool permit.
    async fn dispatch(&self, task: &Task) -> Result<RetrievalResult> {
        let Some(retriever) = self.retrievers.get(&task.kind).cloned() else {
            return Err(Error::InvalidInput(format!("no retriever registered for {}", task.kind)));
        };
        let permit = self
            .worker_pool
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::InvalidInput("worker pool closed".to_string()))?;

        let task = task.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let mut retry = RetryPolicy::with_config(RetryConfig::default());
            retry.execute(|| retriever.search(&task)).await
        });

        self.circuit_breaker
            .call(|| async move {
                handle
                    .await
                    .map_err(|e| Error::InvalidInput(format!("retriever task panicked: {e}")))?
            })
            .await
    }

    fn resolve_entities(
        &self,
        task: &Task,
        results: &ResultsByType,
        trace: &mut ExecutionTrace,
        metrics: &mut QueryMetrics,
    ) -> Option<Task> {
        if task.kind != TaskKind::ChainExploration {
            return Some(task.clone());
        }
        if task.entities.as_ref().is_some_and(|e| !e.is_empty()) {
            return Some(task.clone());
        }

        let corpus: String = results
            .local
            .iter()
            .chain(results.global.iter())
            .chain(results.exploration.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        let mut entities = crate::retrievers::extract_entities(&corpus);
        entities.truncate(self.config.chain_exploration.seed_entity_limit);

        if entities.is_empty() {
            trace.record(
                "task_skipped",
                "chain_exploration task skipped: no entities could be derived",
            );
            metrics.tasks_skipped += 1;
            return None;
        }

        let mut resolved = task.clone();
        resolved.entities = Some(entities);
        Some(resolved)
    }

    fn record_evidence(&self, evidence: &mut EvidenceTracker, query_id: Uuid, result: &RetrievalResult) {
        match result {
            RetrievalResult::Text(text) => {
                evidence.record_step(
                    query_id,
                    EvidenceEntry {
                        snippet: Some(text.clone()),
                        ..Default::default()
                    },
                );
            }
            RetrievalResult::Summaries(summaries) => {
                for summary in summaries {
                    evidence.record_step(
                        query_id,
                        EvidenceEntry {
                            snippet: Some(summary.clone()),
                            ..Default::default()
                        },
                    );
                }
            }
            RetrievalResult::ChainExploration { content, .. } => {
                for snippet in content {
                    evidence.record_step(
                        query_id,
                        EvidenceEntry {
                            evidence_ids: snippet.evidence_id.clone().into_iter().collect(),
                            snippet: Some(snippet.text.clone()),
                            ..Default::default()
                        },
                    );
                }
            }
        }
    }
}

async fn emit(progress: &Option<mpsc::Sender<ProgressEvent>>, stage: &str, progress_frac: f64, message: &str) {
    if let Some(tx) = progress {
        let _ = tx
            .send(ProgressEvent::Stage {
                stage: stage.to_string(),
                progress: progress_frac,
                message: message.to_string(),
            })
            .await;
    }
}

fn summarize_result(task: &Task, result: &RetrievalResult) -> String {
    match result {
        RetrievalResult::Text(text) => format!("{} task result: {}", task.kind, truncate(text, 200)),
        RetrievalResult::Summaries(summaries) => {
            format!("{} task produced {} partial summaries", task.kind, summaries.len())
        }
        RetrievalResult::ChainExploration { exploration_path, content } => format!(
            "{} task walked {} hops, gathered {} snippets",
            task.kind,
            exploration_path.len(),
            content.len()
        ),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheManager;
    use crate::config::CacheConfig;
    use crate::external::fake::{FakeEmbeddingClient, FakeGraphStore, FakeLlmClient};

    fn coordinator(llm_responses: Vec<&str>) -> AgentCoordinator {
        let config = Config::default();
        let cache = Arc::new(CacheManager::in_memory(&CacheConfig::default()));
        let llm = Arc::new(FakeLlmClient::with_script(
            llm_responses.into_iter().map(str::to_string).collect(),
        ));
        let embedder = Arc::new(FakeEmbeddingClient::default());
        let graph = Arc::new(FakeGraphStore::new());
        AgentCoordinator::new(config, cache, llm, embedder, graph)
    }

    #[tokio::test]
    async fn simple_question_is_answered_and_cached() {
        let coordinator = coordinator(vec![
            r#"{"complexity":0.1,"tasks":[{"type":"local_search","query":"q","priority":3}]}"#,
            "the final answer",
        ]);
        let outcome = coordinator.process_query("what is rust?", None).await.unwrap();
        assert_eq!(outcome.answer, "the final answer");
        assert!(!outcome.metrics.served_from_cache);

        let second = coordinator.process_query("what is rust?", None).await.unwrap();
        assert_eq!(second.answer, "the final answer");
        assert!(second.metrics.served_from_cache);
    }

    #[tokio::test]
    async fn high_complexity_plan_enables_thinking() {
        let long_question = "who, what, when, where is the more complex, most complex thing that requires very long explanation spanning many many words to exceed the length threshold for complexity scoring in this heuristic evaluation pass entirely and fully".to_string();
        let coordinator = coordinator(vec![
            &format!(r#"{{"complexity":0.9,"tasks":[{{"type":"local_search","query":"{long_question}","priority":3}}]}}"#),
            "initial thinking text",
            "final thinking text",
            "the answer",
        ]);
        let outcome = coordinator.process_query(&long_question, None).await.unwrap();
        assert!(outcome.thinking.is_some());
        assert_eq!(outcome.answer, "the answer");
    }

    #[tokio::test]
    async fn cancellation_before_dispatch_returns_cancelled_error() {
        let coordinator = coordinator(vec![
            r#"{"complexity":0.1,"tasks":[{"type":"local_search","query":"q","priority":3}]}"#,
        ]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::channel(8);
        let err = coordinator
            .process_query_stream("q", None, tx, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn chain_exploration_without_entities_is_skipped_when_none_extractable() {
        let coordinator = coordinator(vec![
            r#"{"complexity":0.1,"tasks":[{"type":"chain_exploration","query":"vague","priority":3}]}"#,
            "the answer",
        ]);
        let outcome = coordinator.process_query("vague", None).await.unwrap();
        assert_eq!(outcome.metrics.tasks_skipped, 1);
        assert_eq!(outcome.answer, "the answer");
    }
}
