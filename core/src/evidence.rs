//! Tracks evidence identifiers attached to reasoning steps and detects
//! contradictions across them.

use std::collections::HashMap;
use std::time::Instant;

use regex::Regex;
use uuid::Uuid;

use crate::error::Result;
use crate::external::llm::{LlmClient, Message};

/// One reasoning step's evidence: the ids a retriever returned, and
/// optionally the entity and source snippet they came from (needed for
/// contradiction detection).
#[derive(Debug, Clone, Default)]
pub struct EvidenceEntry {
    /// Chunk/entity/community identifiers returned by the retriever.
    pub evidence_ids: Vec<String>,
    /// Entity this evidence is about, if known.
    pub entity: Option<String>,
    /// Source text the evidence was drawn from, if known.
    pub snippet: Option<String>,
}

/// A detected contradiction between two pieces of evidence.
#[derive(Debug, Clone, PartialEq)]
pub enum Contradiction {
    /// Two numeric values attributed to the same entity differ by more
    /// than the configured threshold.
    Numerical {
        entity: String,
        value_a: f64,
        value_b: f64,
        difference: f64,
    },
    /// An LLM judged two snippets to assert incompatible claims.
    Semantic {
        snippet_a: String,
        snippet_b: String,
        explanation: String,
    },
}

/// Summary statistics for one query's evidence trail.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceSummary {
    pub steps_count: usize,
    pub evidence_count: usize,
    pub duration_seconds: f64,
    /// Heuristic confidence in `[0, 1]`: more evidence over more steps,
    /// saturating as either grows.
    pub confidence: f64,
}

struct QueryRecord {
    steps: Vec<EvidenceEntry>,
    started_at: Instant,
}

/// Per-query evidence trail, owned by the coordinator for the lifetime of
/// one request.
#[derive(Default)]
pub struct EvidenceTracker {
    queries: HashMap<Uuid, QueryRecord>,
}

impl EvidenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a query, resetting any prior state for that id.
    pub fn start(&mut self, query_id: Uuid) {
        self.queries.insert(
            query_id,
            QueryRecord {
                steps: Vec::new(),
                started_at: Instant::now(),
            },
        );
    }

    /// Records one reasoning step's evidence.
    pub fn record_step(&mut self, query_id: Uuid, entry: EvidenceEntry) {
        self.queries
            .entry(query_id)
            .or_insert_with(|| QueryRecord {
                steps: Vec::new(),
                started_at: Instant::now(),
            })
            .steps
            .push(entry);
    }

    /// Summarizes the evidence trail for `query_id`; `None` if untracked.
    #[must_use]
    pub fn get_summary(&self, query_id: Uuid) -> Option<EvidenceSummary> {
        let record = self.queries.get(&query_id)?;
        let steps_count = record.steps.len();
        let evidence_count: usize = record.steps.iter().map(|s| s.evidence_ids.len()).sum();
        let duration_seconds = record.started_at.elapsed().as_secs_f64();
        let confidence = saturating_confidence(steps_count, evidence_count);
        Some(EvidenceSummary {
            steps_count,
            evidence_count,
            duration_seconds,
            confidence,
        })
    }

    /// Detects numerical and (LLM-mediated) semantic contradictions across
    /// all evidence recorded for `query_id`.
    ///
    /// # Errors
    ///
    /// Returns an `LLMFailure` only if the semantic pass's `llm` call fails;
    /// numerical detection never fails.
    pub async fn detect_contradictions(
        &self,
        query_id: Uuid,
        llm: &dyn LlmClient,
        numerical_threshold: f64,
    ) -> Result<Vec<Contradiction>> {
        let Some(record) = self.queries.get(&query_id) else {
            return Ok(Vec::new());
        };

        let mut by_entity: HashMap<&str, Vec<&EvidenceEntry>> = HashMap::new();
        for step in &record.steps {
            if let Some(entity) = step.entity.as_deref() {
                by_entity.entry(entity).or_default().push(step);
            }
        }

        let mut contradictions = Vec::new();

        for (entity, entries) in &by_entity {
            let values: Vec<f64> = entries
                .iter()
                .filter_map(|e| e.snippet.as_deref())
                .filter_map(first_number)
                .collect();
            for i in 0..values.len() {
                for j in (i + 1)..values.len() {
                    let difference = (values[i] - values[j]).abs();
                    if difference > numerical_threshold {
                        contradictions.push(Contradiction::Numerical {
                            entity: (*entity).to_string(),
                            value_a: values[i],
                            value_b: values[j],
                            difference,
                        });
                    }
                }
            }
        }

        let snippets: Vec<&str> = record
            .steps
            .iter()
            .filter_map(|e| e.snippet.as_deref())
            .collect();
        for i in 0..snippets.len() {
            for j in (i + 1)..snippets.len() {
                if let Some(explanation) =
                    judge_semantic_contradiction(llm, snippets[i], snippets[j]).await?
                {
                    contradictions.push(Contradiction::Semantic {
                        snippet_a: snippets[i].to_string(),
                        snippet_b: snippets[j].to_string(),
                        explanation,
                    });
                }
            }
        }

        Ok(contradictions)
    }
}

fn saturating_confidence(steps_count: usize, evidence_count: usize) -> f64 {
    let step_term = (steps_count as f64 / 5.0).min(1.0);
    let evidence_term = (evidence_count as f64 / 10.0).min(1.0);
    ((step_term + evidence_term) / 2.0).clamp(0.0, 1.0)
}

fn first_number(text: &str) -> Option<f64> {
    let re = Regex::new(r"-?\d+(?:\.\d+)?").ok()?;
    re.find(text)?.as_str().parse().ok()
}

async fn judge_semantic_contradiction(
    llm: &dyn LlmClient,
    snippet_a: &str,
    snippet_b: &str,
) -> Result<Option<String>> {
    let prompt = format!(
        "Do these two statements contradict each other? Answer with either \
         \"no\" or \"yes: <short explanation>\".\n\nA: {snippet_a}\nB: {snippet_b}"
    );
    let response = llm.invoke(&[Message::user(prompt)]).await?;
    let trimmed = response.trim();
    if let Some(explanation) = trimmed.strip_prefix("yes:") {
        Ok(Some(explanation.trim().to_string()))
    } else if trimmed.eq_ignore_ascii_case("yes") {
        Ok(Some("LLM judged these claims incompatible".to_string()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fake::FakeLlmClient;

    #[test]
    fn summary_counts_steps_and_evidence() {
        let mut tracker = EvidenceTracker::new();
        let query_id = Uuid::new_v4();
        tracker.start(query_id);
        tracker.record_step(
            query_id,
            EvidenceEntry {
                evidence_ids: vec!["chunk-1".to_string(), "chunk-2".to_string()],
                ..Default::default()
            },
        );
        tracker.record_step(
            query_id,
            EvidenceEntry {
                evidence_ids: vec!["chunk-3".to_string()],
                ..Default::default()
            },
        );
        let summary = tracker.get_summary(query_id).unwrap();
        assert_eq!(summary.steps_count, 2);
        assert_eq!(summary.evidence_count, 3);
    }

    #[test]
    fn untracked_query_has_no_summary() {
        let tracker = EvidenceTracker::new();
        assert!(tracker.get_summary(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn detects_numerical_contradiction_over_threshold() {
        let mut tracker = EvidenceTracker::new();
        let query_id = Uuid::new_v4();
        tracker.start(query_id);
        tracker.record_step(
            query_id,
            EvidenceEntry {
                entity: Some("population".to_string()),
                snippet: Some("The population is 1200000.".to_string()),
                ..Default::default()
            },
        );
        tracker.record_step(
            query_id,
            EvidenceEntry {
                entity: Some("population".to_string()),
                snippet: Some("The population is 900000.".to_string()),
                ..Default::default()
            },
        );
        let llm = FakeLlmClient::new("no");
        let contradictions = tracker
            .detect_contradictions(query_id, &llm, 1000.0)
            .await
            .unwrap();
        assert!(contradictions
            .iter()
            .any(|c| matches!(c, Contradiction::Numerical { entity, .. } if entity == "population")));
    }

    #[tokio::test]
    async fn no_contradiction_reported_when_values_agree() {
        let mut tracker = EvidenceTracker::new();
        let query_id = Uuid::new_v4();
        tracker.start(query_id);
        tracker.record_step(
            query_id,
            EvidenceEntry {
                entity: Some("area".to_string()),
                snippet: Some("The area is 100 km2.".to_string()),
                ..Default::default()
            },
        );
        tracker.record_step(
            query_id,
            EvidenceEntry {
                entity: Some("area".to_string()),
                snippet: Some("The area is 101 km2.".to_string()),
                ..Default::default()
            },
        );
        let llm = FakeLlmClient::new("no");
        let contradictions = tracker
            .detect_contradictions(query_id, &llm, 50.0)
            .await
            .unwrap();
        assert!(contradictions.is_empty());
    }

    #[tokio::test]
    async fn semantic_contradiction_surfaces_llm_explanation() {
        let mut tracker = EvidenceTracker::new();
        let query_id = Uuid::new_v4();
        tracker.start(query_id);
        tracker.record_step(
            query_id,
            EvidenceEntry {
                snippet: Some("The treaty was signed in 1990.".to_string()),
                ..Default::default()
            },
        );
        tracker.record_step(
            query_id,
            EvidenceEntry {
                snippet: Some("The treaty was never signed.".to_string()),
                ..Default::default()
            },
        );
        let llm = FakeLlmClient::new("yes: one claims signature, the other denies it");
        let contradictions = tracker
            .detect_contradictions(query_id, &llm, 1.0)
            .await
            .unwrap();
        assert_eq!(contradictions.len(), 1);
        assert!(matches!(&contradictions[0], Contradiction::Semantic { .. }));
    }
}
