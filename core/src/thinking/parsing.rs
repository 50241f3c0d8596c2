//! Parsing hypotheses out of LLM responses: JSON first, regex fallback.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A candidate explanation proposed by the thinking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub hypothesis: String,
    pub reasoning: String,
    pub status: HypothesisStatus,
}

/// Verification outcome of a [`Hypothesis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypothesisStatus {
    Pending,
    Supported,
    Rejected,
    Uncertain,
}

#[derive(Debug, Deserialize)]
struct RawHypothesis {
    hypothesis: String,
    #[serde(default)]
    reasoning: String,
}

/// Parses a JSON array of `{hypothesis, reasoning}` objects. Every parsed
/// hypothesis starts `Pending`.
pub fn parse_hypotheses_json(text: &str) -> Option<Vec<Hypothesis>> {
    let raw: Vec<RawHypothesis> = serde_json::from_str(text).ok()?;
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.into_iter()
            .map(|r| Hypothesis {
                hypothesis: r.hypothesis,
                reasoning: r.reasoning,
                status: HypothesisStatus::Pending,
            })
            .collect(),
    )
}

/// Fallback extractor for the pattern `Hypothesis N: ... Reason: ...`,
/// used when the LLM doesn't return valid JSON.
#[must_use]
pub fn extract_hypotheses_regex(text: &str) -> Vec<Hypothesis> {
    let Ok(re) = Regex::new(
        r"(?is)Hypothesis\s*\d+\s*:\s*(.+?)\s*Reason(?:ing)?\s*:\s*(.+?)(?=Hypothesis\s*\d+\s*:|\z)",
    ) else {
        return Vec::new();
    };
    re.captures_iter(text)
        .map(|c| Hypothesis {
            hypothesis: c[1].trim().to_string(),
            reasoning: c[2].trim().to_string(),
            status: HypothesisStatus::Pending,
        })
        .collect()
}

/// Parses hypotheses from an LLM response, trying JSON first and falling
/// back to the regex extractor, guaranteeing at least one hypothesis by
/// treating the whole response as a single hypothesis as a last resort.
#[must_use]
pub fn parse_hypotheses(text: &str, fallback_reasoning: &str) -> Vec<Hypothesis> {
    if let Some(parsed) = parse_hypotheses_json(text) {
        return parsed;
    }
    let regex_parsed = extract_hypotheses_regex(text);
    if !regex_parsed.is_empty() {
        return regex_parsed;
    }
    vec![Hypothesis {
        hypothesis: text.trim().to_string(),
        reasoning: fallback_reasoning.to_string(),
        status: HypothesisStatus::Pending,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_json_array() {
        let json = r#"[{"hypothesis": "A", "reasoning": "because"}]"#;
        let parsed = parse_hypotheses_json(json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].hypothesis, "A");
        assert_eq!(parsed[0].status, HypothesisStatus::Pending);
    }

    #[test]
    fn empty_json_array_is_treated_as_unparseable() {
        assert!(parse_hypotheses_json("[]").is_none());
    }

    #[test]
    fn regex_fallback_extracts_multiple_hypotheses() {
        let text = "Hypothesis 1: the sky is blue Reason: scattering \
                     Hypothesis 2: water is wet Reason: polarity";
        let parsed = extract_hypotheses_regex(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].hypothesis, "the sky is blue");
        assert_eq!(parsed[1].reasoning, "polarity");
    }

    #[test]
    fn parse_hypotheses_guarantees_at_least_one() {
        let parsed = parse_hypotheses("not json and no markers", "no structure found");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].reasoning, "no structure found");
    }
}
