//! Heuristic entity extraction used to seed chain-exploration tasks that
//! were planned without an explicit entity list.

use std::collections::HashSet;

use regex::Regex;

use crate::constants::{ENTITY_MAX_LEN, ENTITY_MIN_LEN};

/// Extracts candidate entities from retriever text: quoted phrases,
/// bracketed phrases, capitalized bigrams/trigrams, and explicit
/// `entity:`/`实体:` tags. Deduplicated and filtered to length
/// `[ENTITY_MIN_LEN, ENTITY_MAX_LEN]`.
#[must_use]
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut entities = Vec::new();

    let mut push = |candidate: &str| {
        let trimmed = candidate.trim();
        let len = trimmed.chars().count();
        if len < ENTITY_MIN_LEN || len > ENTITY_MAX_LEN {
            return;
        }
        if seen.insert(trimmed.to_string()) {
            entities.push(trimmed.to_string());
        }
    };

    for pattern in [r#""([^"]+)""#, r"'([^']+)'"] {
        if let Ok(re) = Regex::new(pattern) {
            for cap in re.captures_iter(text) {
                push(&cap[1]);
            }
        }
    }

    if let Ok(re) = Regex::new(r"\[([^\]]+)\]") {
        for cap in re.captures_iter(text) {
            push(&cap[1]);
        }
    }

    if let Ok(re) = Regex::new(r"(?:entity|实体)\s*[:：]\s*([^\s,，。.;；]+)") {
        for cap in re.captures_iter(text) {
            push(&cap[1]);
        }
    }

    if let Ok(re) = Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,2})\b") {
        for cap in re.captures_iter(text) {
            push(&cap[1]);
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_chinese_entity_tag_and_bracketed_phrase() {
        let text = "实体: Alpha\n[Bravo] was also mentioned";
        let entities = extract_entities(text);
        assert!(entities.contains(&"Alpha".to_string()));
        assert!(entities.contains(&"Bravo".to_string()));
    }

    #[test]
    fn extracts_quoted_phrase() {
        let entities = extract_entities(r#"the document mentions "Project Orion" explicitly"#);
        assert!(entities.contains(&"Project Orion".to_string()));
    }

    #[test]
    fn extracts_capitalized_bigram() {
        let entities = extract_entities("A meeting with John Smith took place yesterday.");
        assert!(entities.contains(&"John Smith".to_string()));
    }

    #[test]
    fn filters_out_of_range_lengths() {
        let entities = extract_entities("entity:a entity:this-is-a-very-long-identifier-that-exceeds-thirty-characters");
        assert!(entities.is_empty());
    }

    #[test]
    fn deduplicates_repeated_mentions() {
        let entities = extract_entities(r#""Orion" appears twice: "Orion" again"#);
        assert_eq!(entities.iter().filter(|e| *e == "Orion").count(), 1);
    }
}
