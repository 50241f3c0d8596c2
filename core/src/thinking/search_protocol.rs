//! Parsing the iterative search protocol out of an LLM response: extracting
//! `BEGIN_SEARCH_QUERY`/`END_SEARCH_QUERY`-delimited queries and detecting
//! the final-answer marker.

use crate::constants::{FINAL_ANSWER_MARKER, SEARCH_QUERY_BEGIN, SEARCH_QUERY_END};

/// Classification of an LLM response under the iterative search protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchQueryStatus {
    /// One or more search queries were extracted.
    HasQuery,
    /// The response had content but no extractable query.
    NoQuery,
    /// The response declared the final answer is ready.
    AnswerReady,
    /// The response was empty or whitespace-only.
    Empty,
    /// The underlying LLM call failed; `content` carries the error message.
    Error,
}

/// Result of [`parse_search_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQueryOutcome {
    pub status: SearchQueryStatus,
    pub content: String,
    pub queries: Vec<String>,
}

impl SearchQueryOutcome {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SearchQueryStatus::Error,
            content: message.into(),
            queries: Vec::new(),
        }
    }
}

/// Parses a raw LLM response under the iterative search protocol.
#[must_use]
pub fn parse_search_response(response: &str) -> SearchQueryOutcome {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return SearchQueryOutcome {
            status: SearchQueryStatus::Empty,
            content: String::new(),
            queries: Vec::new(),
        };
    }
    if trimmed.contains(FINAL_ANSWER_MARKER) {
        return SearchQueryOutcome {
            status: SearchQueryStatus::AnswerReady,
            content: trimmed.to_string(),
            queries: Vec::new(),
        };
    }
    let queries = extract_queries(trimmed);
    let status = if queries.is_empty() {
        SearchQueryStatus::NoQuery
    } else {
        SearchQueryStatus::HasQuery
    };
    SearchQueryOutcome {
        status,
        content: trimmed.to_string(),
        queries,
    }
}

fn extract_queries(text: &str) -> Vec<String> {
    let mut queries = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(SEARCH_QUERY_BEGIN) {
        let after_begin = &rest[start + SEARCH_QUERY_BEGIN.len()..];
        let Some(end) = after_begin.find(SEARCH_QUERY_END) else {
            break;
        };
        let query = after_begin[..end].trim();
        if !query.is_empty() {
            queries.push(query.to_string());
        }
        rest = &after_begin[end + SEARCH_QUERY_END.len()..];
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_is_empty_status() {
        assert_eq!(parse_search_response("   ").status, SearchQueryStatus::Empty);
    }

    #[test]
    fn final_answer_marker_short_circuits_to_answer_ready() {
        let response = "**Final Answer**\nThe capital is Paris.";
        assert_eq!(parse_search_response(response).status, SearchQueryStatus::AnswerReady);
    }

    #[test]
    fn extracts_single_query() {
        let response = "I should search: BEGIN_SEARCH_QUERY when was it founded END_SEARCH_QUERY";
        let outcome = parse_search_response(response);
        assert_eq!(outcome.status, SearchQueryStatus::HasQuery);
        assert_eq!(outcome.queries, vec!["when was it founded"]);
    }

    #[test]
    fn extracts_multiple_queries_in_order() {
        let response = "BEGIN_SEARCH_QUERY first END_SEARCH_QUERY and also \
                         BEGIN_SEARCH_QUERY second END_SEARCH_QUERY";
        let outcome = parse_search_response(response);
        assert_eq!(outcome.queries, vec!["first", "second"]);
    }

    #[test]
    fn content_without_markers_is_no_query() {
        let outcome = parse_search_response("I am still thinking about this.");
        assert_eq!(outcome.status, SearchQueryStatus::NoQuery);
    }
}
