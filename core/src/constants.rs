//! Fixed constants that are not user-configurable.
//!
//! Values the configuration table exposes (cache capacity, timeouts that vary
//! by deployment, worker pool size, …) live in [`crate::config::Config`]
//! instead. This module holds the handful of literals the specification
//! fixes outright: markers, truncation bounds, and the one timeout absent
//! from the configuration table.

use std::time::Duration;

/// Name of the reasoning branch every thinking engine run starts with.
pub const MAIN_BRANCH: &str = "main";

/// Per-LLM-call timeout. Not in the configuration table; fixed per the
/// concurrency model.
pub const LLM_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Grace period given to an in-flight retriever to cooperate with
/// cancellation before its result is discarded.
pub const CANCELLATION_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Marker wrapping the full, uncleaned reasoning trace.
pub const THINK_OPEN_TAG: &str = "<think>";
/// Closing counterpart of [`THINK_OPEN_TAG`].
pub const THINK_CLOSE_TAG: &str = "</think>";
/// Trailing section stripped from a synthesized answer before caching.
pub const CITATIONS_SECTION_HEADER: &str = "#### Citations";

/// Opening delimiter for a search query emitted by the thinking engine.
pub const SEARCH_QUERY_BEGIN: &str = "BEGIN_SEARCH_QUERY";
/// Closing delimiter for a search query emitted by the thinking engine.
pub const SEARCH_QUERY_END: &str = "END_SEARCH_QUERY";
/// Marker indicating the thinking engine considers the answer ready.
pub const FINAL_ANSWER_MARKER: &str = "**Final Answer**";

/// Minimum accepted length, in characters, for an entity extracted from
/// retriever text.
pub const ENTITY_MIN_LEN: usize = 2;
/// Maximum accepted length, in characters, for an extracted entity.
pub const ENTITY_MAX_LEN: usize = 30;

/// Number of trailing reasoning steps `prepare_truncated_reasoning` always
/// retains (in addition to the first step).
pub const TRUNCATED_REASONING_TAIL: usize = 4;
/// Trace length above which `prepare_truncated_reasoning` starts truncating.
pub const TRUNCATED_REASONING_THRESHOLD: usize = 5;

/// Text rendered by the synthesizer for an empty retrieval bucket.
pub const NO_RELEVANT_RESULT: &str = "no relevant result";
/// Maximum chain-exploration path steps rendered in a synthesis prompt.
pub const CHAIN_EXPLORATION_PATH_PREVIEW: usize = 5;
/// Maximum chain-exploration content snippets rendered in a synthesis prompt.
pub const CHAIN_EXPLORATION_CONTENT_PREVIEW: usize = 3;
/// Character length each previewed chain-exploration snippet is truncated to.
pub const CHAIN_EXPLORATION_SNIPPET_CHARS: usize = 200;
