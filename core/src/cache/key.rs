//! Cache key strategies: deterministic fingerprinting of a cache request.

use std::hash::{Hash, Hasher};

use unicode_normalization::UnicodeNormalization;

/// Opaque, deterministic identifier for a cacheable request.
///
/// Two requests that fingerprint to the same value are treated as
/// interchangeable for caching purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Wraps a raw hash value as a fingerprint.
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw `u64` backing this fingerprint.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Hex-rendered form used in error messages and disk paths.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Inputs a key strategy may draw on to compute a [`Fingerprint`].
#[derive(Debug, Clone, Default)]
pub struct CacheRequest {
    /// The user's question.
    pub question: String,
    /// Conversation identifier; absent for strategies that ignore context.
    pub thread_id: Option<String>,
    /// Low-level keyword hints, e.g. entity names.
    pub low_level_keywords: Vec<String>,
    /// High-level keyword hints, e.g. topic labels.
    pub high_level_keywords: Vec<String>,
}

impl CacheRequest {
    /// Builds a request carrying only a question.
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Attaches a thread id to the request.
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Attaches keyword lists to the request.
    #[must_use]
    pub fn with_keywords(mut self, low_level: Vec<String>, high_level: Vec<String>) -> Self {
        self.low_level_keywords = low_level;
        self.high_level_keywords = high_level;
        self
    }
}

/// Normalizes text per the cache-key specification: Unicode NFKC, trimmed,
/// whitespace-collapsed, ASCII-only lower-casing (non-ASCII is preserved).
#[must_use]
pub fn normalize(text: &str) -> String {
    let nfkc: String = text.nfkc().collect();
    let collapsed = nfkc.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Produces a [`Fingerprint`] from a [`CacheRequest`].
pub trait KeyStrategy: Send + Sync {
    /// Computes the fingerprint for this request under this strategy.
    fn fingerprint(&self, request: &CacheRequest) -> Fingerprint;
}

fn hash_parts(parts: &[&str]) -> Fingerprint {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
        0u8.hash(&mut hasher); // separator, prevents "ab"+"c" == "a"+"bc" collisions
    }
    Fingerprint::new(hasher.finish())
}

/// `hash(normalize(question))`.
#[derive(Debug, Default)]
pub struct SimpleKeyStrategy;

impl KeyStrategy for SimpleKeyStrategy {
    fn fingerprint(&self, request: &CacheRequest) -> Fingerprint {
        hash_parts(&[&normalize(&request.question)])
    }
}

/// `hash(thread_id ++ normalize(question))`.
#[derive(Debug, Default)]
pub struct ContextAwareKeyStrategy;

impl KeyStrategy for ContextAwareKeyStrategy {
    fn fingerprint(&self, request: &CacheRequest) -> Fingerprint {
        let thread_id = request.thread_id.as_deref().unwrap_or_default();
        hash_parts(&[thread_id, &normalize(&request.question)])
    }
}

/// `hash(thread_id ++ normalize(question) ++ join(sorted(keywords)))`.
#[derive(Debug, Default)]
pub struct ContextKeywordAwareKeyStrategy;

impl KeyStrategy for ContextKeywordAwareKeyStrategy {
    fn fingerprint(&self, request: &CacheRequest) -> Fingerprint {
        let thread_id = request.thread_id.as_deref().unwrap_or_default();
        let mut low = request.low_level_keywords.clone();
        let mut high = request.high_level_keywords.clone();
        low.sort();
        high.sort();
        let joined = format!("{}|{}", low.join(","), high.join(","));
        hash_parts(&[thread_id, &normalize(&request.question), &joined])
    }
}

/// Builds the configured [`KeyStrategy`] implementation.
#[must_use]
pub fn strategy_for(kind: crate::config::KeyStrategyKind) -> Box<dyn KeyStrategy> {
    use crate::config::KeyStrategyKind;
    match kind {
        KeyStrategyKind::Simple => Box::new(SimpleKeyStrategy),
        KeyStrategyKind::ContextAware => Box::new(ContextAwareKeyStrategy),
        KeyStrategyKind::ContextKeywordAware => Box::new(ContextKeywordAwareKeyStrategy),
    }
}
