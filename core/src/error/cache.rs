//! Error types for cache backend and key-strategy operations.

use std::fmt;

/// Errors that can occur inside a cache backend.
///
/// These never propagate as fatal: per the coordinator's error-handling
/// design, a `CacheFailure` is logged and the caller proceeds as though the
/// operation missed.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Cache entry exceeds the configured quota or size limit.
    EntryTooLarge {
        /// Hex-rendered fingerprint of the offending entry.
        fingerprint: String,
        /// The actual size of the entry, in bytes.
        size: usize,
        /// The maximum allowed size, in bytes.
        max_size: usize,
    },
    /// Writing the entry to the disk backend failed.
    WriteFailed {
        /// Hex-rendered fingerprint of the entry being written.
        fingerprint: String,
        /// The underlying I/O error message.
        error: String,
    },
    /// Reading or deserializing an on-disk entry failed.
    ReadFailed {
        /// Hex-rendered fingerprint of the entry being read.
        fingerprint: String,
        /// The underlying error message.
        error: String,
    },
    /// An eviction pass could not free the requested space.
    EvictionFailed {
        /// Human-readable reason the eviction pass failed.
        reason: String,
    },
    /// A cache configuration value is invalid (e.g. zero capacity).
    InvalidConfiguration {
        /// The configuration field that is invalid.
        field: String,
        /// The invalid value, rendered as a string.
        value: String,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryTooLarge {
                fingerprint,
                size,
                max_size,
            } => write!(
                f,
                "cache entry too large: fp={fingerprint}, size={size}, max_size={max_size}"
            ),
            Self::WriteFailed { fingerprint, error } => {
                write!(f, "cache write failed for fp={fingerprint}: {error}")
            }
            Self::ReadFailed { fingerprint, error } => {
                write!(f, "cache read failed for fp={fingerprint}: {error}")
            }
            Self::EvictionFailed { reason } => write!(f, "cache eviction failed: {reason}"),
            Self::InvalidConfiguration { field, value } => write!(
                f,
                "invalid cache configuration: field='{field}', value='{value}'"
            ),
        }
    }
}

impl std::error::Error for CacheError {}
