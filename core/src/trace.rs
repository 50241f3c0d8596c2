//! The execution trace: an append-only, externally observable log of
//! coordinator-stage events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Short, stable event name, e.g. `"task_started"`.
    pub event_type: String,
    /// Human-readable description.
    pub description: String,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Optional structured payload.
    pub data: Option<Value>,
}

/// Append-only sequence of [`TraceEvent`]s for one request.
///
/// Events are recorded in strictly monotonic timestamp order because each
/// call to [`ExecutionTrace::record`] stamps the event itself; callers never
/// supply their own timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    /// An empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new event, stamped with the current time.
    pub fn record(&mut self, event_type: impl Into<String>, description: impl Into<String>) {
        self.record_with_data(event_type, description, None);
    }

    /// Appends a new event carrying a structured payload.
    pub fn record_with_data(
        &mut self,
        event_type: impl Into<String>,
        description: impl Into<String>,
        data: Option<Value>,
    ) {
        let mut timestamp = Utc::now();
        if let Some(last) = self.events.last() {
            if timestamp <= last.timestamp {
                // Clock resolution can be coarser than call rate; nudge
                // forward by the smallest representable step so ordering
                // stays strictly monotonic.
                timestamp = last.timestamp + chrono::Duration::nanoseconds(1);
            }
        }
        self.events.push(TraceEvent {
            event_type: event_type.into(),
            description: description.into(),
            timestamp,
            data,
        });
    }

    /// All recorded events, in order.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Renders the trace as line-delimited JSON, one event per line.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if an event's `data` cannot round-trip
    /// through JSON, which should not happen for well-formed payloads.
    pub fn to_ndjson(&self) -> crate::error::Result<String> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event).map_err(crate::error::Error::Serialization)?);
            out.push('\n');
        }
        Ok(out)
    }
}
