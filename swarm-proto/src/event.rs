//! The `Event` type — the unit of currency on the event bus.

use crate::duration::DurationMs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An immutable, published event. Carries a hierarchical dotted `type`
/// (e.g. `tool.execution.completed`) that subscribers match either exactly
/// or via the universal wildcard.
///
/// `payload` and `metadata` are opaque structured values — the bus and its
/// subscribers agree on shape out of band, the envelope itself doesn't
/// interpret them.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event instance.
    pub id: String,
    /// Hierarchical dotted type label, e.g. `tool.execution.completed`.
    pub event_type: String,
    /// Monotonically-non-decreasing timestamp in milliseconds.
    pub timestamp: DurationMs,
    /// The component or agent that published this event.
    pub source: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// Optional out-of-band metadata (trace ids, correlation ids, ...).
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Event {
    /// Construct a new event with no metadata.
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: DurationMs,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            timestamp,
            source: source.into(),
            payload,
            metadata: None,
        }
    }

    /// Attach metadata, replacing any existing metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether this event's type matches a subscription pattern.
    /// Pattern `"*"` matches every event; any other pattern must match
    /// `event_type` exactly.
    pub fn matches(&self, pattern: &str) -> bool {
        pattern == "*" || pattern == self.event_type
    }
}

/// An event as it arrives at a cross-language boundary, before the payload
/// has been parsed out of its wire form.
///
/// Unlike [`Event`], `payload` here is still the raw serialized string
/// produced by the other side of the boundary — validating this shape
/// happens before any attempt to decode it.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossLanguageEvent {
    /// Unique identifier for this event instance.
    pub id: String,
    /// Event type label.
    pub event_type: String,
    /// Originating component, process, or language runtime.
    pub source: String,
    /// Timestamp in milliseconds, carried as a float since it crossed a
    /// boundary that may not have a native integer type.
    pub timestamp: f64,
    /// Serialized payload, not yet decoded.
    pub payload: String,
}
