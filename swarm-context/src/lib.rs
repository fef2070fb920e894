//! # swarm-context — checksum-verified context preservation (spec §4.3)
//!
//! Same `RwLock<HashMap<...>>` store shape as [`swarm_team`], keyed by
//! handoff id instead of team id, and checksummed with sha2 so a mismatch
//! between preserve time and restore time is detectable rather than silently
//! corrupting a handoff.

#![deny(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use swarm_bus::EventBus;
use swarm_proto::{ContextError, ContextStatistics, DurationMs, Event, PreservedContext};
use tokio::sync::RwLock;

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Stores serialized handoff context, verified by checksum on restore.
pub struct ContextPreservationStore {
    entries: RwLock<HashMap<String, PreservedContext>>,
    bus: Option<Arc<EventBus>>,
}

impl ContextPreservationStore {
    /// Create a store with no attached bus.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            bus: None,
        }
    }

    /// Create a store that publishes `context.preserved`/`context.restored`/
    /// `context.rollback` events onto `bus`.
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            bus: Some(bus),
        }
    }

    async fn emit(&self, event_type: &'static str, payload: serde_json::Value, now_ms: u64) {
        if let Some(bus) = &self.bus {
            bus.publish(Event::new(
                format!("{event_type}-{now_ms}"),
                event_type,
                DurationMs::from_millis(now_ms),
                "context_preservation_store",
                payload,
            ))
            .await;
        }
    }

    /// Serialize and store `context` under `handoff_id`, overwriting any
    /// prior entry for the same id. Emits `context.preserved`.
    pub async fn preserve_context(
        &self,
        handoff_id: impl Into<String>,
        context: &serde_json::Value,
        now_ms: u64,
    ) -> Result<PreservedContext, ContextError> {
        let handoff_id = handoff_id.into();
        let serialized =
            serde_json::to_string(context).map_err(|e| ContextError::Serialization(e.to_string()))?;
        let size_bytes = serialized.len();
        let checksum = checksum(serialized.as_bytes());

        let entry = PreservedContext {
            handoff_id: handoff_id.clone(),
            serialized,
            checksum: checksum.clone(),
            size_bytes,
            created_at_ms: now_ms,
        };
        self.entries
            .write()
            .await
            .insert(handoff_id.clone(), entry.clone());

        self.emit(
            "context.preserved",
            serde_json::json!({
                "handoff_id": handoff_id,
                "size_bytes": size_bytes,
                "checksum": checksum,
            }),
            now_ms,
        )
        .await;
        Ok(entry)
    }

    /// Fetch and verify the preserved context for `handoff_id`, returning
    /// the deserialized value. Fails with `NotFound` if absent, `Integrity`
    /// if the recomputed checksum does not match; either failure emits
    /// `context.restoration.failed` before returning.
    pub async fn restore_context(
        &self,
        handoff_id: &str,
        now_ms: u64,
    ) -> Result<serde_json::Value, ContextError> {
        let entry = {
            let entries = self.entries.read().await;
            match entries.get(handoff_id).cloned() {
                Some(entry) => entry,
                None => {
                    self.emit(
                        "context.restoration.failed",
                        serde_json::json!({ "handoff_id": handoff_id, "reason": "not_found" }),
                        now_ms,
                    )
                    .await;
                    return Err(ContextError::NotFound(handoff_id.to_string()));
                }
            }
        };

        let recomputed = checksum(entry.serialized.as_bytes());
        if recomputed != entry.checksum {
            self.emit(
                "context.restoration.failed",
                serde_json::json!({
                    "handoff_id": handoff_id,
                    "reason": "integrity",
                    "expected": entry.checksum,
                    "actual": recomputed,
                }),
                now_ms,
            )
            .await;
            return Err(ContextError::Integrity {
                handoff_id: handoff_id.to_string(),
                expected: entry.checksum,
                actual: recomputed,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&entry.serialized)
            .map_err(|e| ContextError::Serialization(e.to_string()))?;

        self.emit(
            "context.restored",
            serde_json::json!({ "handoff_id": handoff_id }),
            now_ms,
        )
        .await;
        Ok(value)
    }

    /// Evict the entry for `handoff_id`, if any. Idempotent: emits
    /// `context.rollback` even when no entry existed.
    pub async fn rollback_context(&self, handoff_id: &str, now_ms: u64) -> Result<(), ContextError> {
        self.entries.write().await.remove(handoff_id);
        self.emit(
            "context.rollback",
            serde_json::json!({ "handoff_id": handoff_id }),
            now_ms,
        )
        .await;
        Ok(())
    }

    /// Aggregate statistics over the currently preserved contexts.
    pub async fn get_statistics(&self, now_ms: u64) -> ContextStatistics {
        let entries = self.entries.read().await;
        if entries.is_empty() {
            return ContextStatistics::default();
        }
        let total_size_bytes = entries.values().map(|e| e.size_bytes).sum();
        let oldest = entries.values().map(|e| e.created_at_ms).min().unwrap();
        let newest = entries.values().map(|e| e.created_at_ms).max().unwrap();
        ContextStatistics {
            preserved_count: entries.len(),
            total_size_bytes,
            oldest_context_age_ms: Some(now_ms.saturating_sub(oldest)),
            newest_context_age_ms: Some(now_ms.saturating_sub(newest)),
        }
    }
}

impl Default for ContextPreservationStore {
    fn default() -> Self {
        Self::new()
    }
}
