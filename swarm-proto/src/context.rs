//! The `PreservedContext` type stored by `ContextPreservationStore`.

use serde::{Deserialize, Serialize};

/// A content-addressed snapshot of handoff context.
///
/// `checksum` is computed over `serialized` at preserve time and recomputed
/// at restore time; a mismatch means the stored bytes were mutated out of
/// band and the store refuses to deserialize them.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreservedContext {
    /// The handoff this context belongs to (unique within the store).
    pub handoff_id: String,
    /// Canonical UTF-8 serialized form of the original context value.
    pub serialized: String,
    /// Stable hash over `serialized`, hex-encoded.
    pub checksum: String,
    /// Size of `serialized` in bytes.
    pub size_bytes: usize,
    /// When this entry was created, milliseconds since the store's clock
    /// epoch (monotonic within a process).
    pub created_at_ms: u64,
}

/// Aggregate statistics over the currently preserved contexts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContextStatistics {
    /// Number of entries currently preserved.
    pub preserved_count: usize,
    /// Total serialized size across all entries, in bytes.
    pub total_size_bytes: usize,
    /// Age in milliseconds of the oldest preserved entry, if any.
    pub oldest_context_age_ms: Option<u64>,
    /// Age in milliseconds of the newest preserved entry, if any.
    pub newest_context_age_ms: Option<u64>,
}
