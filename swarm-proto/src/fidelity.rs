//! Fidelity categories and the per-category success/failure counter.

use serde::{Deserialize, Serialize};

/// A category of operation the fidelity tracker maintains a rolling success
/// rate for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FidelityCategory {
    /// Bus event processing (`event.processed` / `event.processing.failed`).
    EventProcessing,
    /// Agent tool execution (`tool.execution.completed` / `.failed`).
    AgentToolExecution,
    /// Cross-language/process communication (`cross.language.received` / `.failed`).
    CrossLanguageCommunication,
    /// Mode switching (`mode.changed` / `mode.change.failed`).
    ModeSwitching,
    /// Context preservation (`context.preserved` / `context.preservation.failed`).
    ContextPreservation,
}

impl FidelityCategory {
    /// All categories, in a stable order used for deterministic iteration.
    pub const ALL: [FidelityCategory; 5] = [
        FidelityCategory::EventProcessing,
        FidelityCategory::AgentToolExecution,
        FidelityCategory::CrossLanguageCommunication,
        FidelityCategory::ModeSwitching,
        FidelityCategory::ContextPreservation,
    ];

    /// Stable string key, used as a map key and in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            FidelityCategory::EventProcessing => "eventProcessing",
            FidelityCategory::AgentToolExecution => "agentToolExecution",
            FidelityCategory::CrossLanguageCommunication => "crossLanguageCommunication",
            FidelityCategory::ModeSwitching => "modeSwitching",
            FidelityCategory::ContextPreservation => "contextPreservation",
        }
    }
}

/// Per-category success/failure counts.
///
/// `rate()` is `successes / (successes + failures)` when there is at least
/// one observation, and `1.0` (vacuously satisfied) otherwise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FidelityCounter {
    /// Number of successful observations.
    pub successes: u64,
    /// Number of failed observations.
    pub failures: u64,
}

impl FidelityCounter {
    /// The observed success rate.
    pub fn rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            1.0
        } else {
            self.successes as f64 / total as f64
        }
    }

    /// Total number of observations.
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }
}
