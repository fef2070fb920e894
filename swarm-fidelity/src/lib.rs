//! # swarm-fidelity — fidelity rate tracking (spec §4.7)
//!
//! A bus subscriber, grounded on the same `EventHandler` seam `swarm-bus`
//! exposes for any other in-process listener. Each matching event type
//! bumps one category's success or failure counter under a single write
//! lock, so a reader's snapshot is always consistent with some linear order
//! of observed events.

#![deny(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swarm_bus::{EventBus, EventHandler};
use swarm_proto::{Event, FidelityCategory, FidelityCounter};
use tokio::sync::RwLock;

/// Default per-category threshold: 0.99, except `crossLanguageCommunication`
/// which defaults to 0.97 (spec §4.7).
pub fn default_thresholds() -> HashMap<FidelityCategory, f64> {
    FidelityCategory::ALL
        .iter()
        .map(|&c| {
            let threshold = if c == FidelityCategory::CrossLanguageCommunication {
                0.97
            } else {
                0.99
            };
            (c, threshold)
        })
        .collect()
}

fn classify(event_type: &str) -> Option<(FidelityCategory, bool)> {
    use FidelityCategory::*;
    match event_type {
        "event.processed" => Some((EventProcessing, true)),
        "event.processing.failed" => Some((EventProcessing, false)),
        "tool.execution.completed" => Some((AgentToolExecution, true)),
        "tool.execution.failed" => Some((AgentToolExecution, false)),
        "cross.language.received" => Some((CrossLanguageCommunication, true)),
        "cross.language.failed" => Some((CrossLanguageCommunication, false)),
        "mode.changed" => Some((ModeSwitching, true)),
        "mode.change.failed" => Some((ModeSwitching, false)),
        "context.preserved" => Some((ContextPreservation, true)),
        "context.preservation.failed" => Some((ContextPreservation, false)),
        _ => None,
    }
}

/// One category's rate compared against its configured threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CategoryFidelity {
    /// The observed success rate.
    pub rate: f64,
    /// The configured threshold for this category.
    pub threshold: f64,
    /// Whether `rate >= threshold`.
    pub ok: bool,
}

/// A full fidelity validation report across every category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FidelityReport {
    /// Per-category rate, threshold, and pass/fail.
    pub per_category: HashMap<String, CategoryFidelity>,
    /// Weighted mean rate across categories with at least one observation,
    /// weighted by each category's observation count.
    pub overall_fidelity: f64,
    /// Whether every category with at least one observation meets its
    /// threshold.
    pub all_operations_meet_threshold: bool,
}

/// Tracks per-category success/failure counts by subscribing to the event
/// bus, and validates them against configured thresholds.
pub struct FidelityMetricsTracker {
    counters: RwLock<HashMap<FidelityCategory, FidelityCounter>>,
    thresholds: HashMap<FidelityCategory, f64>,
}

impl FidelityMetricsTracker {
    /// Create a tracker with the default thresholds (0.99, 0.97 for
    /// cross-language communication) and zeroed counters.
    pub fn new() -> Self {
        Self::with_thresholds(default_thresholds())
    }

    /// Create a tracker with explicit per-category thresholds. Categories
    /// absent from `thresholds` fall back to their spec default.
    pub fn with_thresholds(thresholds: HashMap<FidelityCategory, f64>) -> Self {
        let mut merged = default_thresholds();
        merged.extend(thresholds);
        Self {
            counters: RwLock::new(HashMap::new()),
            thresholds: merged,
        }
    }

    /// Subscribe this tracker to `bus`'s full event stream.
    pub async fn attach(self: &Arc<Self>, bus: &EventBus) {
        bus.subscribe(swarm_bus::WILDCARD, Arc::clone(self) as Arc<dyn EventHandler>)
            .await;
    }

    async fn record(&self, category: FidelityCategory, success: bool) {
        let mut counters = self.counters.write().await;
        let counter = counters.entry(category).or_default();
        if success {
            counter.successes += 1;
        } else {
            counter.failures += 1;
        }
    }

    /// Per-category success rates (1.0 for categories with zero
    /// observations).
    pub async fn get_fidelity_rates(&self) -> HashMap<FidelityCategory, f64> {
        let counters = self.counters.read().await;
        FidelityCategory::ALL
            .iter()
            .map(|&c| (c, counters.get(&c).copied().unwrap_or_default().rate()))
            .collect()
    }

    /// Validate every category against its threshold and compute the
    /// overall weighted fidelity.
    pub async fn validate_fidelity(&self) -> FidelityReport {
        let counters = self.counters.read().await;
        let mut per_category = HashMap::new();
        let mut weighted_sum = 0.0;
        let mut weighted_total = 0u64;
        let mut all_ok = true;

        for &category in &FidelityCategory::ALL {
            let counter = counters.get(&category).copied().unwrap_or_default();
            let threshold = self.thresholds[&category];
            let rate = counter.rate();
            let observed = counter.total() > 0;
            let ok = rate >= threshold;
            if observed && !ok {
                all_ok = false;
            }
            if observed {
                weighted_sum += rate * counter.total() as f64;
                weighted_total += counter.total();
            }
            per_category.insert(category.as_str().to_string(), CategoryFidelity { rate, threshold, ok });
        }

        let overall_fidelity = if weighted_total == 0 {
            1.0
        } else {
            weighted_sum / weighted_total as f64
        };

        FidelityReport {
            per_category,
            overall_fidelity,
            all_operations_meet_threshold: all_ok,
        }
    }
}

impl Default for FidelityMetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for FidelityMetricsTracker {
    async fn handle(&self, event: &Event) {
        if let Some((category, success)) = classify(&event.event_type) {
            self.record(category, success).await;
        }
    }
}
