//! TOML-backed configuration: persona documents and fidelity thresholds
//! (spec §6's "persisted read-only" persona configuration).

use std::collections::HashMap;

use serde::Deserialize;
use swarm_proto::FidelityCategory;

use crate::PersonaConfig;

/// Sandbox concurrency/timeout defaults, read from an optional `[sandbox]`
/// table. Every field is optional so a config file can omit the section
/// entirely and let the caller's own defaults stand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SandboxConfigSection {
    /// Overrides `SandboxManagerConfig::max_concurrency`.
    pub max_concurrency: Option<usize>,
    /// Overrides `SandboxManagerConfig::default_template`.
    pub default_template: Option<String>,
    /// Overrides `SandboxManagerConfig::default_timeout_ms`.
    pub default_timeout_ms: Option<u64>,
}

/// The full on-disk configuration document: personas, fidelity thresholds,
/// and sandbox defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrchestratorConfig {
    /// Persona name (as written in the file) to its static configuration.
    #[serde(default)]
    pub personas: HashMap<String, PersonaConfig>,
    /// Fidelity category name (camelCase, matching `FidelityCategory::as_str`)
    /// to its floor rate in `[0, 1]`.
    #[serde(default)]
    pub fidelity_thresholds: HashMap<String, f64>,
    /// Optional sandbox defaults.
    #[serde(default)]
    pub sandbox: Option<SandboxConfigSection>,
}

impl OrchestratorConfig {
    /// Parse a TOML document into a configuration.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Resolve `fidelity_thresholds` keys into typed `FidelityCategory`s,
    /// silently dropping any key that doesn't name a known category.
    pub fn fidelity_thresholds_by_category(&self) -> HashMap<FidelityCategory, f64> {
        FidelityCategory::ALL
            .iter()
            .filter_map(|&category| {
                self.fidelity_thresholds
                    .get(category.as_str())
                    .map(|&threshold| (category, threshold))
            })
            .collect()
    }
}
