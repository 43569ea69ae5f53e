use std::time::Duration;

use serde::Deserialize;

/// Tunable thresholds for one [`Comparator`](crate::Comparator).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest measurement-temperature gap (°C) still treated as the same condition.
    pub temperature_tolerance_c: f64,
    /// Shortest word that may count as a prefix of another in the product pre-check.
    pub min_prefix_len: usize,
    /// Shared-token ratio a concentration match must exceed.
    pub concentration_overlap_ratio: f64,
    /// Upper bound on one oracle call, retries included.
    pub oracle_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temperature_tolerance_c: 2.0,
            min_prefix_len: 3,
            concentration_overlap_ratio: 0.1,
            oracle_timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}
