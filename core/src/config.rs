//! Pipeline configuration (§6's "Configuration knobs"), loaded from a TOML
//! file or defaulted, in the style of `retina_core::config::load_config`.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Tunable constants shared by every pipeline stage.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// `α`: minimum session duration as a fraction of the capture's total
    /// time span (S1).
    #[serde(default = "default_duration_fraction")]
    pub duration_fraction: f64,

    /// Minimum aligned samples a session must retain to survive S3/S6.
    #[serde(default = "default_min_samples_per_session")]
    pub min_samples_per_session: usize,

    /// DBSCAN `eps` for S7's standardised-feature clustering.
    #[serde(default = "default_dbscan_eps")]
    pub dbscan_eps: f64,

    /// DBSCAN `min_samples` for S7.
    #[serde(default = "default_dbscan_min_samples")]
    pub dbscan_min_samples: usize,

    /// Minimum run length of consecutive ASCII `'0'` stripped from a hex
    /// payload before Nilsimsa hashing (S9).
    #[serde(default = "default_zero_run_strip_len")]
    pub zero_run_strip_len: usize,

    /// Worker pool size for S1/S4/S10. `None` means "use hardware
    /// concurrency".
    #[serde(default)]
    pub worker_count: Option<usize>,
}

fn default_duration_fraction() -> f64 {
    0.5
}

fn default_min_samples_per_session() -> usize {
    15
}

fn default_dbscan_eps() -> f64 {
    0.01
}

fn default_dbscan_min_samples() -> usize {
    5
}

fn default_zero_run_strip_len() -> usize {
    11
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            duration_fraction: default_duration_fraction(),
            min_samples_per_session: default_min_samples_per_session(),
            dbscan_eps: default_dbscan_eps(),
            dbscan_min_samples: default_dbscan_min_samples(),
            zero_run_strip_len: default_zero_run_strip_len(),
            worker_count: None,
        }
    }
}

impl PipelineConfig {
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Loads a [`PipelineConfig`] from a TOML file, falling back to defaults for
/// any field the file omits. Mirrors the teacher's `load_config`: a missing
/// file is not fatal at this layer, callers decide whether to warn.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(_) => Ok(PipelineConfig::default()),
    }
}
