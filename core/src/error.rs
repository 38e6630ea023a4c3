//! Pipeline error types (§7).
//!
//! Principle: stage-local recovery, pipeline-global reporting. A failing
//! file never aborts a stage; `StageReport` accumulates the tally instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The external frame decoder refused a field. Callers retry with the
    /// offending field removed, up to four attempts, before giving up.
    #[error("decoder rejected field `{field}` in {path}")]
    DecoderRejection { path: String, field: String },

    /// A downstream reader could not parse an upstream CSV artifact.
    #[error("malformed CSV at {path}: {source}")]
    MalformedCsv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Per-stage summary: `total`, `ok`, `fail` (§7).
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct StageReport {
    pub total: usize,
    pub ok: usize,
    pub fail: usize,
}

impl StageReport {
    pub fn record_ok(&mut self) {
        self.total += 1;
        self.ok += 1;
    }

    pub fn record_fail(&mut self) {
        self.total += 1;
        self.fail += 1;
    }

    pub fn merge(&mut self, other: StageReport) {
        self.total += other.total;
        self.ok += other.ok;
        self.fail += other.fail;
    }
}
