//! Capture-layer errors, separate from `fingerprint_core::PipelineError`
//! since decoding failures are specific to this crate's frame parser.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open capture {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: pcap::Error,
    },

    #[error("pcap read error: {0}")]
    Read(#[from] pcap::Error),

    #[error("failed to open device table {path}: {source}")]
    DeviceTable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed device table: {0}")]
    DeviceTableParse(#[from] toml::de::Error),

    #[error("failed to write session pcap {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: pcap::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
