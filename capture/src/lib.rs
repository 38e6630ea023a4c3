//! Decodes pcap/pcapng captures into [`fingerprint_core::Packet`] records and
//! writes per-session pcap files. Kept as its own crate so the core pipeline
//! never depends on a link-layer decoder (§9 design note).

pub mod device_table;
pub mod error;
pub mod frame;
pub mod pcap_source;
pub mod writer;

pub use device_table::DeviceTable;
pub use error::CaptureError;
pub use pcap_source::PcapFileSource;
pub use writer::SessionPcapWriter;
