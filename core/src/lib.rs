//! Core pipeline for passive IoT device fingerprinting.
//!
//! This crate implements the transform stages that turn per-device packet
//! captures into a bank of device signatures, and the streaming matcher that
//! scores a fresh capture against that bank. It does not decode packets
//! itself: callers supply a [`source::PacketSource`] that yields
//! [`packet::Packet`] records, decoupling the pipeline from any particular
//! capture format or link layer.

pub mod cluster;
pub mod config;
pub mod error;
pub mod filter;
pub mod keypacket;
pub mod matcher;
pub mod merge;
pub mod nilsimsa;
pub mod packet;
pub mod periodicity;
pub mod session;
pub mod signature;
pub mod source;
pub mod workers;

pub use config::PipelineConfig;
pub use error::{PipelineError, StageReport};
pub use packet::{Direction, FlowKey, L4Proto, Packet};
pub use session::Session;
