//! The abstraction boundary between this crate and whatever decodes raw
//! frames. Per §9's design note, the original's coroutine-style `PcapReader`
//! iteration becomes an explicit iterator trait here; the only suspension
//! surface outside I/O.

use crate::packet::Packet;

/// Delivers decoded [`Packet`] records from one capture, in non-decreasing
/// timestamp order. Implementations live outside this crate (e.g. in
/// `fingerprint-capture`, reading pcap/pcapng files) — the core pipeline
/// never parses link-layer frames itself.
pub trait PacketSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the next packet, or `Ok(None)` at end of capture.
    fn next_packet(&mut self) -> Result<Option<Packet>, Self::Error>;
}

/// Drains a [`PacketSource`] into a `Vec<Packet>`, skipping malformed frames
/// with a warning rather than aborting (§4.1 "Failure").
pub fn collect_all<S: PacketSource>(mut source: S) -> Vec<Packet> {
    let mut out = Vec::new();
    loop {
        match source.next_packet() {
            Ok(Some(pkt)) => out.push(pkt),
            Ok(None) => break,
            Err(e) => {
                log::warn!("skipping malformed frame: {e}");
            }
        }
    }
    out
}

/// A [`PacketSource`] over an in-memory vector, used by tests and by stages
/// that re-slice an already-materialised session (S5's per-sample slicing).
pub struct VecSource {
    packets: std::vec::IntoIter<Packet>,
}

impl VecSource {
    pub fn new(packets: Vec<Packet>) -> Self {
        VecSource {
            packets: packets.into_iter(),
        }
    }
}

impl PacketSource for VecSource {
    type Error = std::convert::Infallible;

    fn next_packet(&mut self) -> Result<Option<Packet>, Self::Error> {
        Ok(self.packets.next())
    }
}
