//! The packet record and flow-key types that every pipeline stage shares.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Layer-4 protocol of a packet, as carried through the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum L4Proto {
    Tcp,
    Udp,
    Other,
}

impl L4Proto {
    /// Stable small integer used by S7's categorical encoding of `proto`.
    ///
    /// The mapping is arbitrary but fixed within a binary: S7 only needs
    /// ordering to be consistent across rows of one clustering run.
    pub fn code(self) -> i64 {
        match self {
            L4Proto::Tcp => 0,
            L4Proto::Udp => 1,
            L4Proto::Other => 2,
        }
    }

    /// Parses the `frame.protocols` style dotted string used by the original
    /// feature CSVs (`extract_protocol` in the reference implementation):
    /// `"tcp"` if it contains tcp, else `"udp"` if it contains udp, else
    /// `Other`.
    pub fn from_protocols_str(protocols: &str) -> Self {
        if protocols.contains("tcp") {
            L4Proto::Tcp
        } else if protocols.contains("udp") {
            L4Proto::Udp
        } else {
            L4Proto::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            L4Proto::Tcp => "tcp",
            L4Proto::Udp => "udp",
            L4Proto::Other => "other",
        }
    }
}

/// Packet direction relative to the device under observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// device -> network
    ToNetwork,
    /// network -> device
    ToDevice,
    Unknown,
}

impl Direction {
    pub fn code(self) -> i8 {
        match self {
            Direction::ToNetwork => 1,
            Direction::ToDevice => -1,
            Direction::Unknown => 0,
        }
    }

    pub fn from_code(code: i8) -> Self {
        match code {
            1 => Direction::ToNetwork,
            -1 => Direction::ToDevice,
            _ => Direction::Unknown,
        }
    }
}

/// A single decoded packet record, as produced by S4 feature extraction and
/// consumed by every later stage (§3 of the data model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    /// Monotonic epoch seconds.
    pub t: f64,
    /// Frame length in bytes.
    pub len: u32,
    pub proto: L4Proto,
    pub eth_src: [u8; 6],
    pub eth_dst: [u8; 6],
    pub ip_src: IpAddr,
    pub ip_dst: IpAddr,
    pub sport: u16,
    pub dport: u16,
    pub tcp_flags: Option<u8>,
    /// TCP payload length, when this is a TCP segment (`tcp.len` column).
    pub tcp_len: Option<u32>,
    /// TLS record content type, if the payload parses as a TLS record.
    pub tls_ct: Option<u8>,
    pub payload: Vec<u8>,
    pub direction: Direction,
    /// Seconds since the previous record in this session; 0 for the first.
    pub dt: f64,
}

impl Packet {
    /// The canonical, direction-agnostic 5-tuple flow key (§3: "Flow key").
    pub fn flow_key(&self) -> FlowKey {
        FlowKey::new(
            self.ip_src,
            self.sport,
            self.ip_dst,
            self.dport,
            self.proto,
        )
    }
}

/// A 5-tuple flow key, canonicalised so both directions of one conversation
/// map to the same key. Canonicalisation picks the lexicographically smaller
/// of the two ordered tuples `(ip_a, port_a, ip_b, port_b, proto)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub ip_a: IpAddr,
    pub port_a: u16,
    pub ip_b: IpAddr,
    pub port_b: u16,
    pub proto: L4Proto,
}

impl FlowKey {
    pub fn new(ip_src: IpAddr, sport: u16, ip_dst: IpAddr, dport: u16, proto: L4Proto) -> Self {
        let fwd = (ip_src, sport, ip_dst, dport);
        let rev = (ip_dst, dport, ip_src, sport);
        let (ip_a, port_a, ip_b, port_b) = if fwd <= rev { fwd } else { rev };
        FlowKey {
            ip_a,
            port_a,
            ip_b,
            port_b,
            proto,
        }
    }

    /// A filesystem-safe filename encoding one direction of the 5-tuple, per
    /// §4.1: `{ip_a}_{port_a}_{ip_b}_{port_b}_{proto}.pcap`.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.ip_a,
            self.port_a,
            self.ip_b,
            self.port_b,
            self.proto.as_str()
        )
    }
}

impl L4Proto {
    /// Hashable ordering helper so `FlowKey` can derive `Ord`.
    fn rank(self) -> u8 {
        match self {
            L4Proto::Tcp => 0,
            L4Proto::Udp => 1,
            L4Proto::Other => 2,
        }
    }
}

impl PartialOrd for L4Proto {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for L4Proto {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_key_is_involutive() {
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        let fwd = FlowKey::new(a, 1234, b, 443, L4Proto::Tcp);
        let rev = FlowKey::new(b, 443, a, 1234, L4Proto::Tcp);
        assert_eq!(fwd, rev);
    }
}
