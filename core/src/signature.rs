//! S9 key-packet signature extractor (§4.7): validates one sample's packet
//! multiset exactly against a session's mined key packets, then extracts the
//! matched packets — in arrival order — as that session's signature.

use crate::keypacket::KeyPacketDescriptor;
use crate::nilsimsa::payload_signature_bits;
use crate::packet::{Direction, Packet};
use std::collections::HashMap;

/// One row of an extracted signature: a matched key packet plus its
/// Nilsimsa-hashed payload.
#[derive(Debug, Clone)]
pub struct SignatureRow {
    pub t: f64,
    pub len: u32,
    pub direction: Direction,
    pub dt: f64,
    pub protocol_type: &'static str,
    pub payload_bits: String,
}

/// A session's extracted key-packet signature (§3 "Signature").
#[derive(Debug, Clone)]
pub struct Signature {
    pub device: String,
    pub session_name: String,
    pub period: u64,
    pub rows: Vec<SignatureRow>,
}

fn payload_hex(payload: &[u8]) -> String {
    payload.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Exact-multiset validation (§4.7): a sample validates only if, for every
/// mined key packet, it contains precisely `multiplicity` occurrences of
/// that `(len, direction)` pair — no more, no fewer.
pub fn validate_sample(sample: &[Packet], key_packets: &[KeyPacketDescriptor]) -> bool {
    let mut counts: HashMap<(u32, i8), usize> = HashMap::new();
    for pkt in sample {
        *counts.entry((pkt.len, pkt.direction.code())).or_insert(0) += 1;
    }
    key_packets
        .iter()
        .all(|kp| counts.get(&(kp.len, kp.direction.code())).copied().unwrap_or(0) == kp.multiplicity)
}

/// Extracts the matched key packets from one validated sample, in
/// arrival-time order, decrementing each pair's budget as it is consumed and
/// stopping as soon as every budget has reached zero.
fn extract_matched(
    sample: &[Packet],
    key_packets: &[KeyPacketDescriptor],
    zero_run_strip_len: usize,
) -> Vec<SignatureRow> {
    let mut remaining: HashMap<(u32, i8), usize> = key_packets
        .iter()
        .map(|kp| ((kp.len, kp.direction.code()), kp.multiplicity))
        .collect();

    let mut ordered: Vec<&Packet> = sample.iter().collect();
    ordered.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap());

    let mut rows = Vec::new();
    for pkt in ordered {
        let key = (pkt.len, pkt.direction.code());
        if let Some(budget) = remaining.get_mut(&key) {
            if *budget > 0 {
                *budget -= 1;
                rows.push(SignatureRow {
                    t: pkt.t,
                    len: pkt.len,
                    direction: pkt.direction,
                    dt: pkt.dt,
                    protocol_type: pkt.proto.as_str(),
                    payload_bits: payload_signature_bits(&payload_hex(&pkt.payload), zero_run_strip_len),
                });
                if remaining.values().all(|&c| c == 0) {
                    break;
                }
            }
        }
    }
    rows
}

/// Runs S9 over one session's samples: picks the first sample (in iteration
/// order) whose packet multiset exactly matches the mined key packets, and
/// extracts its signature. Returns `None` if no sample validates — §4.7 "no
/// signature" outcome.
pub fn extract_signature(
    device: &str,
    session_name: &str,
    period: u64,
    samples: &[Vec<Packet>],
    key_packets: &[KeyPacketDescriptor],
    zero_run_strip_len: usize,
) -> Option<Signature> {
    if key_packets.is_empty() {
        return None;
    }
    samples.iter().find_map(|sample| {
        if validate_sample(sample, key_packets) {
            Some(Signature {
                device: device.to_string(),
                session_name: session_name.to_string(),
                period,
                rows: extract_matched(sample, key_packets, zero_run_strip_len),
            })
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::L4Proto;
    use std::net::IpAddr;

    fn pkt(t: f64, len: u32, direction: Direction) -> Packet {
        Packet {
            t,
            len,
            proto: L4Proto::Udp,
            eth_src: [0; 6],
            eth_dst: [0; 6],
            ip_src: "10.0.0.1".parse::<IpAddr>().unwrap(),
            ip_dst: "10.0.0.2".parse::<IpAddr>().unwrap(),
            sport: 1,
            dport: 2,
            tcp_flags: None,
            tcp_len: None,
            tls_ct: None,
            payload: vec![0xab, 0xcd],
            direction,
            dt: 0.0,
        }
    }

    fn descriptor(len: u32, direction: Direction, multiplicity: usize) -> KeyPacketDescriptor {
        KeyPacketDescriptor { len, direction, multiplicity }
    }

    #[test]
    fn exact_count_mismatch_fails_validation() {
        let sample = vec![pkt(0.0, 82, Direction::ToNetwork)];
        let key_packets = vec![descriptor(82, Direction::ToNetwork, 2)];
        assert!(!validate_sample(&sample, &key_packets));
    }

    #[test]
    fn extra_occurrences_also_fail_validation() {
        let sample = vec![
            pkt(0.0, 82, Direction::ToNetwork),
            pkt(1.0, 82, Direction::ToNetwork),
            pkt(2.0, 82, Direction::ToNetwork),
        ];
        let key_packets = vec![descriptor(82, Direction::ToNetwork, 2)];
        assert!(!validate_sample(&sample, &key_packets));
    }

    #[test]
    fn first_validating_sample_wins_and_stops_at_budget() {
        let invalid_sample = vec![pkt(0.0, 82, Direction::ToNetwork)];
        let valid_sample = vec![
            pkt(0.0, 1490, Direction::ToDevice), // not a key packet, included only if matched
            pkt(1.0, 82, Direction::ToNetwork),
            pkt(2.0, 82, Direction::ToNetwork),
        ];
        let key_packets = vec![descriptor(82, Direction::ToNetwork, 2)];
        let sig = extract_signature("thermostat", "sess-1", 30, &[invalid_sample, valid_sample], &key_packets, 11)
            .expect("second sample should validate");
        assert_eq!(sig.rows.len(), 2);
        assert_eq!(sig.rows[0].t, 1.0);
        assert_eq!(sig.rows[1].t, 2.0);
        assert!(sig.rows.iter().all(|r| r.payload_bits.len() == 256));
    }

    #[test]
    fn no_validating_sample_yields_no_signature() {
        let sample = vec![pkt(0.0, 82, Direction::ToNetwork)];
        let key_packets = vec![descriptor(82, Direction::ToNetwork, 5)];
        assert!(extract_signature("thermostat", "sess-1", 30, &[sample], &key_packets, 11).is_none());
    }

    #[test]
    fn empty_key_packets_yields_no_signature() {
        let sample = vec![pkt(0.0, 82, Direction::ToNetwork)];
        assert!(extract_signature("thermostat", "sess-1", 30, &[sample], &[], 11).is_none());
    }
}
