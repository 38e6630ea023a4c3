//! S8 key-packet miner (§4.6 "Key packet multiplicity"): picks the
//! `(len, direction)` pair that recurs most across a session's surviving
//! clusters and derives how many times it must appear per sample.

use crate::cluster::ClusterRow;
use crate::packet::Direction;
use std::collections::BTreeMap;

/// One mined key packet and how many times it is expected per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPacketDescriptor {
    pub len: u32,
    pub direction: Direction,
    pub multiplicity: usize,
}

/// Mines the key packet(s) for one session from its clustered rows.
///
/// Groups every surviving (non-noise) row by `(len, direction)`, picks the
/// group with the largest total count `C` (ties broken by smallest
/// `(len, direction code)`, for determinism), and derives the per-sample
/// multiplicity `m = C / N + (1 if C % N >= ceil(N / 2) else 0)`. Returns an
/// empty vector if there are no surviving rows or `m == 0` — "no signature"
/// per §4.6.
///
/// Returns a `Vec` (rather than a single descriptor) so a future top-k
/// extension can populate more than one entry without changing callers'
/// shapes; today's pipeline only ever mines the single best pair.
pub fn mine_key_packets(rows: &[ClusterRow], n_samples: usize) -> Vec<KeyPacketDescriptor> {
    if n_samples == 0 {
        return Vec::new();
    }
    let mut counts: BTreeMap<(u32, i8), usize> = BTreeMap::new();
    for row in rows {
        if row.cluster_id == -1 {
            continue;
        }
        *counts.entry((row.packet.len, row.packet.direction.code())).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return Vec::new();
    }

    let best = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(&key, &count)| (key, count));

    let Some(((len, dir_code), total_count)) = best else {
        return Vec::new();
    };

    let n = n_samples;
    let quotient = total_count / n;
    let remainder = total_count % n;
    let ceil_half = (n + 1) / 2;
    let multiplicity = quotient + if remainder >= ceil_half { 1 } else { 0 };

    if multiplicity == 0 {
        return Vec::new();
    }

    vec![KeyPacketDescriptor {
        len,
        direction: Direction::from_code(dir_code),
        multiplicity,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::L4Proto;
    use std::net::IpAddr;

    fn cluster_row(len: u32, direction: Direction, cluster_id: i64, sample_index: usize) -> ClusterRow {
        ClusterRow {
            packet: crate::packet::Packet {
                t: 0.0,
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
                payload: vec![],
                direction,
                dt: 0.0,
            },
            sample_index,
            cluster_id,
        }
    }

    #[test]
    fn no_surviving_clusters_yields_no_signature() {
        let rows = vec![cluster_row(82, Direction::ToNetwork, -1, 0)];
        assert!(mine_key_packets(&rows, 10).is_empty());
    }

    #[test]
    fn picks_largest_count_pair_and_rounds_multiplicity() {
        // 10 samples; the (82, ToNetwork) pair appears 23 times total:
        // quotient = 2, remainder = 3, ceil(10/2) = 5, 3 < 5 -> m = 2.
        let mut rows = Vec::new();
        for i in 0..23 {
            rows.push(cluster_row(82, Direction::ToNetwork, 0, i % 10));
        }
        for i in 0..5 {
            rows.push(cluster_row(1490, Direction::ToDevice, 1, i));
        }
        let mined = mine_key_packets(&rows, 10);
        assert_eq!(mined.len(), 1);
        assert_eq!(mined[0].len, 82);
        assert_eq!(mined[0].direction, Direction::ToNetwork);
        assert_eq!(mined[0].multiplicity, 2);
    }

    #[test]
    fn remainder_at_or_above_half_rounds_up() {
        // 10 samples, count = 28: quotient = 2, remainder = 8 >= 5 -> m = 3.
        let mut rows = Vec::new();
        for i in 0..28 {
            rows.push(cluster_row(100, Direction::ToDevice, 0, i % 10));
        }
        let mined = mine_key_packets(&rows, 10);
        assert_eq!(mined[0].multiplicity, 3);
    }

    #[test]
    fn empty_input_yields_no_signature() {
        assert!(mine_key_packets(&[], 10).is_empty());
    }
}
