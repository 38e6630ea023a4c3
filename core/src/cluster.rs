//! S7 session-level merge + clustering (§4.5): Z-score the
//! `(len, direction, proto)` columns, then DBSCAN over the standardised
//! vectors. No clustering crate in the dependency tree does quite this
//! shape (three small categorical/ordinal columns, not a general point
//! cloud), so DBSCAN is implemented directly, grounded on the reference
//! `sklearn.cluster.DBSCAN(eps=0.01, min_samples=5)` call.

use crate::packet::{Direction, L4Proto, Packet};
use ndarray::Array2;
use ndarray_stats::QuantileExt;

/// A packet extended with its cluster assignment (`-1` = noise), per §3
/// "Cluster row".
#[derive(Debug, Clone)]
pub struct ClusterRow {
    pub packet: Packet,
    pub sample_index: usize,
    pub cluster_id: i64,
}

/// Builds the `(len, direction, proto)` feature matrix and Z-scores each
/// column independently. A column with zero variance is left at zero after
/// centring (matching `StandardScaler`'s behaviour of not dividing by a
/// zero standard deviation).
fn standardized_features(packets: &[Packet]) -> Array2<f64> {
    let n = packets.len();
    let mut raw = Array2::<f64>::zeros((n, 3));
    for (i, pkt) in packets.iter().enumerate() {
        raw[[i, 0]] = pkt.len as f64;
        raw[[i, 1]] = pkt.direction.code() as f64;
        raw[[i, 2]] = pkt.proto.code() as f64;
    }

    let mut out = raw.clone();
    for col in 0..3 {
        let column = raw.column(col);
        let mean = column.mean().unwrap_or(0.0);
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n.max(1) as f64;
        let std = variance.sqrt();
        for i in 0..n {
            out[[i, col]] = if std > 0.0 { (raw[[i, col]] - mean) / std } else { 0.0 };
        }
    }
    out
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// DBSCAN over standardised rows. Returns one cluster id per input row
/// (`-1` for noise), in input order.
fn dbscan(features: &Array2<f64>, eps: f64, min_samples: usize) -> Vec<i64> {
    let n = features.nrows();
    let rows: Vec<Vec<f64>> = (0..n).map(|i| features.row(i).to_vec()).collect();

    let neighbors = |i: usize| -> Vec<usize> {
        (0..n).filter(|&j| euclidean(&rows[i], &rows[j]) <= eps).collect()
    };

    let mut labels = vec![i64::MIN; n]; // MIN = unvisited
    let mut next_cluster: i64 = 0;

    for i in 0..n {
        if labels[i] != i64::MIN {
            continue;
        }
        let neighbors_i = neighbors(i);
        if neighbors_i.len() < min_samples {
            labels[i] = -1;
            continue;
        }
        let cluster_id = next_cluster;
        next_cluster += 1;
        labels[i] = cluster_id;

        let mut queue: Vec<usize> = neighbors_i;
        let mut qi = 0;
        while qi < queue.len() {
            let j = queue[qi];
            qi += 1;
            if labels[j] == -1 {
                labels[j] = cluster_id;
            }
            if labels[j] != i64::MIN {
                continue;
            }
            labels[j] = cluster_id;
            let neighbors_j = neighbors(j);
            if neighbors_j.len() >= min_samples {
                for &k in &neighbors_j {
                    if !queue.contains(&k) {
                        queue.push(k);
                    }
                }
            }
        }
    }
    labels
}

/// Runs S7 over one session's merged, per-sample-tagged packets: Z-score,
/// DBSCAN, and drop any cluster smaller than `ceil(n_samples / 2)` rows (a
/// key packet must appear in at least half the samples).
pub fn cluster_session(
    packets: &[Packet],
    sample_indices: &[usize],
    n_samples: usize,
    eps: f64,
    min_samples: usize,
) -> Vec<ClusterRow> {
    assert_eq!(packets.len(), sample_indices.len());
    if packets.is_empty() {
        return Vec::new();
    }
    let features = standardized_features(packets);
    let labels = dbscan(&features, eps, min_samples);

    let mut counts: std::collections::HashMap<i64, usize> = std::collections::HashMap::new();
    for &label in &labels {
        if label != -1 {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    let survival_threshold = (n_samples + 1) / 2; // ceil(n_samples / 2)

    packets
        .iter()
        .zip(sample_indices.iter())
        .zip(labels.iter())
        .map(|((pkt, &sample_index), &label)| {
            let cluster_id = if label != -1 && counts.get(&label).copied().unwrap_or(0) >= survival_threshold
            {
                label
            } else {
                -1
            };
            ClusterRow {
                packet: pkt.clone(),
                sample_index,
                cluster_id,
            }
        })
        .collect()
}

/// Helper re-export so callers can encode direction/proto consistently with
/// the clustering feature matrix when building statistics elsewhere.
pub fn feature_triple(pkt: &Packet) -> (u32, Direction, L4Proto) {
    (pkt.len, pkt.direction, pkt.proto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn pkt(len: u32, direction: Direction, proto: L4Proto) -> Packet {
        Packet {
            t: 0.0,
            len,
            proto,
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
        }
    }

    #[test]
    fn dense_repeated_packet_forms_a_surviving_cluster() {
        let mut packets = Vec::new();
        let mut sample_indices = Vec::new();
        for s in 0..10 {
            packets.push(pkt(82, Direction::ToNetwork, L4Proto::Udp));
            sample_indices.push(s);
            packets.push(pkt(1490, Direction::ToDevice, L4Proto::Tcp));
            sample_indices.push(s);
        }
        let rows = cluster_session(&packets, &sample_indices, 10, 0.01, 2);
        let surviving: Vec<&ClusterRow> = rows.iter().filter(|r| r.cluster_id != -1).collect();
        assert!(!surviving.is_empty());
        assert!(surviving.iter().all(|r| r.packet.len == 82 || r.packet.len == 1490));
    }
}
