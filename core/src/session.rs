//! S1 session splitter, S2 best-day selector and S3 sample sufficiency
//! filter (§4.1, §4.2).

use crate::packet::{FlowKey, Packet};
use std::collections::HashMap;

/// An ordered sequence of packet records sharing a flow key (§3 "Session").
#[derive(Debug, Clone)]
pub struct Session {
    pub flow_key: FlowKey,
    pub packets: Vec<Packet>,
}

impl Session {
    pub fn start(&self) -> f64 {
        self.packets.first().map(|p| p.t).unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.packets.last().map(|p| p.t).unwrap_or(0.0)
    }

    pub fn duration(&self) -> f64 {
        self.end() - self.start()
    }

    /// Recomputes each packet's `dt` as the gap since the previous packet in
    /// this session (first packet gets `dt = 0`), matching the reference
    /// implementation's per-session `time_interval` column.
    pub fn recompute_dt(&mut self) {
        let mut prev_t: Option<f64> = None;
        for pkt in &mut self.packets {
            pkt.dt = match prev_t {
                Some(prev) => (pkt.t - prev).max(0.0),
                None => 0.0,
            };
            prev_t = Some(pkt.t);
        }
    }
}

/// Splits one capture's packet stream into bidirectional 5-tuple sessions,
/// retaining only those whose duration is at least `duration_fraction *
/// T_cap` (§4.1).
///
/// Packets without both an IP and a TCP/UDP layer are expected to have
/// already been dropped by the decoder (§4.1 "Drop records without both an
/// IP layer and a TCP/UDP layer"); this function only groups and filters.
pub fn split_sessions(packets: &[Packet], duration_fraction: f64) -> Vec<Session> {
    if packets.is_empty() {
        return Vec::new();
    }
    let t_cap = packets.last().unwrap().t - packets.first().unwrap().t;
    let threshold = duration_fraction * t_cap;

    let mut by_flow: HashMap<FlowKey, Vec<Packet>> = HashMap::new();
    for pkt in packets {
        by_flow.entry(pkt.flow_key()).or_default().push(pkt.clone());
    }

    let mut sessions: Vec<Session> = Vec::new();
    for (flow_key, mut pkts) in by_flow {
        pkts.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap());
        let duration = pkts.last().unwrap().t - pkts.first().unwrap().t;
        if duration >= threshold {
            let mut session = Session {
                flow_key,
                packets: pkts,
            };
            session.recompute_dt();
            sessions.push(session);
        }
    }
    sessions
}

/// S2: among a device's capture-day subtrees (each holding some number of
/// session files), picks the one with the most sessions. Ties broken by
/// lexicographically smallest day name.
pub fn select_best_day<'a>(days: &'a [(String, usize)]) -> Option<&'a str> {
    days.iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(name, _)| name.as_str())
}

/// S3: a session survives only if it has at least `min_samples` sample
/// files (same threshold reused by S6).
pub fn has_sufficient_samples(sample_count: usize, min_samples: usize) -> bool {
    sample_count >= min_samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Direction, L4Proto};
    use std::net::IpAddr;

    fn pkt(t: f64, ip_src: &str, ip_dst: &str, sport: u16, dport: u16) -> Packet {
        Packet {
            t,
            len: 100,
            proto: L4Proto::Udp,
            eth_src: [0; 6],
            eth_dst: [0; 6],
            ip_src: ip_src.parse::<IpAddr>().unwrap(),
            ip_dst: ip_dst.parse::<IpAddr>().unwrap(),
            sport,
            dport,
            tcp_flags: None,
            tcp_len: None,
            tls_ct: None,
            payload: vec![],
            direction: Direction::Unknown,
            dt: 0.0,
        }
    }

    #[test]
    fn splits_into_bidirectional_sessions() {
        let packets = vec![
            pkt(0.0, "10.0.0.1", "10.0.0.2", 1234, 53),
            pkt(1.0, "10.0.0.2", "10.0.0.1", 53, 1234),
            pkt(2.0, "10.0.0.1", "10.0.0.2", 1234, 53),
        ];
        let sessions = split_sessions(&packets, 0.0);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].packets.len(), 3);
    }

    #[test]
    fn duration_filter_drops_short_flows() {
        let mut packets = vec![
            pkt(0.0, "10.0.0.1", "10.0.0.2", 1234, 53),
            pkt(100.0, "10.0.0.1", "10.0.0.2", 1234, 53),
        ];
        // A short-lived second flow within the same capture window.
        packets.push(pkt(0.0, "10.0.0.1", "10.0.0.3", 1111, 53));
        packets.push(pkt(0.1, "10.0.0.1", "10.0.0.3", 1111, 53));

        let sessions = split_sessions(&packets, 0.5);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].flow_key.ip_b.to_string(), "10.0.0.2");
    }

    #[test]
    fn empty_capture_yields_nothing() {
        assert!(split_sessions(&[], 0.5).is_empty());
    }

    #[test]
    fn best_day_prefers_most_sessions_then_lex_smallest() {
        let days = vec![
            ("2024-01-02".to_string(), 3),
            ("2024-01-01".to_string(), 3),
            ("2024-01-03".to_string(), 1),
        ];
        assert_eq!(select_best_day(&days), Some("2024-01-01"));
    }
}
