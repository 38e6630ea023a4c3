//! S5 periodicity analyser: binarisation, FFT-based candidate periods,
//! autocorrelation scoring, period selection, and period-aligned slicing
//! (§4.3).

use crate::packet::Packet;
use crate::session::Session;
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::collections::BTreeSet;

/// Autocorrelation scores for one candidate period (`r`, `r_n`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutocorrScore {
    pub r: f64,
    pub r_n: f64,
}

/// The outcome of periodicity analysis for one session (§3 "Periodicity
/// result").
#[derive(Debug, Clone, Default)]
pub struct PeriodicityResult {
    pub candidates: BTreeSet<u64>,
    pub best: Option<(u64, AutocorrScore)>,
}

/// Builds the length-`d` activity bit vector described in §4.3: `x[i] = 1`
/// iff at least one packet falls in the half-open second
/// `[start + i, start + i + 1)`.
pub fn binarize(session: &Session) -> Vec<f64> {
    if session.packets.is_empty() {
        return Vec::new();
    }
    let start = session.start();
    let end = session.end();
    let d = (end - start).ceil() as i64 + 1;
    let mut x = vec![0.0f64; d.max(0) as usize];
    for pkt in &session.packets {
        let idx = (pkt.t - start).floor() as i64;
        if idx >= 0 && (idx as usize) < x.len() {
            x[idx as usize] = 1.0;
        }
    }
    x
}

/// The reference implementation's alternate binarisation (Open Question 1):
/// walks packets in order, padding zeros one second at a time until the
/// running clock reaches the packet's second, then always appends a `1` for
/// the packet itself. When two packets share the same second this can
/// append more than one `1` for that second (the "duplicate increment"
/// quirk) — kept only so both behaviours can be pinned behind a test, per
/// §9 Open Question 1. The pipeline itself uses [`binarize`].
pub fn binarize_reference_variant(session: &Session) -> Vec<f64> {
    if session.packets.is_empty() {
        return Vec::new();
    }
    let start = session.start();
    let end = session.end();
    let mut out = Vec::new();
    let mut current_time = start;
    for pkt in &session.packets {
        while pkt.t >= current_time + 1.0 {
            out.push(0.0);
            current_time += 1.0;
        }
        out.push(1.0);
        current_time += 1.0;
    }
    while current_time <= end {
        out.push(0.0);
        current_time += 1.0;
    }
    out
}

/// Candidate periods from the FFT magnitude spectrum (§4.3 "Candidate
/// frequencies"): strict local maxima above `0.1 * max(|FFT|)`, each
/// expanded to `[ceil(0.9t), floor(1.1t))` where `t = d / f`. Ties among
/// peaks are processed in ascending frequency-index order (§4.3
/// "Determinism").
pub fn candidate_periods(x: &[f64]) -> BTreeSet<u64> {
    let d = x.len();
    if d == 0 {
        return BTreeSet::new();
    }
    let mut buf: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(d);
    fft.process(&mut buf);

    let amplitudes: Vec<f64> = buf.iter().map(|c| c.norm()).collect();
    let threshold = amplitudes.iter().cloned().fold(0.0, f64::max) * 0.1;

    let mut candidates = BTreeSet::new();
    for i in 1..amplitudes.len().saturating_sub(1) {
        if amplitudes[i] >= threshold && amplitudes[i] > amplitudes[i - 1] && amplitudes[i] > amplitudes[i + 1]
        {
            let t = d as f64 / i as f64;
            let lower = (0.9 * t).ceil() as i64;
            let upper = (1.1 * t) as i64;
            let mut j = lower;
            while j < upper {
                if j > 0 {
                    candidates.insert(j as u64);
                }
                j += 1;
            }
        }
    }
    candidates
}

/// Autocorrelation scoring for one candidate period (§4.3 "Scoring").
/// Returns `None` if the candidate is out of range or rejected because it is
/// not a strict local maximum of `A`.
pub fn score_candidate(x: &[f64], i: u64) -> Option<AutocorrScore> {
    let d = x.len() as i64;
    let i = i as i64;
    if i < 1 || i > d - 2 {
        return None;
    }
    let dot = |shift: i64| -> f64 {
        if shift < 0 || shift as usize >= x.len() {
            return 0.0;
        }
        let shift = shift as usize;
        x[shift..].iter().zip(x[..x.len() - shift].iter()).map(|(a, b)| a * b).sum()
    };
    let a_i = dot(i);
    let a_lo = dot(i - 1);
    let a_hi = dot(i + 1);
    if !(a_i > a_lo && a_i > a_hi) {
        return None;
    }
    let r = i as f64 * a_i / d as f64;
    let r_n = i as f64 * (a_i + a_lo + a_hi) / d as f64;
    Some(AutocorrScore { r, r_n })
}

/// Selects the best period among scored candidates (§4.3 "Selection"):
/// prefer `r >= 1`, minimise `|r - 1| + |r_n - 1|`; otherwise relax to any
/// candidate with `!(r < 1 && r < 0.1 * r_n)` and minimise the same score.
pub fn select_period(scored: &[(u64, AutocorrScore)]) -> Option<(u64, AutocorrScore)> {
    let diff = |s: &AutocorrScore| (s.r - 1.0).abs() + (s.r_n - 1.0).abs();

    let stable = scored
        .iter()
        .filter(|(_, s)| s.r >= 1.0)
        .min_by(|a, b| diff(&a.1).partial_cmp(&diff(&b.1)).unwrap());
    if let Some(&(p, s)) = stable {
        return Some((p, s));
    }

    scored
        .iter()
        .filter(|(_, s)| !(s.r < 1.0 && s.r < 0.1 * s.r_n))
        .min_by(|a, b| diff(&a.1).partial_cmp(&diff(&b.1)).unwrap())
        .map(|&(p, s)| (p, s))
}

/// Runs the full S5 analysis on one session: binarise, find candidates,
/// score, select.
pub fn analyze(session: &Session) -> PeriodicityResult {
    let x = binarize(session);
    let candidates = candidate_periods(&x);
    let scored: Vec<(u64, AutocorrScore)> = candidates
        .iter()
        .filter_map(|&i| score_candidate(&x, i).map(|s| (i, s)))
        .collect();
    let best = select_period(&scored);
    PeriodicityResult { candidates, best }
}

/// S5 "Slicing": partitions a session's packets into successive windows of
/// length `period` seconds, each becoming one [`Sample`](crate::Session)-ish
/// bucket. A packet at exactly `start + k*period` starts bucket `k`.
pub fn slice_by_period(session: &Session, period: u64) -> Vec<Vec<Packet>> {
    if period == 0 || session.packets.is_empty() {
        return Vec::new();
    }
    let start = session.start();
    let period = period as f64;
    let mut buckets: Vec<Vec<Packet>> = Vec::new();
    for pkt in &session.packets {
        let k = ((pkt.t - start) / period).floor().max(0.0) as usize;
        if buckets.len() <= k {
            buckets.resize_with(k + 1, Vec::new);
        }
        buckets[k].push(pkt.clone());
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Direction, L4Proto};
    use std::net::IpAddr;

    fn pkt(t: f64) -> Packet {
        Packet {
            t,
            len: 82,
            proto: L4Proto::Udp,
            eth_src: [0; 6],
            eth_dst: [0; 6],
            ip_src: "10.0.0.1".parse::<IpAddr>().unwrap(),
            ip_dst: "8.8.8.8".parse::<IpAddr>().unwrap(),
            sport: 1234,
            dport: 53,
            tcp_flags: None,
            tcp_len: None,
            tls_ct: None,
            payload: vec![],
            direction: Direction::ToNetwork,
            dt: 0.0,
        }
    }

    #[test]
    fn empty_session_has_no_period() {
        let session = Session {
            flow_key: crate::packet::FlowKey::new(
                "10.0.0.1".parse().unwrap(),
                1,
                "10.0.0.2".parse().unwrap(),
                2,
                L4Proto::Udp,
            ),
            packets: vec![],
        };
        let result = analyze(&session);
        assert!(result.best.is_none());
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn single_packet_has_no_period() {
        let session = Session {
            flow_key: crate::packet::FlowKey::new(
                "10.0.0.1".parse().unwrap(),
                1,
                "10.0.0.2".parse().unwrap(),
                2,
                L4Proto::Udp,
            ),
            packets: vec![pkt(0.0)],
        };
        let result = analyze(&session);
        assert!(result.best.is_none());
    }

    #[test]
    fn periodic_beacon_recovers_the_period() {
        let mut packets = Vec::new();
        let mut t = 0.0;
        while t < 1000.0 {
            packets.push(pkt(t));
            t += 30.0;
        }
        let session = Session {
            flow_key: crate::packet::FlowKey::new(
                "10.0.0.1".parse().unwrap(),
                1,
                "10.0.0.2".parse().unwrap(),
                2,
                L4Proto::Udp,
            ),
            packets,
        };
        let result = analyze(&session);
        let (period, _) = result.best.expect("periodic session should have a best period");
        assert_eq!(period, 30);
    }

    #[test]
    fn selection_prefers_r_stable_candidate_with_smallest_diff() {
        let scored = vec![
            (7, AutocorrScore { r: 0.9, r_n: 0.95 }),
            (14, AutocorrScore { r: 1.02, r_n: 1.01 }),
            (21, AutocorrScore { r: 1.5, r_n: 1.6 }),
        ];
        let (period, _) = select_period(&scored).unwrap();
        assert_eq!(period, 14);
    }

    #[test]
    fn slicing_partitions_every_packet_in_time_order() {
        let packets = vec![pkt(0.0), pkt(5.0), pkt(10.0), pkt(15.0)];
        let session = Session {
            flow_key: crate::packet::FlowKey::new(
                "10.0.0.1".parse().unwrap(),
                1,
                "10.0.0.2".parse().unwrap(),
                2,
                L4Proto::Udp,
            ),
            packets,
        };
        let buckets = slice_by_period(&session, 10);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].len(), 2);
        assert_eq!(buckets[1].len(), 2);
    }
}
