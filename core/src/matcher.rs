//! S10 streaming signature matcher (§4.8): per-session "ideal" and "actual"
//! cyclic rotations of a signature, advanced independently as a live capture
//! is fed in, with either rotation reaching full length counting as a
//! session match.

use crate::packet::{Direction, L4Proto};
use crate::signature::Signature;
use std::collections::HashMap;

/// The part of a signature row the matcher compares against: frame length,
/// direction, and coarse protocol type. Payload content is not part of the
/// match predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchKey {
    pub len: u32,
    pub direction: Direction,
    pub protocol: L4Proto,
}

impl MatchKey {
    pub fn from_packet(pkt: &crate::packet::Packet) -> Self {
        MatchKey {
            len: pkt.len,
            direction: pkt.direction,
            protocol: pkt.proto,
        }
    }
}

fn signature_to_keys(sig: &Signature) -> Vec<MatchKey> {
    sig.rows
        .iter()
        .map(|r| MatchKey {
            len: r.len,
            direction: r.direction,
            protocol: match r.protocol_type {
                "tcp" => L4Proto::Tcp,
                "udp" => L4Proto::Udp,
                _ => L4Proto::Other,
            },
        })
        .collect()
}

/// One session's live matching state.
#[derive(Debug, Clone)]
struct SessionMatchState {
    signature: Vec<MatchKey>,
    bootstrapped: bool,
    ideal: Option<Vec<MatchKey>>,
    idx_ideal: usize,
    actual: Option<Vec<MatchKey>>,
    idx_actual: usize,
    matched: bool,
}

impl SessionMatchState {
    fn new(signature: Vec<MatchKey>) -> Self {
        // An empty signature is vacuously matched, same as Python's
        // `all([])` over zero key packets to satisfy.
        let matched = signature.is_empty();
        SessionMatchState {
            signature,
            bootstrapped: false,
            ideal: None,
            idx_ideal: 0,
            actual: None,
            idx_actual: 0,
            matched,
        }
    }

    fn rotate(signature: &[MatchKey], from: usize) -> Vec<MatchKey> {
        let mut out = signature[from..].to_vec();
        out.extend_from_slice(&signature[..from]);
        out
    }

    fn feed(&mut self, pkt: &MatchKey) {
        if self.matched {
            return;
        }
        let len = self.signature.len();
        if len == 0 {
            return;
        }

        if !self.bootstrapped {
            let ideal_idx = self.signature.iter().position(|k| k == pkt);
            let actual_idx = self.signature.iter().rposition(|k| k == pkt);

            if let Some(idx) = ideal_idx {
                self.ideal = Some(Self::rotate(&self.signature, idx));
                self.idx_ideal = 1;
                if self.idx_ideal == len {
                    self.matched = true;
                }
            }
            if let Some(idx) = actual_idx {
                self.actual = Some(Self::rotate(&self.signature, idx));
                self.idx_actual = 1;
                if self.idx_actual == len {
                    self.matched = true;
                }
            }
            if self.ideal.is_some() && self.actual.is_some() {
                self.bootstrapped = true;
            }
        } else {
            if let Some(ideal) = &self.ideal {
                if self.idx_ideal < len && ideal[self.idx_ideal] == *pkt {
                    self.idx_ideal += 1;
                    if self.idx_ideal == len {
                        self.matched = true;
                    }
                }
            }
            if let Some(actual) = &self.actual {
                if self.idx_actual < len && actual[self.idx_actual] == *pkt {
                    self.idx_actual += 1;
                    if self.idx_actual == len {
                        self.matched = true;
                    }
                }
            }
        }
    }
}

/// Live matcher for one candidate device: every session signature is
/// advanced independently as packets are fed in; the device is considered
/// matched once every session has matched.
#[derive(Debug, Clone)]
pub struct DeviceMatcher {
    device: String,
    sessions: HashMap<String, SessionMatchState>,
}

impl DeviceMatcher {
    pub fn new(device: &str, signatures: &[Signature]) -> Self {
        let sessions = signatures
            .iter()
            .filter(|s| s.device == device)
            .map(|s| (s.session_name.clone(), SessionMatchState::new(signature_to_keys(s))))
            .collect();
        DeviceMatcher {
            device: device.to_string(),
            sessions,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Feeds one test packet to every not-yet-matched session.
    pub fn feed(&mut self, pkt: &MatchKey) {
        for state in self.sessions.values_mut() {
            state.feed(pkt);
        }
    }

    /// True once every session signature for this device has matched. A
    /// device with no sessions at all is vacuously matched, same as a
    /// session with an empty signature.
    pub fn is_fully_matched(&self) -> bool {
        self.sessions.values().all(|s| s.matched)
    }

    pub fn session_matched(&self, session_name: &str) -> Option<bool> {
        self.sessions.get(session_name).map(|s| s.matched)
    }
}

/// Streams a full test capture against a bank of devices, returning the set
/// of device names whose every session signature matched.
pub fn match_stream<'a>(devices: &[&'a str], all_signatures: &[Signature], test_packets: &[MatchKey]) -> Vec<&'a str> {
    let mut matchers: Vec<DeviceMatcher> = devices.iter().map(|d| DeviceMatcher::new(d, all_signatures)).collect();
    for pkt in test_packets {
        for m in &mut matchers {
            m.feed(pkt);
        }
    }
    devices
        .iter()
        .zip(matchers.iter())
        .filter(|(_, m)| m.is_fully_matched())
        .map(|(&d, _)| d)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(len: u32) -> MatchKey {
        MatchKey { len, direction: Direction::ToNetwork, protocol: L4Proto::Tcp }
    }

    fn make_state(lens: &[u32]) -> SessionMatchState {
        SessionMatchState::new(lens.iter().map(|&l| key(l)).collect())
    }

    #[test]
    fn ideal_rotation_completes_the_literal_scenario() {
        // Signature [342,342,342,350,350,350]; test stream
        // [343,342,342,342,111,350,350,350,120] (§8 matcher scenario).
        let mut state = make_state(&[342, 342, 342, 350, 350, 350]);
        for len in [343, 342, 342, 342, 111, 350, 350, 350, 120] {
            state.feed(&key(len));
        }
        assert!(state.matched);
    }

    #[test]
    fn bootstrap_requires_a_single_shared_first_match() {
        let mut state = make_state(&[10, 20, 30]);
        assert!(!state.bootstrapped);
        state.feed(&key(99)); // no match anywhere, stays un-bootstrapped
        assert!(!state.bootstrapped);
        state.feed(&key(20)); // matches position 1
        assert!(state.bootstrapped);
        assert_eq!(state.ideal.as_ref().unwrap()[0], key(20));
        assert_eq!(state.actual.as_ref().unwrap()[0], key(20));
    }

    #[test]
    fn unrelated_packets_never_advance_a_matched_session() {
        let mut state = make_state(&[10]);
        state.feed(&key(10)); // single-element signature matches immediately
        assert!(state.matched);
        let before = state.idx_ideal;
        state.feed(&key(999));
        assert_eq!(state.idx_ideal, before);
    }

    #[test]
    fn empty_signature_is_vacuously_matched() {
        let state = make_state(&[]);
        assert!(state.matched);
    }

    #[test]
    fn device_with_no_sessions_is_vacuously_matched() {
        let matcher = DeviceMatcher::new("bulb", &[]);
        assert!(matcher.is_fully_matched());
    }

    #[test]
    fn device_matches_only_when_every_session_matches() {
        let mut matcher = DeviceMatcher::new("bulb", &[]);
        matcher.sessions.insert("only".into(), make_state(&[10, 20]));
        assert!(!matcher.is_fully_matched());
        matcher.feed(&key(20)); // bootstrap: first-match idx 1, actual idx 1 too -> len 2, not complete
        matcher.feed(&key(10));
        assert!(matcher.is_fully_matched());
    }
}
