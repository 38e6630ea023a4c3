//! S6 per-sample feature filter (§4.4).

use crate::packet::{L4Proto, Packet};

/// Whether a packet is retained for clustering: TLS application data, any
/// non-empty TCP payload without a TLS record, a TLS handshake record (TLS
/// present but no parsed content type), or any UDP packet.
pub fn is_key_candidate(pkt: &Packet) -> bool {
    let has_tls = pkt.tls_ct.is_some();
    if pkt.tls_ct == Some(23) {
        return true;
    }
    if let Some(tcp_len) = pkt.tcp_len {
        if tcp_len != 0 && !has_tls {
            return true;
        }
    }
    if has_tls && pkt.tls_ct == Some(TLS_CT_UNKNOWN) {
        return true;
    }
    if matches!(pkt.proto, L4Proto::Udp) {
        return true;
    }
    false
}

/// Sentinel content-type value meaning "a TLS record was observed but its
/// content type byte could not be classified" — rule 3 of §4.4 ("has(tls) ∧
/// tls_ct absent").
pub const TLS_CT_UNKNOWN: u8 = 0;

/// Filters one sample's packets, applying §4.4's retention rule. Returns
/// `None` if the filtered sample would be empty (§4.4 "an empty filtered
/// sample file is deleted").
pub fn filter_sample(packets: &[Packet]) -> Option<Vec<Packet>> {
    let filtered: Vec<Packet> = packets
        .iter()
        .filter(|p| is_key_candidate(p))
        .cloned()
        .collect();
    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Direction;
    use std::net::IpAddr;

    fn base_pkt() -> Packet {
        Packet {
            t: 0.0,
            len: 100,
            proto: L4Proto::Tcp,
            eth_src: [0; 6],
            eth_dst: [0; 6],
            ip_src: "10.0.0.1".parse::<IpAddr>().unwrap(),
            ip_dst: "10.0.0.2".parse::<IpAddr>().unwrap(),
            sport: 1,
            dport: 2,
            tcp_flags: None,
            tcp_len: Some(0),
            tls_ct: None,
            payload: vec![],
            direction: Direction::Unknown,
            dt: 0.0,
        }
    }

    #[test]
    fn tls_application_data_is_retained() {
        let mut p = base_pkt();
        p.tls_ct = Some(23);
        assert!(is_key_candidate(&p));
    }

    #[test]
    fn bare_tcp_ack_is_dropped() {
        let p = base_pkt();
        assert!(!is_key_candidate(&p));
    }

    #[test]
    fn tcp_with_payload_is_retained() {
        let mut p = base_pkt();
        p.tcp_len = Some(40);
        assert!(is_key_candidate(&p));
    }

    #[test]
    fn all_udp_is_retained() {
        let mut p = base_pkt();
        p.proto = L4Proto::Udp;
        p.tcp_len = None;
        assert!(is_key_candidate(&p));
    }

    #[test]
    fn empty_sample_is_dropped() {
        assert!(filter_sample(&[base_pkt()]).is_none());
    }
}
