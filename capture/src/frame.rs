//! Ethernet/IPv4/IPv6/TCP/UDP decoding into [`fingerprint_core::Packet`],
//! grounded on the teacher's pnet usage (`examples/pcap_dump`) and on the
//! reference implementation's tshark field list (`frame.time_epoch`,
//! `frame.len`, `eth.src`/`eth.dst`, `tcp.len`/`udp.length`,
//! `tls.record.content_type`).

use crate::device_table::DeviceTable;
use fingerprint_core::packet::{FlowKey, L4Proto, Packet};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet as PnetPacket;
use std::net::IpAddr;

/// A lightweight decode used only for S1 session splitting: the flow key and
/// nothing else, so a whole capture can be grouped into per-session pcap
/// files before the heavier S4 feature decode runs over each of them.
pub fn flow_key_of_frame(data: &[u8]) -> Option<FlowKey> {
    let eth = EthernetPacket::new(data)?;
    match eth.get_ethertype() {
        EtherTypes::Ipv4 => {
            let ipv4 = Ipv4Packet::new(eth.payload())?;
            let (sport, dport) = ports_of(ipv4.get_next_level_protocol(), ipv4.payload())?;
            Some(FlowKey::new(
                IpAddr::V4(ipv4.get_source()),
                sport,
                IpAddr::V4(ipv4.get_destination()),
                dport,
                l4proto_of(ipv4.get_next_level_protocol())?,
            ))
        }
        EtherTypes::Ipv6 => {
            let ipv6 = Ipv6Packet::new(eth.payload())?;
            let (sport, dport) = ports_of(ipv6.get_next_header(), ipv6.payload())?;
            Some(FlowKey::new(
                IpAddr::V6(ipv6.get_source()),
                sport,
                IpAddr::V6(ipv6.get_destination()),
                dport,
                l4proto_of(ipv6.get_next_header())?,
            ))
        }
        _ => None,
    }
}

fn l4proto_of(proto: pnet::packet::ip::IpNextHeaderProtocol) -> Option<L4Proto> {
    match proto {
        IpNextHeaderProtocols::Tcp => Some(L4Proto::Tcp),
        IpNextHeaderProtocols::Udp => Some(L4Proto::Udp),
        _ => None,
    }
}

fn ports_of(proto: pnet::packet::ip::IpNextHeaderProtocol, payload: &[u8]) -> Option<(u16, u16)> {
    match proto {
        IpNextHeaderProtocols::Tcp => {
            let tcp = TcpPacket::new(payload)?;
            Some((tcp.get_source(), tcp.get_destination()))
        }
        IpNextHeaderProtocols::Udp => {
            let udp = UdpPacket::new(payload)?;
            Some((udp.get_source(), udp.get_destination()))
        }
        _ => None,
    }
}

/// Inspects the first bytes of a TCP payload for a TLS record header
/// (`ContentType, LegacyVersion[3, x], length[2]`) and returns the content
/// type byte if it looks like one. Per §4.4, any TCP payload that is not a
/// recognisable TLS record still counts as "has(tls)" if it's non-empty and
/// starts with a byte in the known content-type range but an unparseable
/// version — we only report `Some` for a clean match and leave the rest to
/// the caller via `tcp_len`.
fn sniff_tls_content_type(payload: &[u8]) -> Option<u8> {
    if payload.len() < 5 {
        return None;
    }
    let ct = payload[0];
    let is_known_ct = matches!(ct, 20..=23);
    let version_major = payload[1];
    if is_known_ct && version_major == 3 {
        Some(ct)
    } else {
        None
    }
}

/// Decodes one Ethernet frame captured at timestamp `t` (epoch seconds).
/// Returns `None` for frames without both an IP layer and a TCP/UDP layer
/// (§4.1 "Drop records without both an IP layer and a TCP/UDP layer").
pub fn decode_frame(data: &[u8], t: f64, device: &str, device_table: &DeviceTable) -> Option<Packet> {
    let eth = EthernetPacket::new(data)?;
    let eth_src = eth.get_source().octets();
    let eth_dst = eth.get_destination().octets();
    let direction = device_table.direction(device, eth_src, eth_dst);

    let (ip_src, ip_dst, proto, l4_payload): (IpAddr, IpAddr, _, Vec<u8>) = match eth.get_ethertype() {
        EtherTypes::Ipv4 => {
            let ipv4 = Ipv4Packet::new(eth.payload())?;
            (
                IpAddr::V4(ipv4.get_source()),
                IpAddr::V4(ipv4.get_destination()),
                ipv4.get_next_level_protocol(),
                ipv4.payload().to_vec(),
            )
        }
        EtherTypes::Ipv6 => {
            let ipv6 = Ipv6Packet::new(eth.payload())?;
            (
                IpAddr::V6(ipv6.get_source()),
                IpAddr::V6(ipv6.get_destination()),
                ipv6.get_next_header(),
                ipv6.payload().to_vec(),
            )
        }
        _ => return None,
    };

    let (l4proto, sport, dport, tcp_flags, tcp_len, payload): (L4Proto, u16, u16, Option<u8>, Option<u32>, Vec<u8>) =
        match proto {
            IpNextHeaderProtocols::Tcp => {
                let tcp = TcpPacket::new(&l4_payload)?;
                let body = tcp.payload().to_vec();
                (
                    L4Proto::Tcp,
                    tcp.get_source(),
                    tcp.get_destination(),
                    Some(tcp.get_flags()),
                    Some(body.len() as u32),
                    body,
                )
            }
            IpNextHeaderProtocols::Udp => {
                let udp = UdpPacket::new(&l4_payload)?;
                let body = udp.payload().to_vec();
                (L4Proto::Udp, udp.get_source(), udp.get_destination(), None, None, body)
            }
            _ => return None,
        };

    let tls_ct = if matches!(l4proto, L4Proto::Tcp) { sniff_tls_content_type(&payload) } else { None };

    Some(Packet {
        t,
        len: data.len() as u32,
        proto: l4proto,
        eth_src,
        eth_dst,
        ip_src,
        ip_dst,
        sport,
        dport,
        tcp_flags,
        tcp_len,
        tls_ct,
        payload,
        direction,
        dt: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_application_data_header_is_recognised() {
        let mut payload = vec![23, 3, 3, 0, 10];
        payload.extend(vec![0u8; 10]);
        assert_eq!(sniff_tls_content_type(&payload), Some(23));
    }

    #[test]
    fn short_payload_is_not_mistaken_for_tls() {
        assert_eq!(sniff_tls_content_type(&[23, 3]), None);
    }

    #[test]
    fn non_tls_payload_is_rejected() {
        let payload = vec![0x47, 0x45, 0x54, 0x20, 0x2f];
        assert_eq!(sniff_tls_content_type(&payload), None);
    }
}
