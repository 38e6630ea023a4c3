//! Merges one device's per-session signatures into the flat, JSON-bearing
//! row the streaming matcher's signature bank is built from (§4.8's
//! "signature bank"), grounded on
//! `artifact/signatureMatching/4.1_merge_device_signatures.py`.
//!
//! The embedded JSON carries the full Signature CSV schema (§6:
//! `frame.time_epoch, frame.len, direction, time_interval, protocol_type,
//! payload`) rather than just the `(len, direction, protocol_type)` triple
//! the matcher itself reads, so the bank stays a faithful record of what S9
//! extracted. The reference schema's trailing `label` column is omitted: it
//! only exists to feed the supervised-ML training pipeline this crate
//! explicitly excludes as a Non-goal, and carries no matcher-relevant
//! information.

use crate::packet::Direction;
use crate::signature::{Signature, SignatureRow};
use serde::{Deserialize, Serialize};

/// One row of a merged signature, matching the Signature CSV schema minus
/// the ML-only `label` column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyPacketEntry {
    pub frame_time_epoch: f64,
    pub frame_len: u32,
    pub direction: i8,
    pub time_interval: f64,
    pub protocol_type: String,
    pub payload: String,
}

impl From<&SignatureRow> for KeyPacketEntry {
    fn from(row: &SignatureRow) -> Self {
        KeyPacketEntry {
            frame_time_epoch: row.t,
            frame_len: row.len,
            direction: row.direction.code(),
            time_interval: row.dt,
            protocol_type: row.protocol_type.to_string(),
            payload: row.payload_bits.clone(),
        }
    }
}

/// A flat, serialisable row of the merged signature bank: one row per
/// session, `signature` holding the ordered key-packet list as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedSignatureRow {
    pub device_name: String,
    pub session_name: String,
    pub period: u64,
    pub signature: String,
}

/// Serialises one session `Signature` into its merged-bank row.
pub fn merge_signature(sig: &Signature) -> MergedSignatureRow {
    let entries: Vec<KeyPacketEntry> = sig.rows.iter().map(KeyPacketEntry::from).collect();
    MergedSignatureRow {
        device_name: sig.device.clone(),
        session_name: sig.session_name.clone(),
        period: sig.period,
        signature: serde_json::to_string(&entries).expect("key packet entries always serialise"),
    }
}

/// Reconstructs a `Signature` from a merged-bank row.
pub fn unmerge_signature(row: &MergedSignatureRow) -> Result<Signature, serde_json::Error> {
    let entries: Vec<KeyPacketEntry> = serde_json::from_str(&row.signature)?;
    let rows = entries
        .into_iter()
        .map(|e| SignatureRow {
            t: e.frame_time_epoch,
            len: e.frame_len,
            direction: Direction::from_code(e.direction),
            dt: e.time_interval,
            protocol_type: static_protocol_str(&e.protocol_type),
            payload_bits: e.payload,
        })
        .collect();
    Ok(Signature {
        device: row.device_name.clone(),
        session_name: row.session_name.clone(),
        period: row.period,
        rows,
    })
}

/// Maps a protocol name back to the `'static` string `SignatureRow` expects,
/// via lookup rather than an owned `String` — avoids threading a lifetime
/// through `Signature` just for the matcher's reconstructed rows.
fn static_protocol_str(s: &str) -> &'static str {
    match s {
        "tcp" => "tcp",
        "udp" => "udp",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::L4Proto;

    #[test]
    fn round_trips_through_json() {
        let sig = Signature {
            device: "bulb".into(),
            session_name: "10.0.0.1_1234_10.0.0.2_443_tcp".into(),
            period: 30,
            rows: vec![SignatureRow {
                t: 1.0,
                len: 342,
                direction: Direction::ToNetwork,
                dt: 0.1,
                protocol_type: L4Proto::Tcp.as_str(),
                payload_bits: "0".repeat(256),
            }],
        };
        let merged = merge_signature(&sig);
        let restored = unmerge_signature(&merged).unwrap();
        assert_eq!(restored.device, sig.device);
        assert_eq!(restored.rows.len(), 1);
        assert_eq!(restored.rows[0].t, 1.0);
        assert_eq!(restored.rows[0].len, 342);
        assert_eq!(restored.rows[0].direction, Direction::ToNetwork);
        assert_eq!(restored.rows[0].dt, 0.1);
        assert_eq!(restored.rows[0].protocol_type, "tcp");
        assert_eq!(restored.rows[0].payload_bits, "0".repeat(256));
    }
}
