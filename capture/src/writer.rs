//! Writes a session's raw frames out as a new pcap file (§4.1's per-session
//! artifact), named by [`FlowKey::file_stem`].

use crate::error::CaptureError;
use fingerprint_core::packet::FlowKey;
use pcap::{Capture, Linktype, Packet as PcapPacket, PacketHeader};
use std::path::Path;

pub struct SessionPcapWriter;

impl SessionPcapWriter {
    /// Writes `frames` (each an epoch-second timestamp plus the raw
    /// Ethernet frame bytes, in non-decreasing time order) to
    /// `dir/{flow_key.file_stem()}.pcap`.
    pub fn write_session(dir: &Path, flow_key: &FlowKey, frames: &[(f64, Vec<u8>)]) -> Result<(), CaptureError> {
        std::fs::create_dir_all(dir).map_err(|source| CaptureError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = dir.join(format!("{}.pcap", flow_key.file_stem()));

        let dead = Capture::dead(Linktype::ETHERNET).map_err(|source| CaptureError::Write {
            path: path.display().to_string(),
            source,
        })?;
        let mut savefile = dead.savefile(&path).map_err(|source| CaptureError::Write {
            path: path.display().to_string(),
            source,
        })?;

        for (t, data) in frames {
            let header = PacketHeader {
                ts: libc_timeval(*t),
                caplen: data.len() as u32,
                len: data.len() as u32,
            };
            let pkt = PcapPacket::new(&header, data);
            savefile.write(&pkt);
        }
        Ok(())
    }
}

fn libc_timeval(t: f64) -> libc::timeval {
    libc::timeval {
        tv_sec: t.floor() as libc::time_t,
        tv_usec: ((t - t.floor()) * 1_000_000.0) as libc::suseconds_t,
    }
}
