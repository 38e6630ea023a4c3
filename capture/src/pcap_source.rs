//! A [`PacketSource`] that reads an offline pcap/pcapng file and decodes
//! each frame, grounded on the teacher's `pcap_dump` example's use of the
//! `pcap` crate for file I/O.

use crate::device_table::DeviceTable;
use crate::error::CaptureError;
use crate::frame::decode_frame;
use fingerprint_core::packet::Packet;
use fingerprint_core::source::PacketSource;
use pcap::Capture;
use std::path::Path;

pub struct PcapFileSource {
    capture: Capture<pcap::Offline>,
    device: String,
    device_table: DeviceTable,
}

impl PcapFileSource {
    pub fn open(path: &Path, device: &str, device_table: DeviceTable) -> Result<Self, CaptureError> {
        let capture = Capture::from_file(path).map_err(|source| CaptureError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(PcapFileSource {
            capture,
            device: device.to_string(),
            device_table,
        })
    }
}

impl PacketSource for PcapFileSource {
    type Error = CaptureError;

    fn next_packet(&mut self) -> Result<Option<Packet>, Self::Error> {
        loop {
            match self.capture.next_packet() {
                Ok(raw) => {
                    let t = raw.header.ts.tv_sec as f64 + raw.header.ts.tv_usec as f64 / 1_000_000.0;
                    match decode_frame(raw.data, t, &self.device, &self.device_table) {
                        Some(pkt) => return Ok(Some(pkt)),
                        None => continue, // no IP+TCP/UDP layer; drop and advance (§4.1)
                    }
                }
                Err(pcap::Error::NoMorePackets) => return Ok(None),
                Err(e) => return Err(CaptureError::Read(e)),
            }
        }
    }
}
