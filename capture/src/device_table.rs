//! Device name -> MAC address mapping, grounded on the reference
//! implementation's `device_mac_mapping` dictionary: direction is derived by
//! comparing a frame's source/destination MAC against the one device under
//! observation in a capture.

use crate::error::CaptureError;
use fingerprint_core::Direction;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
struct RawDeviceTable {
    #[serde(flatten)]
    devices: HashMap<String, String>,
}

/// Parsed device-name -> MAC-address table.
#[derive(Debug, Clone, Default)]
pub struct DeviceTable {
    macs: HashMap<String, [u8; 6]>,
}

fn parse_mac(s: &str) -> Option<[u8; 6]> {
    let mut out = [0u8; 6];
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return None;
    }
    for (i, p) in parts.iter().enumerate() {
        out[i] = u8::from_str_radix(p, 16).ok()?;
    }
    Some(out)
}

impl DeviceTable {
    /// Loads a `device_name = "aa:bb:cc:dd:ee:ff"` TOML table.
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CaptureError::DeviceTable {
            path: path.display().to_string(),
            source,
        })?;
        let raw: RawDeviceTable = toml::from_str(&contents)?;
        let mut macs = HashMap::new();
        for (device, mac_str) in raw.devices {
            if let Some(mac) = parse_mac(&mac_str) {
                macs.insert(device, mac);
            } else {
                log::warn!("device table: could not parse MAC `{mac_str}` for `{device}`");
            }
        }
        Ok(DeviceTable { macs })
    }

    pub fn mac_for(&self, device: &str) -> Option<[u8; 6]> {
        self.macs.get(device).copied()
    }

    /// Direction of a frame relative to `device`'s MAC: `ToNetwork` if the
    /// device is the source, `ToDevice` if the device is the destination,
    /// `Unknown` otherwise (neither side matches, e.g. broadcast traffic).
    pub fn direction(&self, device: &str, eth_src: [u8; 6], eth_dst: [u8; 6]) -> Direction {
        match self.mac_for(device) {
            Some(mac) if mac == eth_src => Direction::ToNetwork,
            Some(mac) if mac == eth_dst => Direction::ToDevice,
            _ => Direction::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_separated_mac() {
        assert_eq!(parse_mac("b0:f1:ec:d4:26:ae"), Some([0xb0, 0xf1, 0xec, 0xd4, 0x26, 0xae]));
    }

    #[test]
    fn rejects_malformed_mac() {
        assert_eq!(parse_mac("not-a-mac"), None);
    }

    #[test]
    fn direction_matches_src_or_dst() {
        let mut macs = HashMap::new();
        macs.insert("bulb".to_string(), [1, 2, 3, 4, 5, 6]);
        let table = DeviceTable { macs };
        assert_eq!(table.direction("bulb", [1, 2, 3, 4, 5, 6], [9, 9, 9, 9, 9, 9]), Direction::ToNetwork);
        assert_eq!(table.direction("bulb", [9, 9, 9, 9, 9, 9], [1, 2, 3, 4, 5, 6]), Direction::ToDevice);
        assert_eq!(table.direction("bulb", [9, 9, 9, 9, 9, 9], [8, 8, 8, 8, 8, 8]), Direction::Unknown);
    }
}
