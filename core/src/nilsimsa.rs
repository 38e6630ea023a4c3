//! Bit-exact Nilsimsa locality-sensitive hash (§6 "Nilsimsa digest"), and the
//! payload canonicalisation S9 applies before hashing.

/// 256-entry transposition table used by `tran3`.
const TRAN: [u8; 256] = [
    0x02, 0xD6, 0x9E, 0x6F, 0xF9, 0x1D, 0x04, 0xAB, 0xD0, 0x22, 0x16, 0x1F, 0xD8, 0x73, 0xA1, 0xAC,
    0x3B, 0x70, 0x62, 0x96, 0x1E, 0x6E, 0x8F, 0x39, 0x9D, 0x05, 0x14, 0x4A, 0xA6, 0xBE, 0xAE, 0x0E,
    0xCF, 0xB9, 0x9C, 0x9A, 0xC7, 0x68, 0x13, 0xE1, 0x2D, 0xA4, 0xEB, 0x51, 0x8D, 0x64, 0x6B, 0x50,
    0x23, 0x80, 0x03, 0x41, 0xEC, 0xBB, 0x71, 0xCC, 0x7A, 0x86, 0x7F, 0x98, 0xF2, 0x36, 0x5E, 0xEE,
    0x8E, 0xCE, 0x4F, 0xB8, 0x32, 0xB6, 0x5F, 0x59, 0xDC, 0x1B, 0x31, 0x4C, 0x7B, 0xF0, 0x63, 0x01,
    0x6C, 0xBA, 0x07, 0xE8, 0x12, 0x77, 0x49, 0x3C, 0xDA, 0x46, 0xFE, 0x2F, 0x79, 0x1C, 0x9B, 0x30,
    0xE3, 0x00, 0x06, 0x7E, 0x2E, 0x0F, 0x38, 0x33, 0x21, 0xAD, 0xA5, 0x54, 0xCA, 0xA7, 0x29, 0xFC,
    0x5A, 0x47, 0x69, 0x7D, 0xC5, 0x95, 0xB5, 0xF4, 0x0B, 0x90, 0xA3, 0x81, 0x6D, 0x25, 0x55, 0x35,
    0xF5, 0x75, 0x74, 0x0A, 0x26, 0xBF, 0x19, 0x5C, 0x1A, 0xC6, 0xFF, 0x99, 0x5D, 0x84, 0xAA, 0x66,
    0x3E, 0xAF, 0x78, 0xB3, 0x20, 0x43, 0xC1, 0xED, 0x24, 0xEA, 0xE6, 0x3F, 0x18, 0xF3, 0xA0, 0x42,
    0x57, 0x08, 0x53, 0x60, 0xC3, 0xC0, 0x83, 0x40, 0x82, 0xD7, 0x09, 0xBD, 0x44, 0x2A, 0x67, 0xA8,
    0x93, 0xE0, 0xC2, 0x56, 0x9F, 0xD9, 0xDD, 0x85, 0x15, 0xB4, 0x8A, 0x27, 0x28, 0x92, 0x76, 0xDE,
    0xEF, 0xF8, 0xB2, 0xB7, 0xC9, 0x3D, 0x45, 0x94, 0x4B, 0x11, 0x0D, 0x65, 0xD5, 0x34, 0x8B, 0x91,
    0x0C, 0xFA, 0x87, 0xE9, 0x7C, 0x5B, 0xB1, 0x4D, 0xE5, 0xD4, 0xCB, 0x10, 0xA2, 0x17, 0x89, 0xBC,
    0xDB, 0xB0, 0xE2, 0x97, 0x88, 0x52, 0xF7, 0x48, 0xD3, 0x61, 0x2C, 0x3A, 0x2B, 0xD1, 0x8C, 0xFB,
    0xF1, 0xCD, 0xE4, 0x6A, 0xE7, 0xA9, 0xFD, 0xC4, 0x37, 0xC8, 0xD2, 0xF6, 0xDF, 0x58, 0x72, 0x4E,
];

/// A 256-bit digest, stored as 32 bytes (`digest[0]` holds bits 248..255).
pub type Digest256 = [u8; 32];

/// Incremental Nilsimsa hash state.
#[derive(Debug, Clone)]
pub struct Nilsimsa {
    count: u64,
    acc: [u32; 256],
    lastch: [i32; 4],
}

impl Default for Nilsimsa {
    fn default() -> Self {
        Nilsimsa {
            count: 0,
            acc: [0; 256],
            lastch: [-1; 4],
        }
    }
}

impl Nilsimsa {
    pub fn new() -> Self {
        Self::default()
    }

    fn tran3(a: u8, b: u8, c: u8, n: usize) -> usize {
        let i = (c as usize) ^ (TRAN[n] as usize);
        let term1 = (TRAN[((a as usize) + n) & 255] as usize) ^ ((TRAN[b as usize] as usize) * (n + n + 1));
        (term1 + (TRAN[i & 0xff] as usize)) & 0xff
    }

    pub fn update(&mut self, data: &[u8]) {
        for &ch in data {
            self.count += 1;
            if self.lastch[1] > -1 {
                self.acc[Self::tran3(ch, self.lastch[0] as u8, self.lastch[1] as u8, 0)] += 1;
            }
            if self.lastch[2] > -1 {
                self.acc[Self::tran3(ch, self.lastch[0] as u8, self.lastch[2] as u8, 1)] += 1;
                self.acc[Self::tran3(ch, self.lastch[1] as u8, self.lastch[2] as u8, 2)] += 1;
            }
            if self.lastch[3] > -1 {
                self.acc[Self::tran3(ch, self.lastch[0] as u8, self.lastch[3] as u8, 3)] += 1;
                self.acc[Self::tran3(ch, self.lastch[1] as u8, self.lastch[3] as u8, 4)] += 1;
                self.acc[Self::tran3(ch, self.lastch[2] as u8, self.lastch[3] as u8, 5)] += 1;
                self.acc[Self::tran3(self.lastch[3] as u8, self.lastch[0] as u8, ch, 6)] += 1;
                self.acc[Self::tran3(self.lastch[3] as u8, self.lastch[2] as u8, ch, 7)] += 1;
            }
            self.lastch[3] = self.lastch[2];
            self.lastch[2] = self.lastch[1];
            self.lastch[1] = self.lastch[0];
            self.lastch[0] = ch as i32;
        }
    }

    /// Computes the 32-byte digest from the current accumulator state.
    pub fn digest(&self) -> Digest256 {
        let total: i64 = if self.count == 3 {
            1
        } else if self.count == 4 {
            4
        } else if self.count > 4 {
            8 * self.count as i64 - 28
        } else {
            0
        };
        let threshold = total / 256;

        let mut digest = [0u8; 32];
        for i in 0..256 {
            if self.acc[i] as i64 > threshold {
                digest[31 - (i >> 3)] |= 1 << (i & 7);
            }
        }
        digest
    }

    pub fn hexdigest(&self) -> String {
        digest_to_hex(&self.digest())
    }
}

/// Uppercase 64-hex-character rendering of a 32-byte digest.
pub fn digest_to_hex(digest: &Digest256) -> String {
    digest.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Expands a 64-hex-character digest into its 256-bit (MSB-first per
/// nibble) binary string rendering, as used in the signature CSV's
/// `payload` column.
pub fn hex_to_binary_string(hex: &str) -> String {
    hex.chars()
        .map(|c| c.to_digit(16).unwrap_or(0))
        .map(|nibble| format!("{:04b}", nibble))
        .collect()
}

/// Strips every maximal run of `>= min_run` consecutive ASCII `'0'`
/// characters from `payload` (§4.6 "Payload canonicalisation").
pub fn strip_zero_runs(payload: &str, min_run: usize) -> String {
    if min_run == 0 {
        return payload.to_string();
    }
    let mut out = String::with_capacity(payload.len());
    let chars: Vec<char> = payload.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '0' {
            let mut j = i;
            while j < chars.len() && chars[j] == '0' {
                j += 1;
            }
            let run_len = j - i;
            if run_len < min_run {
                out.extend(&chars[i..j]);
            }
            i = j;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Computes a payload's canonical 256-bit digest, as a 256-character
/// binary string, per §4.6. Empty/absent payloads become the all-zero
/// string.
pub fn payload_signature_bits(payload_hex: &str, zero_run_strip_len: usize) -> String {
    if payload_hex.is_empty() {
        return "0".repeat(256);
    }
    let cleaned = strip_zero_runs(payload_hex, zero_run_strip_len);
    if cleaned.is_empty() {
        return "0".repeat(256);
    }
    let mut hasher = Nilsimsa::new();
    hasher.update(cleaned.as_bytes());
    hex_to_binary_string(&hasher.hexdigest())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vector_abcdefgh() {
        let mut h = Nilsimsa::new();
        h.update(b"abcdefgh");
        // Published Nilsimsa reference digest for the 8-byte input
        // "abcdefgh" (scenario 6 of §8).
        assert_eq!(
            h.hexdigest(),
            "14C8118000000000030800000004042004189020001308014088003280000078"
        );
    }

    #[test]
    fn zero_strip_then_hash_is_pinned() {
        let payload = format!("00{}ff", "0".repeat(20));
        let bits = payload_signature_bits(&payload, 11);
        assert_eq!(bits.len(), 256);
        let cleaned = strip_zero_runs(&payload, 11);
        assert_eq!(cleaned, "ff");
    }

    #[test]
    fn empty_payload_is_all_zero() {
        let bits = payload_signature_bits("", 11);
        assert_eq!(bits, "0".repeat(256));
    }

    #[test]
    fn strip_only_removes_runs_at_least_min_len() {
        assert_eq!(strip_zero_runs("0000000000", 11), "0000000000"); // 10 zeros, below threshold
        assert_eq!(strip_zero_runs("00000000000", 11), ""); // 11 zeros, stripped
    }
}
