//! String transcoding
//!
//! Host strings reach the guest in one of three ways, keyed by storage
//! width: 1- and 2-byte storage becomes an external guest string over the
//! same buffer (no copy; the 1-byte path forces the width-indicator bit on
//! the guest header), while 4-byte storage is transcoded to UTF-16 into a
//! fresh buffer that the guest string then owns.

use tether_engine::Value;
use tether_host::{HostStr, HostValue, StrStorageView};

use crate::errors::BridgeResult;
use crate::Bridge;

const HIGH_SURROGATE_START: u32 = 0xD800;
const LOW_SURROGATE_START: u32 = 0xDC00;
const LOW_SURROGATE_END: u32 = 0xDFFF;
const BMP_END: u32 = 0x10000;

/// Transcode 4-byte scalar values to UTF-16, expanding supplementary-plane
/// scalars into surrogate pairs.
pub fn ucs4_to_utf16(scalars: &[u32]) -> Vec<u16> {
    let mut units = Vec::with_capacity(scalars.len());
    for &c in scalars {
        if c < HIGH_SURROGATE_START || (c > LOW_SURROGATE_END && c < BMP_END) {
            units.push(c as u16);
        } else {
            let offset = c.wrapping_sub(BMP_END);
            units.push((HIGH_SURROGATE_START + (offset >> 10)) as u16);
            units.push((LOW_SURROGATE_START + (offset & 0x3FF)) as u16);
        }
    }
    units
}

/// Recombine UTF-16 code units into scalar values, pairing surrogates.
/// Unpaired surrogates pass through as their raw unit value.
pub fn utf16_to_scalars(units: &[u16]) -> Vec<u32> {
    let mut scalars = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let hi = u32::from(units[i]);
        if (HIGH_SURROGATE_START..LOW_SURROGATE_START).contains(&hi) && i + 1 < units.len() {
            let lo = u32::from(units[i + 1]);
            if (LOW_SURROGATE_START..=LOW_SURROGATE_END).contains(&lo) {
                scalars.push(
                    BMP_END + ((hi - HIGH_SURROGATE_START) << 10) + (lo - LOW_SURROGATE_START),
                );
                i += 2;
                continue;
            }
        }
        scalars.push(hi);
        i += 1;
    }
    scalars
}

impl Bridge {
    /// Convert a host string to a guest string.
    ///
    /// The source string is pinned and memoized regardless of which path
    /// produced the guest value, so the external-view paths always have an
    /// owner keeping the backing storage alive.
    pub(crate) fn convert_string(&mut self, source: &HostStr) -> BridgeResult<Value> {
        let host = HostValue::Str(source.clone());
        if let Some(hit) = self.registry.lookup(&host) {
            return Ok(hit);
        }

        let guest = match source.storage_view() {
            StrStorageView::Latin1(bytes) => self.engine.new_external_string_one_byte(bytes)?,
            StrStorageView::Ucs2(units) => self.engine.new_external_string_two_byte(units)?,
            StrStorageView::Ucs4(scalars) => self.engine.new_string(ucs4_to_utf16(&scalars))?,
        };

        if let Some(handle) = guest.handle() {
            self.registry.pin(&host, handle);
        }
        self.registry.memoize(&host, guest.clone());
        Ok(guest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmp_scalars_pass_through() {
        assert_eq!(ucs4_to_utf16(&[0x41, 0xFF, 0xFFFF]), vec![0x41, 0xFF, 0xFFFF]);
        assert_eq!(ucs4_to_utf16(&[0xD7FF, 0xE000]), vec![0xD7FF, 0xE000]);
    }

    #[test]
    fn test_supplementary_scalar_becomes_surrogate_pair() {
        assert_eq!(ucs4_to_utf16(&[0x1F600]), vec![0xD83D, 0xDE00]);
        assert_eq!(ucs4_to_utf16(&[0x10000]), vec![0xD800, 0xDC00]);
        assert_eq!(ucs4_to_utf16(&[0x10FFFF]), vec![0xDBFF, 0xDFFF]);
    }

    #[test]
    fn test_round_trip_sampled_codepoints() {
        let samples: Vec<u32> = (0u32..=0x10FFFF)
            .step_by(0x101)
            .filter(|c| !(0xD800..=0xDFFF).contains(c))
            .collect();
        let units = ucs4_to_utf16(&samples);
        assert_eq!(utf16_to_scalars(&units), samples);
    }

    #[test]
    fn test_unpaired_surrogate_passes_through_decode() {
        assert_eq!(utf16_to_scalars(&[0xD800]), vec![0xD800]);
        assert_eq!(utf16_to_scalars(&[0xDC00, 0x41]), vec![0xDC00, 0x41]);
        assert_eq!(utf16_to_scalars(&[0xD800, 0x41]), vec![0xD800, 0x41]);
    }
}
