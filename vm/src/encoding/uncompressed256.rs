//! The uncompressed 256-bit capability format.
//!
//! Four doublewords carry (object type + permissions + seal bit),
//! cursor, base and length directly; every abstract capability is
//! representable exactly. The object type and length are stored
//! complemented so that an all-zero memory region decodes as the null
//! capability.

use super::{CapImage, Codec};
use crate::cap::{Capability, Perms, CAP_MAX_TOP};
use cheri_common::constants::{CAP_SIZE_256, OTYPE_MAX};

#[derive(Debug, Default, Clone, Copy)]
pub struct Uncompressed256;

impl Codec for Uncompressed256 {
    const CAP_SIZE: usize = CAP_SIZE_256;

    fn compress(&self, cap: &Capability) -> CapImage {
        let metadata = if cap.tag {
            ((cap.otype ^ OTYPE_MAX) as u64) << 32
                | cap.perms_word() << 1
                | cap.is_sealed() as u64
        } else {
            cap.pesbt
        };
        CapImage {
            words: [metadata, cap.cursor, cap.base, cap.length() ^ u64::MAX],
            side: None,
        }
    }

    fn decompress(&self, image: &CapImage, tag: bool) -> Capability {
        let metadata = image.words[0];
        let cursor = image.words[1];
        let base = image.words[2];
        let length = image.words[3] ^ u64::MAX;

        let top = if length == u64::MAX && base == 0 {
            CAP_MAX_TOP
        } else {
            base as u128 + length as u128
        };
        let (perms, uperms) = Perms::unpack(metadata >> 1);

        Capability {
            tag,
            base,
            top,
            cursor,
            perms,
            uperms,
            otype: ((metadata >> 32) as u32 ^ OTYPE_MAX) & OTYPE_MAX,
            pesbt: metadata,
        }
    }

    fn is_representable(&self, _cap: &Capability, _new_cursor: u64) -> bool {
        true
    }

    fn is_representable_when_sealed(&self, _cap: &Capability, _new_cursor: u64) -> bool {
        true
    }

    fn alignment_mask(&self, _len: u64) -> u64 {
        u64::MAX
    }

    fn round_length(&self, len: u64) -> u64 {
        len
    }

    fn set_bounds(&self, cap: &mut Capability, base: u64, top: u128) -> bool {
        cap.base = base;
        cap.top = top;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_memory_decodes_to_null() {
        let codec = Uncompressed256;
        let decoded = codec.decompress(&CapImage::default(), false);
        assert!(decoded.is_null());
        assert!(decoded.is_unsealed());
        assert_eq!(decoded.perms, Perms::empty());
        assert_eq!(decoded.length(), u64::MAX);
    }

    #[test]
    fn test_null_encodes_to_zero() {
        let codec = Uncompressed256;
        assert_eq!(codec.compress(&Capability::null()).words, [0; 4]);
    }

    #[test]
    fn test_tagged_round_trip() {
        let codec = Uncompressed256;
        let mut c = Capability::max_perms(0x4008);
        c.base = 0x4000;
        c.top = 0x5001;
        c.perms = Perms::LOAD | Perms::STORE | Perms::GLOBAL;
        c.uperms = 0x5;
        c.set_sealed(0x1234);

        let d = codec.decompress(&codec.compress(&c), true);
        assert_eq!(d.base, c.base);
        assert_eq!(d.top, c.top);
        assert_eq!(d.cursor, c.cursor);
        assert_eq!(d.perms, c.perms);
        assert_eq!(d.uperms, c.uperms);
        assert_eq!(d.otype, 0x1234);
    }

    #[test]
    fn test_untagged_byte_patterns_round_trip() {
        let codec = Uncompressed256;
        for words in [
            [0u64; 4],
            [u64::MAX; 4],
            [0x0123_4567_89ab_cdef, 1, 2, 3],
        ] {
            let image = CapImage { words, side: None };
            let decoded = codec.decompress(&image, false);
            assert_eq!(codec.compress(&decoded), image);
        }
    }
}
