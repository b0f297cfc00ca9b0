//! The "magic" 128-bit capability format.
//!
//! The two data doublewords hold the base and the cursor exactly; the
//! rest of the capability (object type, permissions, seal bit, length)
//! rides out of band next to the tag bit. Bounds are always exact, at
//! the cost of auxiliary storage per line.

use super::{CapImage, Codec};
use crate::cap::{Capability, Perms, CAP_MAX_TOP};
use cheri_common::constants::{CAP_SIZE_128, OTYPE_MAX};
use cheri_common::memory::SideData;

#[derive(Debug, Default, Clone, Copy)]
pub struct Magic128;

impl Magic128 {
    fn encode_side(&self, cap: &Capability) -> SideData {
        let tps = if cap.tag {
            ((cap.otype ^ OTYPE_MAX) as u64) << 32
                | cap.perms_word() << 1
                | cap.is_sealed() as u64
        } else {
            // Untagged patterns reproduce the word they were loaded with.
            cap.pesbt
        };
        SideData {
            tps,
            length: cap.length() ^ u64::MAX,
        }
    }
}

impl Codec for Magic128 {
    const CAP_SIZE: usize = CAP_SIZE_128;

    fn compress(&self, cap: &Capability) -> CapImage {
        CapImage {
            words: [cap.base, cap.cursor, 0, 0],
            side: Some(self.encode_side(cap)),
        }
    }

    fn decompress(&self, image: &CapImage, tag: bool) -> Capability {
        let base = image.words[0];
        let cursor = image.words[1];
        // Absent side data reads back as the null metadata.
        let side = image.side.unwrap_or_default();

        let length = side.length ^ u64::MAX;
        let top = if length == u64::MAX && base == 0 {
            CAP_MAX_TOP
        } else {
            base as u128 + length as u128
        };
        let (perms, uperms) = Perms::unpack(side.tps >> 1);

        Capability {
            tag,
            base,
            top,
            cursor,
            perms,
            uperms,
            otype: ((side.tps >> 32) as u32 ^ OTYPE_MAX) & OTYPE_MAX,
            pesbt: side.tps,
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
