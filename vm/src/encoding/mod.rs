//! The three memory representations of a capability.
//!
//! One set of semantics, three wire formats: the engine is parameterised
//! by a [`Codec`] chosen at construction, and every capability crossing
//! the memory boundary goes through `compress`/`decompress` here.

mod compressed128;
mod magic128;
mod uncompressed256;

pub use compressed128::Compressed128;
pub use magic128::Magic128;
pub use uncompressed256::Uncompressed256;

use crate::cap::Capability;
use cheri_common::constants::WORD_SIZE;
use cheri_common::memory::SideData;

/// A capability as it sits in memory: up to four little-endian
/// doublewords of data, plus any out-of-band payload the format stores
/// next to the tag bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CapImage {
    pub words: [u64; 4],
    pub side: Option<SideData>,
}

impl CapImage {
    /// The metadata word an untagged capability must reproduce verbatim:
    /// the out-of-band word for formats that side-carry one, the first
    /// data word otherwise.
    pub fn metadata(&self) -> u64 {
        self.side.map_or(self.words[0], |s| s.tps)
    }
}

/// A capability wire format.
pub trait Codec {
    /// Memory footprint of one capability in bytes.
    const CAP_SIZE: usize;

    /// Encode a capability for memory. Untagged values reproduce the
    /// exact byte pattern they were decoded from.
    fn compress(&self, cap: &Capability) -> CapImage;

    /// Decode a memory image together with its tag bit.
    fn decompress(&self, image: &CapImage, tag: bool) -> Capability;

    /// Whether the capability's bounds survive moving the cursor to
    /// `new_cursor` under this format.
    fn is_representable(&self, cap: &Capability, new_cursor: u64) -> bool;

    /// Like [`Codec::is_representable`], under the reduced precision a
    /// sealed capability gets.
    fn is_representable_when_sealed(&self, cap: &Capability, new_cursor: u64) -> bool;

    /// Mask that aligns an address down far enough that bounds of the
    /// rounded form of `len` can be set exactly.
    fn alignment_mask(&self, len: u64) -> u64;

    /// Smallest representable length at least as large as `len`,
    /// assuming a suitably aligned base.
    fn round_length(&self, len: u64) -> u64;

    /// Replace the capability's bounds with `[base, top)`, widening to
    /// the nearest enclosing representable bounds if necessary. Returns
    /// whether the result is exactly as requested. The cursor is left
    /// untouched.
    fn set_bounds(&self, cap: &mut Capability, base: u64, top: u128) -> bool;

    /// Number of doublewords in one capability image.
    fn words(&self) -> usize {
        Self::CAP_SIZE / WORD_SIZE
    }

    /// Rewrite `cap` as the untagged pattern an operation leaves behind
    /// when its result cannot be represented: a null-derived value whose
    /// cursor is the requested address.
    fn mark_unrepresentable(&self, cap: &mut Capability, cursor: u64) {
        *cap = Capability::null();
        cap.cursor = cursor;
    }
}
