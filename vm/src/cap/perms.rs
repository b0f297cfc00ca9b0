use bitflags::bitflags;
use cheri_common::constants::{PERMS_ALL, UPERMS_ALL, UPERMS_SHIFT};

bitflags! {
    /// The twelve architectural permission bits of a capability.
    ///
    /// Permissions can only be reduced (never added) when one capability
    /// is derived from another.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Perms: u32 {
        const GLOBAL = 1 << 0;
        const EXECUTE = 1 << 1;
        const LOAD = 1 << 2;
        const STORE = 1 << 3;
        const LOAD_CAP = 1 << 4;
        const STORE_CAP = 1 << 5;
        const STORE_LOCAL = 1 << 6;
        const SEAL = 1 << 7;
        const CCALL = 1 << 8;
        const UNSEAL = 1 << 9;
        const ACCESS_SYS_REGS = 1 << 10;
        const RESERVED = 1 << 11;
    }
}

impl Perms {
    /// Pack architectural and software permissions into the single word
    /// exchanged with CGetPerm/CAndPerm and the memory formats.
    pub fn pack(self, uperms: u8) -> u64 {
        (self.bits() & PERMS_ALL) as u64 | ((uperms as u64 & UPERMS_ALL as u64) << UPERMS_SHIFT)
    }

    /// Split a packed permission word back into (architectural, software)
    /// permissions, discarding undefined bits.
    pub fn unpack(word: u64) -> (Perms, u8) {
        let perms = Perms::from_bits_truncate(word as u32 & PERMS_ALL);
        let uperms = ((word >> UPERMS_SHIFT) as u32 & UPERMS_ALL) as u8;
        (perms, uperms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let perms = Perms::LOAD | Perms::STORE | Perms::GLOBAL;
        let word = perms.pack(0b1010);
        assert_eq!(word & 0xfff, perms.bits() as u64);
        assert_eq!(word >> UPERMS_SHIFT, 0b1010);

        let (p, u) = Perms::unpack(word);
        assert_eq!(p, perms);
        assert_eq!(u, 0b1010);
    }

    #[test]
    fn test_unpack_discards_undefined_bits() {
        let word = (1 << 12) | (1 << 13) | (1 << 16) | (1 << 20) | Perms::LOAD.bits() as u64;
        let (p, u) = Perms::unpack(word);
        assert_eq!(p, Perms::LOAD);
        assert_eq!(u, 0b0010);
    }
}
