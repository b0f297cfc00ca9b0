//! Architectural constants shared by the capability engine and its
//! memory representations.

/// Size in bytes of a capability in the two 128-bit memory formats.
pub const CAP_SIZE_128: usize = 16;

/// Size in bytes of a capability in the 256-bit memory format.
pub const CAP_SIZE_256: usize = 32;

/// Number of general-purpose capability registers.
pub const NUM_CAP_REGISTERS: usize = 32;

/// Number of integer general-purpose registers.
pub const NUM_REGISTERS: usize = 32;

/// Size in bytes of a doubleword, the memory primitive the engine
/// marshals capabilities through.
pub const WORD_SIZE: usize = 8;

/// Width in bits of the object-type field.
pub const OTYPE_BITS: u32 = 18;

/// Largest value the object-type field can hold.
pub const OTYPE_MAX: u32 = (1 << OTYPE_BITS) - 1;

/// Object type of an unsealed capability.
pub const OTYPE_UNSEALED: u32 = OTYPE_MAX;

/// Object type of a sealed-entry ("sentry") capability.
pub const OTYPE_SENTRY: u32 = OTYPE_MAX - 1;

/// Largest object type usable for user sealing; everything above is
/// reserved for the architecture.
pub const OTYPE_MAX_SEALED: u32 = OTYPE_MAX - 2;

/// Mask of the twelve architectural permission bits.
pub const PERMS_ALL: u32 = 0xfff;

/// Number of software-defined permission bits.
pub const UPERMS_COUNT: u32 = 4;

/// Mask of the software-defined permission bits.
pub const UPERMS_ALL: u32 = (1 << UPERMS_COUNT) - 1;

/// Bit position of the software-defined permissions within the packed
/// permission word used by CGetPerm/CAndPerm and the memory formats.
pub const UPERMS_SHIFT: u32 = 15;

/// Register-number value reported in the capability cause register when
/// the faulting capability was PCC rather than a numbered register.
pub const CAP_CAUSE_REG_PCC: u16 = 0xff;

/// Capability register that receives the unsealed data capability on a
/// successful CCall (the invoked data capability, IDC).
pub const IDC_REGISTER: u8 = 26;
