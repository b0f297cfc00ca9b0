use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    // Cannot read unaligned memory
    #[error("Unaligned memory read: 0x{0:016X}")]
    UnalignedMemoryRead(u64),

    // Cannot write unaligned memory
    #[error("Unaligned memory write: 0x{0:016X}")]
    UnalignedMemoryWrite(u64),

    // Tried to access an address no memory claims
    #[error("Memory access error: Attempted to access undefined memory at 0x{0:016X}")]
    UndefinedMemoryRegion(u64),

    // The TLB had no valid translation for a load
    #[error("TLB fault on load at 0x{0:016X}")]
    TlbLoadFault(u64),

    // The TLB had no valid translation for a store
    #[error("TLB fault on store at 0x{0:016X}")]
    TlbStoreFault(u64),

    // Address calculation overflow
    #[error("Address calculation overflow")]
    AddressCalculationOverflow,
}
