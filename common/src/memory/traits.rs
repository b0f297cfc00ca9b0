use crate::error::MemoryError;

/// Represents the size of an integer memory access. The enum value is the
/// alignment mask for that size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccessSize {
    Byte = 0,
    HalfWord = 1,
    Word = 3,
    DoubleWord = 7,
}

impl MemAccessSize {
    pub fn in_bytes(self) -> u64 {
        self as u64 + 1
    }
}

/// Out-of-band data carried next to the tag bit by the magic 128-bit
/// capability format: the packed (otype, permissions, seal bit) word and
/// the complemented length word.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SideData {
    pub tps: u64,
    pub length: u64,
}

/// Result of reading the tag of a capability-sized memory line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TagRead {
    /// The tag bit itself.
    pub tag: bool,
    /// Whether the TLB entry covering the line inhibits capability loads;
    /// a set tag must be dropped when this is set.
    pub load_inhibit: bool,
    /// Out-of-band data, if this memory carries any (magic 128 format).
    pub side: Option<SideData>,
}

/// Interface to main memory as the capability engine sees it: doubleword
/// data accesses plus the out-of-band tag bit per capability-sized line.
///
/// Any method may fail with a TLB fault, which aborts the in-progress
/// instruction without completing it.
pub trait TagMemory {
    /// Read one little-endian doubleword.
    fn ldq(&mut self, addr: u64) -> Result<u64, MemoryError>;

    /// Write one little-endian doubleword. Does not touch tags.
    fn stq(&mut self, addr: u64, value: u64) -> Result<(), MemoryError>;

    /// Read the tag of the line containing `addr`.
    fn tag_read(&mut self, addr: u64) -> Result<TagRead, MemoryError>;

    /// Set or clear the tag of the line containing `addr`, together with
    /// any out-of-band data the format side-carries. Takes both the data
    /// and the capability write faults before any data store does.
    fn tag_write(
        &mut self,
        addr: u64,
        tag: bool,
        side: Option<SideData>,
    ) -> Result<(), MemoryError>;

    /// Clear the tags of every line overlapping `[addr, addr + nbytes)`.
    fn tag_invalidate(&mut self, addr: u64, nbytes: u64) -> Result<(), MemoryError>;

    /// Read the tags of the eight consecutive lines starting at `addr`
    /// (which must be aligned to eight lines), packed little-endian into
    /// the low byte.
    fn tag_read_many(&mut self, addr: u64) -> Result<u8, MemoryError>;
}
