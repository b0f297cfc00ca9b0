//! Tag-aware memory.
//!
//! The engine reaches main memory through the
//! [`TagMemory`](cheri_common::memory::TagMemory) trait; the real
//! machine routes it through the TLB and device model. [`LinearMemory`]
//! is the in-crate implementation used by tests and local runs: a flat
//! little-endian byte array with one tag bit per capability-sized line,
//! side-data storage for the magic format, and a per-line load-inhibit
//! flag standing in for the TLB's capability-load-inhibit bit.

use rustc_hash::{FxHashMap, FxHashSet};

use cheri_common::error::MemoryError;
use cheri_common::memory::{Alignable, SideData, TagMemory, TagRead};

#[derive(Debug, Clone)]
pub struct LinearMemory {
    bytes: Vec<u8>,
    line_size: usize,
    tags: FxHashMap<u64, bool>,
    side: FxHashMap<u64, SideData>,
    load_inhibit: FxHashSet<u64>,
}

impl LinearMemory {
    /// A zeroed memory of `size` bytes with one tag per `line_size`
    /// bytes. `line_size` is the codec's capability size.
    pub fn new(size: usize, line_size: usize) -> Self {
        debug_assert!(line_size.count_ones() == 1);
        LinearMemory {
            bytes: vec![0; size],
            line_size,
            tags: FxHashMap::default(),
            side: FxHashMap::default(),
            load_inhibit: FxHashSet::default(),
        }
    }

    fn line_of(&self, addr: u64) -> u64 {
        addr / self.line_size as u64
    }

    fn check_range(&self, addr: u64, len: u64) -> Result<(), MemoryError> {
        match addr.checked_add(len) {
            Some(end) if end <= self.bytes.len() as u64 => Ok(()),
            _ => Err(MemoryError::UndefinedMemoryRegion(addr)),
        }
    }

    /// Mark a line as capability-load-inhibited, as a TLB entry with the
    /// inhibit bit would.
    pub fn set_load_inhibit(&mut self, addr: u64, inhibit: bool) {
        let line = self.line_of(addr);
        if inhibit {
            self.load_inhibit.insert(line);
        } else {
            self.load_inhibit.remove(&line);
        }
    }

    /// Seed memory for tests; clears the tags of every touched line the
    /// way any byte-grained store must.
    pub fn store_bytes(&mut self, addr: u64, data: &[u8]) -> Result<(), MemoryError> {
        self.check_range(addr, data.len() as u64)?;
        self.bytes[addr as usize..addr as usize + data.len()].copy_from_slice(data);
        self.tag_invalidate(addr, data.len() as u64)
    }

    pub fn load_bytes(&self, addr: u64, len: usize) -> Result<&[u8], MemoryError> {
        self.check_range(addr, len as u64)?;
        Ok(&self.bytes[addr as usize..addr as usize + len])
    }
}

impl TagMemory for LinearMemory {
    fn ldq(&mut self, addr: u64) -> Result<u64, MemoryError> {
        if addr.misalignment(8) != 0 {
            return Err(MemoryError::UnalignedMemoryRead(addr));
        }
        self.check_range(addr, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.bytes[addr as usize..addr as usize + 8]);
        Ok(u64::from_le_bytes(buf))
    }

    fn stq(&mut self, addr: u64, value: u64) -> Result<(), MemoryError> {
        if addr.misalignment(8) != 0 {
            return Err(MemoryError::UnalignedMemoryWrite(addr));
        }
        self.check_range(addr, 8)?;
        self.bytes[addr as usize..addr as usize + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn tag_read(&mut self, addr: u64) -> Result<TagRead, MemoryError> {
        self.check_range(addr, self.line_size as u64)?;
        let line = self.line_of(addr);
        Ok(TagRead {
            tag: self.tags.get(&line).copied().unwrap_or(false),
            load_inhibit: self.load_inhibit.contains(&line),
            side: self.side.get(&line).copied(),
        })
    }

    fn tag_write(
        &mut self,
        addr: u64,
        tag: bool,
        side: Option<SideData>,
    ) -> Result<(), MemoryError> {
        self.check_range(addr, self.line_size as u64)?;
        let line = self.line_of(addr);
        self.tags.insert(line, tag);
        if let Some(side) = side {
            self.side.insert(line, side);
        }
        Ok(())
    }

    fn tag_invalidate(&mut self, addr: u64, nbytes: u64) -> Result<(), MemoryError> {
        if nbytes == 0 {
            return Ok(());
        }
        self.check_range(addr, nbytes)?;
        let first = self.line_of(addr);
        let last = self.line_of(addr + nbytes - 1);
        for line in first..=last {
            self.tags.insert(line, false);
            self.side.remove(&line);
        }
        Ok(())
    }

    fn tag_read_many(&mut self, addr: u64) -> Result<u8, MemoryError> {
        debug_assert!(addr.misalignment(8 * self.line_size as u64) == 0);
        self.check_range(addr, 8 * self.line_size as u64)?;
        let first = self.line_of(addr);
        let mut tags = 0u8;
        for i in 0..8 {
            if self.tags.get(&(first + i)).copied().unwrap_or(false) {
                tags |= 1 << i;
            }
        }
        Ok(tags)
    }
}
