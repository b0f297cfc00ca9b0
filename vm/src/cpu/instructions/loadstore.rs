//! The memory access path: integer and capability loads/stores through
//! a capability register (or DDC for legacy accesses), with tag
//! propagation.
//!
//! The address helpers validate and compute effective addresses for the
//! translator's own data path; the capability load/store helpers
//! additionally marshal whole capabilities through the [`TagMemory`]
//! boundary. Tags are staged before any data doubleword is written, so
//! a fault mid-store can never leave a tag on stale bytes.

use cheri_common::error::CapCause;
use cheri_common::memory::{Alignable, MemAccessSize, TagMemory};
use tracing::trace;

use crate::cap::Perms;
use crate::cpu::Hart;
use crate::encoding::{CapImage, Codec};
use crate::error::Result;

impl<C: Codec> Hart<C> {
    /// Compute and validate a DDC-relative effective address.
    pub fn check_ddc(&mut self, perm: Perms, ddc_offset: u64, len: u32) -> Result<u64> {
        let ddc = self.capregs.hwr.ddc;
        let addr = ddc_offset.wrapping_add(ddc.cursor);
        self.check_cap(&ddc, perm, addr, 0, len)?;
        Ok(addr)
    }

    /// Legacy MIPS load relative to DDC.
    pub fn check_ddc_load(&mut self, offset: u64, len: u32) -> Result<u64> {
        self.check_ddc(Perms::LOAD, offset, len)
    }

    /// Legacy MIPS store relative to DDC.
    pub fn check_ddc_store(&mut self, offset: u64, len: u32) -> Result<u64> {
        self.check_ddc(Perms::STORE, offset, len)
    }

    /// The unaligned load-right family: the low bits select how many
    /// bytes are touched, the access itself is checked at the aligned
    /// address.
    pub fn check_ddc_load_right(&mut self, offset: u64, len: u32) -> Result<u64> {
        let low_bits = offset & (len as u64 - 1);
        let loaded_bytes = low_bits as u32 + 1;
        let read_offset = offset & !(len as u64 - 1);
        Ok(self.check_ddc(Perms::LOAD, read_offset, loaded_bytes)? + low_bits)
    }

    /// The unaligned store-right family.
    pub fn check_ddc_store_right(&mut self, offset: u64, len: u32) -> Result<u64> {
        let low_bits = offset & (len as u64 - 1);
        let stored_bytes = low_bits as u32 + 1;
        let write_offset = offset & !(len as u64 - 1);
        Ok(self.check_ddc(Perms::STORE, write_offset, stored_bytes)? + low_bits)
    }

    /// CL[BHWD]: integer load through a capability, register 0 aliasing
    /// DDC. Returns the effective address for the host's data path.
    pub fn load_addr(&mut self, cb: u8, rt: u64, offset: i32, size: MemAccessSize) -> Result<u64> {
        let cbp = *self.capregs.read_or_ddc(cb);

        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if !cbp.perms.contains(Perms::LOAD) {
            return Err(self.raise_c2(CapCause::PermLoad, cb as u16));
        }

        let addr = cbp
            .cursor
            .wrapping_add(rt)
            .wrapping_add(offset as i64 as u64);
        if !cbp.is_in_bounds(addr, size.in_bytes()) {
            self.cp0.badvaddr = addr;
            return Err(self.raise_c2(CapCause::Length, cb as u16));
        }
        if addr.misalignment(size.in_bytes()) != 0 {
            if self.config.allow_unaligned {
                trace!(addr, size = size.in_bytes(), "allowing unaligned load");
                return Ok(addr);
            }
            return Err(self.raise_address_error(addr, false));
        }

        self.warn_on_type_mismatch(&cbp, cb as u16);
        Ok(addr)
    }

    /// CS[BHWD]: integer store through a capability.
    pub fn store_addr(&mut self, cb: u8, rt: u64, offset: i32, size: MemAccessSize) -> Result<u64> {
        let cbp = *self.capregs.read_or_ddc(cb);

        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if !cbp.perms.contains(Perms::STORE) {
            return Err(self.raise_c2(CapCause::PermStore, cb as u16));
        }

        let addr = cbp
            .cursor
            .wrapping_add(rt)
            .wrapping_add(offset as i64 as u64);
        if !cbp.is_in_bounds(addr, size.in_bytes()) {
            self.cp0.badvaddr = addr;
            return Err(self.raise_c2(CapCause::Length, cb as u16));
        }
        if addr.misalignment(size.in_bytes()) != 0 {
            if self.config.allow_unaligned {
                trace!(addr, size = size.in_bytes(), "allowing unaligned store");
                return Ok(addr);
            }
            return Err(self.raise_address_error(addr, true));
        }

        self.warn_on_type_mismatch(&cbp, cb as u16);
        Ok(addr)
    }

    /// CLL[BHWD]: load linked. The access is taken at the cursor and
    /// arms the link register.
    pub fn load_linked_addr(&mut self, cb: u8, size: MemAccessSize) -> Result<u64> {
        let cbp = *self.capregs.read_or_ddc(cb);
        let addr = cbp.cursor;

        self.linked = false;
        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if !cbp.perms.contains(Perms::LOAD) {
            return Err(self.raise_c2(CapCause::PermLoad, cb as u16));
        }
        if !cbp.is_in_bounds(addr, size.in_bytes()) {
            self.cp0.badvaddr = addr;
            return Err(self.raise_c2(CapCause::Length, cb as u16));
        }
        if addr.misalignment(size.in_bytes()) != 0 {
            return Err(self.raise_address_error(addr, false));
        }

        self.linked = true;
        self.link_addr = addr;
        Ok(addr)
    }

    /// CSC[BHWD]: store conditional. Validation only; the translator
    /// consults the link state for the store itself.
    pub fn store_cond_addr(&mut self, cb: u8, size: MemAccessSize) -> Result<u64> {
        let cbp = *self.capregs.read_or_ddc(cb);
        let addr = cbp.cursor;

        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if !cbp.perms.contains(Perms::STORE) {
            return Err(self.raise_c2(CapCause::PermStore, cb as u16));
        }
        if !cbp.is_in_bounds(addr, size.in_bytes()) {
            self.cp0.badvaddr = addr;
            return Err(self.raise_c2(CapCause::Length, cb as u16));
        }
        if addr.misalignment(size.in_bytes()) != 0 {
            return Err(self.raise_address_error(addr, true));
        }
        Ok(addr)
    }

    /// The address and permission checks of CLC.
    pub fn cap_load_addr(&mut self, cb: u8, rt: u64, offset: i32) -> Result<u64> {
        let cursor = self.capregs.read_or_ddc(cb).cursor;
        let addr = cursor.wrapping_add(rt).wrapping_add(offset as i64 as u64);
        self.cap_load_addr_at(cb, addr)
    }

    /// The address and permission checks of CSC, including the
    /// store-local restriction on the capability being stored.
    pub fn cap_store_addr(&mut self, cs: u8, cb: u8, rt: u64, offset: i32) -> Result<u64> {
        let cbp = *self.capregs.read_or_ddc(cb);
        let csp = *self.capregs.read(cs);

        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if !cbp.perms.contains(Perms::STORE) {
            return Err(self.raise_c2(CapCause::PermStore, cb as u16));
        }
        if !cbp.perms.contains(Perms::STORE_CAP) {
            return Err(self.raise_c2(CapCause::PermStoreCap, cb as u16));
        }
        if !cbp.perms.contains(Perms::STORE_LOCAL)
            && csp.tag
            && !csp.perms.contains(Perms::GLOBAL)
        {
            return Err(self.raise_c2(CapCause::PermStoreLocal, cb as u16));
        }

        let addr = cbp
            .cursor
            .wrapping_add(rt)
            .wrapping_add(offset as i64 as u64);
        if !cbp.is_in_bounds(addr, C::CAP_SIZE as u64) {
            self.cp0.badvaddr = addr;
            return Err(self.raise_c2(CapCause::Length, cb as u16));
        }
        if addr.misalignment(C::CAP_SIZE as u64) != 0 {
            return Err(self.raise_address_error(addr, true));
        }
        Ok(addr)
    }

    /// The address and permission checks of CLLC.
    fn cap_load_linked_addr(&mut self, cb: u8) -> Result<u64> {
        let cursor = self.capregs.read_or_ddc(cb).cursor;
        self.linked = false;
        let addr = self.cap_load_addr_at(cb, cursor)?;
        Ok(addr)
    }

    fn cap_load_addr_at(&mut self, cb: u8, addr: u64) -> Result<u64> {
        let cbp = *self.capregs.read_or_ddc(cb);
        // Missing LOAD_CAP does not fault here: the loaded tag is
        // dropped instead.
        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if !cbp.perms.contains(Perms::LOAD) {
            return Err(self.raise_c2(CapCause::PermLoad, cb as u16));
        }
        if !cbp.is_in_bounds(addr, C::CAP_SIZE as u64) {
            self.cp0.badvaddr = addr;
            return Err(self.raise_c2(CapCause::Length, cb as u16));
        }
        if addr.misalignment(C::CAP_SIZE as u64) != 0 {
            return Err(self.raise_address_error(addr, false));
        }
        Ok(addr)
    }

    /// CLC: load a capability from memory.
    pub fn load_cap(&mut self, mem: &mut impl TagMemory, cd: u8, cb: u8, rt: u64, offset: i32) -> Result<()> {
        let vaddr = self.cap_load_addr(cb, rt, offset)?;
        self.load_cap_from(mem, cd, cb, vaddr, false)
    }

    /// CLLC: load a capability and arm the link register.
    pub fn load_cap_linked(&mut self, mem: &mut impl TagMemory, cd: u8, cb: u8) -> Result<()> {
        let vaddr = self.cap_load_linked_addr(cb)?;
        self.load_cap_from(mem, cd, cb, vaddr, true)
    }

    /// CSC: store a capability to memory.
    pub fn store_cap(&mut self, mem: &mut impl TagMemory, cs: u8, cb: u8, rt: u64, offset: i32) -> Result<()> {
        let vaddr = self.cap_store_addr(cs, cb, rt, offset)?;
        self.store_cap_to(mem, cs, vaddr)
    }

    /// CSCC: store a capability if the link is still armed. Returns
    /// whether the store happened.
    pub fn store_cap_conditional(
        &mut self,
        mem: &mut impl TagMemory,
        cs: u8,
        cb: u8,
    ) -> Result<bool> {
        let vaddr = self.cap_store_addr(cs, cb, 0, 0)?;
        if !self.linked {
            return Ok(false);
        }
        self.store_cap_to(mem, cs, vaddr)?;
        Ok(true)
    }

    fn load_cap_from(
        &mut self,
        mem: &mut impl TagMemory,
        cd: u8,
        cb: u8,
        vaddr: u64,
        linked: bool,
    ) -> Result<()> {
        let cbp = *self.capregs.read_or_ddc(cb);

        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().take(self.codec.words()).enumerate() {
            *word = mem.ldq(vaddr + 8 * i as u64)?;
        }
        let read = mem.tag_read(vaddr)?;

        let mut tag = read.tag;
        if tag && (read.load_inhibit || !cbp.perms.contains(Perms::LOAD_CAP)) {
            trace!(
                vaddr,
                reason = if read.load_inhibit {
                    "load-inhibited line"
                } else {
                    "missing Permit_Load_Capability"
                },
                "clearing tag on capability load"
            );
            tag = false;
        }

        self.stats.cap_read += 1;
        if tag {
            self.stats.cap_read_tagged += 1;
        }
        if linked {
            self.linked = true;
            self.link_addr = vaddr;
        }

        let image = CapImage { words, side: read.side };
        let loaded = self.codec.decompress(&image, tag);
        trace!(vaddr, tag, cursor = loaded.cursor, "capability memory read");
        self.write_cap(cd, loaded);
        Ok(())
    }

    fn store_cap_to(&mut self, mem: &mut impl TagMemory, cs: u8, vaddr: u64) -> Result<()> {
        let csp = *self.capregs.read(cs);
        let image = self.codec.compress(&csp);

        // Take the tag-side faults before any data store
        mem.tag_write(vaddr, csp.tag, image.side)?;

        self.stats.cap_write += 1;
        if csp.tag {
            self.stats.cap_write_tagged += 1;
        }

        for (i, word) in image.words.iter().take(self.codec.words()).enumerate() {
            mem.stq(vaddr + 8 * i as u64, *word)?;
        }
        trace!(vaddr, tag = csp.tag, cursor = csp.cursor, "capability memory write");
        Ok(())
    }

    /// CLoadTags: the tag bits of eight consecutive lines, without
    /// deriving any capability.
    pub fn load_tags(&mut self, mem: &mut impl TagMemory, cb: u8) -> Result<u64> {
        let cbp = *self.capregs.read_or_ddc(cb);
        let cursor = cbp.cursor;

        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if !cbp.perms.contains(Perms::LOAD) {
            return Err(self.raise_c2(CapCause::PermLoad, cb as u16));
        }
        if !cbp.perms.contains(Perms::LOAD_CAP) {
            return Err(self.raise_c2(CapCause::PermLoadCap, cb as u16));
        }
        if cursor.misalignment(8 * C::CAP_SIZE as u64) != 0 {
            return Err(self.raise_address_error(cursor, false));
        }
        Ok(mem.tag_read_many(cursor)? as u64)
    }

    /// Clear the tags of every line an integer store touches. The
    /// translator calls this next to its own data store.
    pub fn invalidate_tags(
        &mut self,
        mem: &mut impl TagMemory,
        addr: u64,
        nbytes: u64,
    ) -> Result<()> {
        trace!(addr, nbytes, "invalidating tags for data store");
        mem.tag_invalidate(addr, nbytes)?;
        Ok(())
    }

    /// The store-left/right family never touches more than one line.
    pub fn invalidate_tags_partial(&mut self, mem: &mut impl TagMemory, addr: u64) -> Result<()> {
        self.invalidate_tags(mem, addr, 1)
    }
}
