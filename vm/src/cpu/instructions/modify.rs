//! In-place derivation: permission masking, tag clearing, cursor
//! arithmetic, conditional moves, pointer conversion and capability
//! rebuilding.

use cheri_common::error::CapCause;

use crate::cap::{Capability, Perms};
use crate::cpu::Hart;
use crate::encoding::Codec;
use crate::error::{Exception, Result};
use crate::stats::DerivedOp;

impl<C: Codec> Hart<C> {
    /// CAndPerm: restrict permissions. Undefined bits of the mask are
    /// ignored.
    pub fn and_perm(&mut self, cd: u8, cb: u8, rt: u64) -> Result<()> {
        let cbp = *self.capregs.read(cb);
        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }

        let (rt_perms, rt_uperms) = Perms::unpack(rt);
        let mut result = cbp;
        result.perms &= rt_perms;
        result.uperms &= rt_uperms;
        self.write_cap(cd, result);
        Ok(())
    }

    /// CClearTag. The encoded form is captured at the moment the tag is
    /// invalidated so the pattern survives a memory round trip.
    pub fn clear_tag(&mut self, cd: u8, cb: u8) {
        let cbp = *self.capregs.read(cb);
        let mut result = cbp;
        if cbp.tag {
            result.pesbt = self.codec.compress(&cbp).metadata();
            result.tag = false;
        }
        self.write_cap(cd, result);
    }

    /// Shared body of CIncOffset and the address-form derivations.
    fn inc_offset_impl(&mut self, cd: u8, cb: u8, rt: u64) -> Result<()> {
        self.stats.inc_offset.total += 1;
        let cbp = *self.capregs.read(cb);
        if cbp.tag && cbp.is_sealed() && rt != 0 {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }

        let new_cursor = cbp.cursor.wrapping_add(rt);
        let mut result = cbp;
        result.cursor = new_cursor;
        if !self.codec.is_representable(&cbp, new_cursor) {
            if cbp.tag {
                self.became_unrepresentable(DerivedOp::IncOffset, cd)?;
            }
            self.codec.mark_unrepresentable(&mut result, new_cursor);
        } else {
            self.stats.inc_offset.record(&result);
        }
        self.write_cap(cd, result);
        Ok(())
    }

    /// CIncOffset.
    pub fn inc_offset(&mut self, cd: u8, cb: u8, rt: u64) -> Result<()> {
        self.inc_offset_impl(cd, cb, rt)
    }

    /// CSetAddr: move the cursor to an absolute address.
    pub fn set_addr(&mut self, cd: u8, cb: u8, addr: u64) -> Result<()> {
        let cursor = self.capregs.read(cb).cursor;
        self.inc_offset_impl(cd, cb, addr.wrapping_sub(cursor))
    }

    /// CAndAddr: mask the cursor.
    pub fn and_addr(&mut self, cd: u8, cb: u8, rt: u64) -> Result<()> {
        let cursor = self.capregs.read(cb).cursor;
        let target = cursor & rt;
        self.inc_offset_impl(cd, cb, target.wrapping_sub(cursor))
    }

    /// CSetOffset: place the cursor at an offset from base.
    pub fn set_offset(&mut self, cd: u8, cb: u8, rt: u64) -> Result<()> {
        self.stats.set_offset.total += 1;
        let cbp = *self.capregs.read(cb);
        if cbp.tag && cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }

        let new_cursor = cbp.base.wrapping_add(rt);
        let mut result = cbp;
        result.cursor = new_cursor;
        if !self.codec.is_representable(&cbp, new_cursor) {
            if cbp.tag {
                self.became_unrepresentable(DerivedOp::SetOffset, cd)?;
            }
            self.codec.mark_unrepresentable(&mut result, new_cursor);
        } else {
            self.stats.set_offset.record(&result);
        }
        self.write_cap(cd, result);
        Ok(())
    }

    /// CMovz: move `cs` to `cd` when the integer register is zero.
    pub fn movz(&mut self, cd: u8, cs: u8, rs: u64) {
        if rs == 0 {
            let csp = *self.capregs.read(cs);
            self.write_cap(cd, csp);
        }
    }

    /// CMovn: move `cs` to `cd` when the integer register is non-zero.
    pub fn movn(&mut self, cd: u8, cs: u8, rs: u64) {
        self.movz(cd, cs, (rs == 0) as u64)
    }

    /// CFromPtr: re-derive a capability from an integer. Zero maps to
    /// the null capability; register 0 aliases DDC, matching what
    /// compilers emit for hybrid-ABI pointers.
    pub fn from_ptr(&mut self, cd: u8, cb: u8, rt: u64) -> Result<()> {
        self.stats.from_ptr.total += 1;
        let cbp = *self.capregs.read_or_ddc(cb);

        if rt == 0 {
            self.write_cap(cd, Capability::null());
            return Ok(());
        }
        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if cbp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }

        let new_cursor = cbp.base.wrapping_add(rt);
        let mut result = cbp;
        result.cursor = new_cursor;
        if !self.codec.is_representable(&cbp, new_cursor) {
            self.became_unrepresentable(DerivedOp::FromPtr, cd)?;
            self.codec.mark_unrepresentable(&mut result, new_cursor);
        } else {
            self.stats.from_ptr.record(&result);
        }
        self.write_cap(cd, result);
        Ok(())
    }

    /// CToPtr: the cursor of `cb` as an offset into `ct` (register 0
    /// aliasing DDC). An untagged `cb` or a cursor outside `ct` reads as
    /// zero; an untagged `ct` traps.
    pub fn to_ptr(&mut self, cb: u8, ct: u8) -> Result<u64> {
        let cbp = *self.capregs.read(cb);
        let ctp = *self.capregs.read_or_ddc(ct);

        if !ctp.tag {
            return Err(self.raise_c2(CapCause::Tag, ct as u16));
        }
        if !cbp.tag {
            return Ok(0);
        }
        let cursor = cbp.cursor;
        if (cursor as u128) < ctp.base as u128 || cursor as u128 > ctp.top {
            return Ok(0);
        }
        Ok(cursor.wrapping_sub(ctp.base))
    }

    /// CBuildCap: rebuild a tagged capability from the fields of an
    /// untagged pattern, authorised by `cb` (register 0 aliasing DDC).
    pub fn build_cap(&mut self, cd: u8, cb: u8, ct: u8) -> Result<()> {
        let cbp = *self.capregs.read_or_ddc(cb);
        let ctp = *self.capregs.read(ct);

        if !cbp.tag {
            Err(self.raise_c2(CapCause::Tag, cb as u16))
        } else if cbp.is_sealed() {
            Err(self.raise_c2(CapCause::Seal, cb as u16))
        } else if ctp.base < cbp.base {
            Err(self.raise_c2(CapCause::Length, cb as u16))
        } else if ctp.top > cbp.top {
            Err(self.raise_c2(CapCause::Length, cb as u16))
        } else if !cbp.perms.contains(ctp.perms) {
            Err(self.raise_c2(CapCause::UserDefined, cb as u16))
        } else if cbp.uperms & ctp.uperms != ctp.uperms {
            Err(self.raise_c2(CapCause::UserDefined, cb as u16))
        } else {
            // A temporary keeps cd == ct from clobbering the source.
            let mut result = cbp;
            result.base = ctp.base;
            result.top = ctp.top;
            result.perms = ctp.perms;
            result.uperms = ctp.uperms;
            result.cursor = ctp.cursor;
            if ctp.is_sealed_entry() {
                result.otype = cheri_common::constants::OTYPE_SENTRY;
            } else {
                result.set_unsealed();
            }
            self.write_cap(cd, result);
            Ok(())
        }
    }

    /// CCopyType: recover the object type of a sealed pattern as a
    /// cursor into `cb`; an unsealed pattern yields -1.
    pub fn copy_type(&mut self, cd: u8, cb: u8, ct: u8) -> Result<()> {
        let cbp = *self.capregs.read(cb);
        let ctp = *self.capregs.read(ct);

        if !cbp.tag {
            Err(self.raise_c2(CapCause::Tag, cb as u16))
        } else if cbp.is_sealed() {
            Err(self.raise_c2(CapCause::Seal, cb as u16))
        } else if !ctp.is_sealed_with_type() {
            let mut minus_one = Capability::null();
            minus_one.cursor = u64::MAX;
            self.write_cap(cd, minus_one);
            Ok(())
        } else if (ctp.otype as u64) < cbp.base {
            Err(self.raise_c2(CapCause::Length, cb as u16))
        } else if ctp.otype as u128 >= cbp.top {
            Err(self.raise_c2(CapCause::Length, cb as u16))
        } else {
            let mut result = cbp;
            result.cursor = ctp.otype as u64;
            self.write_cap(cd, result);
            Ok(())
        }
    }

    /// CClearRegs: null every register selected by the mask. Bit 0
    /// means DDC, since clearing it on a sandbox switch is useful and
    /// clearing the null register is not.
    pub fn clear_regs(&mut self, mask: u32) {
        if mask & 1 != 0 {
            self.capregs.hwr.ddc = Capability::null();
        }
        for reg in 1..32 {
            if mask & (1 << reg) != 0 {
                self.capregs.write(reg, Capability::null());
            }
        }
    }

    /// CIncBase was withdrawn from the architecture.
    pub fn inc_base(&mut self, _cd: u8, _cb: u8, _rt: u64) -> Result<()> {
        Err(Exception::ReservedInstruction)
    }

    /// CSetLen was withdrawn from the architecture.
    pub fn set_len(&mut self, _cd: u8, _cb: u8, _rt: u64) -> Result<()> {
        Err(Exception::ReservedInstruction)
    }
}
