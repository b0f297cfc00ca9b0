//! Field inspection: moving capability fields into integer registers,
//! and the cause-register and assertion-style helpers.

use cheri_common::constants::{UPERMS_COUNT, UPERMS_SHIFT};
use cheri_common::error::CapCause;

use crate::cap::Perms;
use crate::cpu::Hart;
use crate::encoding::Codec;
use crate::error::Result;
use crate::stats::DerivedOp;

impl<C: Codec> Hart<C> {
    /// CGetAddr: the cursor as a virtual address.
    pub fn get_addr(&self, cb: u8) -> u64 {
        self.capregs.read(cb).cursor
    }

    /// CGetAndAddr: the cursor masked by an integer register.
    pub fn get_and_addr(&self, cb: u8, rt: u64) -> u64 {
        self.get_addr(cb) & rt
    }

    /// CGetBase.
    pub fn get_base(&self, cb: u8) -> u64 {
        self.capregs.read(cb).base
    }

    /// CGetLen. A full address-space capability reports `u64::MAX`.
    pub fn get_len(&self, cb: u8) -> u64 {
        self.capregs.read(cb).length()
    }

    /// CGetOffset.
    pub fn get_offset(&self, cb: u8) -> u64 {
        self.capregs.read(cb).offset()
    }

    /// CGetPerm: the packed permission word.
    pub fn get_perm(&self, cb: u8) -> u64 {
        self.capregs.read(cb).perms_word()
    }

    /// CGetTag.
    pub fn get_tag(&self, cb: u8) -> u64 {
        self.capregs.read(cb).tag as u64
    }

    /// CGetSealed.
    pub fn get_sealed(&self, cb: u8) -> u64 {
        self.capregs.read(cb).is_sealed() as u64
    }

    /// CGetType: the object type, with the reserved special types
    /// sign-extended (unsealed is -1, a sentry -2).
    pub fn get_type(&self, cb: u8) -> u64 {
        self.capregs.read(cb).otype_signed() as u64
    }

    /// CGetPCC. The cursor was brought up to date by the last PC check.
    pub fn get_pcc(&mut self, cd: u8) {
        let pcc = self.capregs.pcc;
        self.write_cap(cd, pcc);
    }

    /// CGetPCCSetOffset: PCC with a new offset, subject to the same
    /// representability handling as CSetOffset.
    pub fn get_pcc_set_offset(&mut self, cd: u8, rs: u64) -> Result<()> {
        self.stats.get_pcc_set_offset.total += 1;
        let pcc = self.capregs.pcc;
        let new_cursor = pcc.base.wrapping_add(rs);
        let mut result = pcc;
        result.cursor = new_cursor;
        if !self.codec.is_representable(&pcc, new_cursor) {
            if pcc.tag {
                self.became_unrepresentable(DerivedOp::GetPccSetOffset, cd)?;
            }
            self.codec.mark_unrepresentable(&mut result, new_cursor);
        } else {
            self.stats.get_pcc_set_offset.record(&result);
        }
        self.write_cap(cd, result);
        Ok(())
    }

    /// CGetCause. Reading the cause register is privileged.
    pub fn get_cause(&mut self) -> Result<u64> {
        if !self.capregs.pcc.perms.contains(Perms::ACCESS_SYS_REGS) {
            return Err(self.raise_c2_noreg(CapCause::AccessSysRegs));
        }
        Ok(self.cap_cause as u64)
    }

    /// CSetCause.
    pub fn set_cause(&mut self, rt: u64) -> Result<()> {
        if !self.capregs.pcc.perms.contains(Perms::ACCESS_SYS_REGS) {
            return Err(self.raise_c2_noreg(CapCause::AccessSysRegs));
        }
        self.cap_cause = rt as u16;
        Ok(())
    }

    /// CCheckPerm: trap unless `cs` holds every requested permission.
    /// Bits of the argument beyond the defined permission fields are
    /// themselves a violation.
    pub fn check_perm(&mut self, cs: u8, rt: u64) -> Result<()> {
        let csp = *self.capregs.read(cs);
        let (rt_perms, rt_uperms) = Perms::unpack(rt);

        if !csp.tag {
            Err(self.raise_c2(CapCause::Tag, cs as u16))
        } else if !csp.perms.contains(rt_perms) {
            Err(self.raise_c2(CapCause::UserDefined, cs as u16))
        } else if csp.uperms & rt_uperms != rt_uperms {
            Err(self.raise_c2(CapCause::UserDefined, cs as u16))
        } else if rt >> (UPERMS_SHIFT + UPERMS_COUNT) != 0 {
            Err(self.raise_c2(CapCause::UserDefined, cs as u16))
        } else {
            Ok(())
        }
    }

    /// CCheckType: trap unless `cs` and `cb` are sealed with the same
    /// user object type.
    pub fn check_type(&mut self, cs: u8, cb: u8) -> Result<()> {
        let csp = *self.capregs.read(cs);
        let cbp = *self.capregs.read(cb);

        if !csp.tag {
            Err(self.raise_c2(CapCause::Tag, cs as u16))
        } else if !cbp.tag {
            Err(self.raise_c2(CapCause::Tag, cb as u16))
        } else if !csp.is_sealed() {
            Err(self.raise_c2(CapCause::Seal, cs as u16))
        } else if !cbp.is_sealed() {
            Err(self.raise_c2(CapCause::Seal, cb as u16))
        } else if csp.otype != cbp.otype || !csp.is_sealed_with_type() {
            Err(self.raise_c2(CapCause::Type, cs as u16))
        } else {
            Ok(())
        }
    }

    /// CSub: cursor difference.
    pub fn sub(&self, cb: u8, ct: u8) -> u64 {
        self.capregs
            .read(cb)
            .cursor
            .wrapping_sub(self.capregs.read(ct).cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::Capability;
    use crate::encoding::Compressed128;
    use crate::error::Exception;

    fn hart() -> Hart<Compressed128> {
        Hart::default()
    }

    #[test]
    fn test_getters_on_null_register() {
        let h = hart();
        assert_eq!(h.get_addr(1), 0);
        assert_eq!(h.get_base(1), 0);
        assert_eq!(h.get_len(1), u64::MAX);
        assert_eq!(h.get_tag(1), 0);
        assert_eq!(h.get_sealed(1), 0);
        assert_eq!(h.get_type(1), -1i64 as u64);
        assert_eq!(h.get_perm(1), 0);
    }

    #[test]
    fn test_getters_read_fields() {
        let mut h = hart();
        let mut c = Capability::max_perms(0x1080);
        c.base = 0x1000;
        c.top = 0x2000;
        h.capregs.write(4, c);

        assert_eq!(h.get_addr(4), 0x1080);
        assert_eq!(h.get_and_addr(4, 0xff), 0x80);
        assert_eq!(h.get_base(4), 0x1000);
        assert_eq!(h.get_len(4), 0x1000);
        assert_eq!(h.get_offset(4), 0x80);
        assert_eq!(h.get_tag(4), 1);
    }

    #[test]
    fn test_get_pcc_set_offset_in_bounds() {
        let mut h = hart();
        h.get_pcc_set_offset(3, 0x4000).unwrap();
        let c = *h.capregs.read(3);
        assert!(c.tag);
        assert_eq!(c.cursor, 0x4000);
        assert_eq!(h.stats.get_pcc_set_offset.total, 1);
    }

    #[test]
    fn test_cause_register_requires_sysregs() {
        let mut h = hart();
        h.set_cause(0x1234).unwrap();
        assert_eq!(h.get_cause().unwrap(), 0x1234);

        h.capregs.pcc.perms -= Perms::ACCESS_SYS_REGS;
        let err = h.get_cause().unwrap_err();
        assert_eq!(
            err,
            Exception::C2NoReg {
                cause: CapCause::AccessSysRegs
            }
        );
    }

    #[test]
    fn test_check_perm() {
        let mut h = hart();
        let mut c = Capability::max_perms(0);
        c.perms = Perms::LOAD | Perms::STORE;
        c.uperms = 0b0011;
        h.capregs.write(2, c);

        assert!(h.check_perm(2, Perms::LOAD.bits() as u64).is_ok());
        let err = h
            .check_perm(2, Perms::EXECUTE.bits() as u64)
            .unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::UserDefined));

        // Undefined high bits trap even when all named permissions pass
        let err = h.check_perm(2, 1 << 40).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::UserDefined));
    }

    #[test]
    fn test_check_type() {
        let mut h = hart();
        let mut a = Capability::max_perms(0);
        a.set_sealed(9);
        let mut b = Capability::max_perms(0);
        b.set_sealed(9);
        h.capregs.write(1, a);
        h.capregs.write(2, b);
        assert!(h.check_type(1, 2).is_ok());

        let mut c = Capability::max_perms(0);
        c.set_sealed(10);
        h.capregs.write(3, c);
        let err = h.check_type(1, 3).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Type));
    }

    #[test]
    fn test_sub() {
        let mut h = hart();
        let mut a = Capability::null();
        a.cursor = 0x100;
        let mut b = Capability::null();
        b.cursor = 0x300;
        h.capregs.write(1, a);
        h.capregs.write(2, b);
        assert_eq!(h.sub(2, 1), 0x200);
        assert_eq!(h.sub(1, 2), 0x200u64.wrapping_neg());
    }
}
