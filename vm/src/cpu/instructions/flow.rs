//! Control transfer: capability jumps, domain crossing, the branch
//! predicates, and the per-instruction PC checks.
//!
//! Taken jumps stage their target in `branch_target`; the delay-slot
//! machinery installs it into PCC via
//! [`commit_branch`](crate::cpu::Hart::commit_branch).

use cheri_common::constants::{CAP_CAUSE_REG_PCC, IDC_REGISTER};
use cheri_common::error::CapCause;
use cheri_common::memory::Alignable;

use crate::cap::{Capability, Perms};
use crate::cpu::Hart;
use crate::encoding::Codec;
use crate::error::Result;

/// CCall selector 0 takes the trap path into the kernel; selector 1 is
/// the direct hardware domain crossing.
const CCALL_SELECTOR_TRAP: u32 = 0;

impl<C: Codec> Hart<C> {
    /// The checks CJR and CJALR share. Returns the validated target.
    fn jump_target(&mut self, cb: u8) -> Result<Capability> {
        let cbp = *self.capregs.read(cb);
        let cursor = cbp.cursor;

        if !cbp.tag {
            Err(self.raise_c2(CapCause::Tag, cb as u16))
        } else if cbp.is_sealed_with_type() {
            // Sentries are callable; user-sealed capabilities are not
            Err(self.raise_c2(CapCause::Seal, cb as u16))
        } else if !cbp.perms.contains(Perms::EXECUTE) {
            Err(self.raise_c2(CapCause::PermExecute, cb as u16))
        } else if !cbp.perms.contains(Perms::GLOBAL) {
            Err(self.raise_c2(CapCause::Global, cb as u16))
        } else if !cbp.is_in_bounds(cursor, 4) {
            Err(self.raise_c2(CapCause::Length, cb as u16))
        } else if cursor.misalignment(4) != 0 {
            Err(self.raise_address_error(cursor, false))
        } else {
            Ok(cbp)
        }
    }

    /// CJR: jump through a capability. Returns the branch target
    /// address.
    pub fn jr(&mut self, cb: u8) -> Result<u64> {
        let mut target = self.jump_target(cb)?;
        if target.is_sealed_entry() {
            target.unseal_entry();
        }
        self.capregs.branch_target = target;
        Ok(target.cursor)
    }

    /// CJALR: jump and link. The link capability is PCC advanced past
    /// the delay slot; calling a sentry seals the link as a sentry too.
    pub fn jalr(&mut self, cd: u8, cb: u8) -> Result<u64> {
        let mut target = self.jump_target(cb)?;

        // PCC stays in bounds, so the link can never be unrepresentable
        let mut link = self.capregs.pcc;
        link.cursor = link.cursor.wrapping_add(8);
        if target.is_sealed_entry() {
            target.unseal_entry();
            link.make_sealed_entry();
        }
        self.capregs.branch_target = target;
        self.write_cap(cd, link);
        Ok(target.cursor)
    }

    fn ccall_common(&mut self, cs: u8, cb: u8, selector: u32) -> Result<u64> {
        let csp = *self.capregs.read(cs);
        let cbp = *self.capregs.read(cb);

        if !csp.tag {
            return Err(self.raise_c2(CapCause::Tag, cs as u16));
        }
        if !cbp.tag {
            return Err(self.raise_c2(CapCause::Tag, cb as u16));
        }
        if !csp.is_sealed_with_type() {
            return Err(self.raise_c2(CapCause::Seal, cs as u16));
        }
        if !cbp.is_sealed_with_type() {
            return Err(self.raise_c2(CapCause::Seal, cb as u16));
        }
        if csp.otype != cbp.otype {
            return Err(self.raise_c2(CapCause::Type, cs as u16));
        }
        if !csp.perms.contains(Perms::EXECUTE) {
            return Err(self.raise_c2(CapCause::PermExecute, cs as u16));
        }
        if cbp.perms.contains(Perms::EXECUTE) {
            return Err(self.raise_c2(CapCause::PermExecute, cb as u16));
        }
        if !csp.is_in_bounds(csp.cursor, 1) {
            return Err(self.raise_c2(CapCause::Length, cs as u16));
        }

        if selector == CCALL_SELECTOR_TRAP {
            return Err(self.raise_c2(CapCause::Call, cs as u16));
        }
        if !csp.perms.contains(Perms::CCALL) {
            return Err(self.raise_c2(CapCause::PermCCall, cs as u16));
        }
        if !cbp.perms.contains(Perms::CCALL) {
            return Err(self.raise_c2(CapCause::PermCCall, cb as u16));
        }

        let mut idc = cbp;
        idc.set_unsealed();
        self.write_cap(IDC_REGISTER, idc);

        let mut target = csp;
        target.set_unsealed();
        self.capregs.branch_target = target;
        Ok(csp.cursor)
    }

    /// CCall selector 0: validate the pair, then trap into the kernel's
    /// domain-crossing handler.
    pub fn ccall(&mut self, cs: u8, cb: u8) -> Result<()> {
        self.ccall_common(cs, cb, CCALL_SELECTOR_TRAP).map(|_| ())
    }

    /// CCall selector 1: hardware domain crossing. Unseals `cb` into
    /// IDC, stages unsealed `cs` as the branch target, and returns the
    /// target address.
    pub fn ccall_no_trap(&mut self, cs: u8, cb: u8) -> Result<u64> {
        self.ccall_common(cs, cb, 1)
    }

    /// CReturn: trap-style return from a protection domain.
    pub fn creturn(&mut self) -> Result<()> {
        Err(self.raise_c2_noreg(CapCause::Return))
    }

    /// CBEZ: true when the capability is the null sentinel.
    pub fn bez(&self, cb: u8) -> u64 {
        self.capregs.read(cb).is_null() as u64
    }

    /// CBNZ: true when the capability is not the null sentinel.
    pub fn bnz(&self, cb: u8) -> u64 {
        !self.capregs.read(cb).is_null() as u64
    }

    /// CBTS: true when the tag is set.
    pub fn bts(&self, cb: u8) -> u64 {
        self.capregs.read(cb).tag as u64
    }

    /// CBTU: true when the tag is unset.
    pub fn btu(&self, cb: u8) -> u64 {
        !self.capregs.read(cb).tag as u64
    }

    /// Runs before every instruction: counts it and validates that PCC
    /// authorises fetching `next_pc`. The offset is brought up to date
    /// first so a fault reports the right EPC.
    pub fn check_pc(&mut self, next_pc: u64) -> Result<()> {
        self.stats.icount += 1;
        if self.in_kernel_mode() {
            self.stats.icount_kernel += 1;
        } else {
            self.stats.icount_user += 1;
        }

        self.capregs.pcc.cursor = next_pc;
        let pcc = self.capregs.pcc;
        self.check_cap(&pcc, Perms::EXECUTE, next_pc, CAP_CAUSE_REG_PCC, 4)
    }

    /// Runs before control transfers: validates the branch target
    /// against PCC without advancing it.
    pub fn check_branch_target(&mut self, target: u64) -> Result<()> {
        let pcc = self.capregs.pcc;
        self.check_cap(&pcc, Perms::EXECUTE, target, CAP_CAUSE_REG_PCC, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Compressed128;
    use crate::error::Exception;

    fn hart() -> Hart<Compressed128> {
        Hart::default()
    }

    fn code_cap(cursor: u64) -> Capability {
        let mut c = Capability::max_perms(cursor);
        c.base = 0x1000;
        c.top = 0x2000;
        c
    }

    #[test]
    fn test_jr_stages_branch_target() {
        let mut h = hart();
        h.capregs.write(1, code_cap(0x1200));
        let target = h.jr(1).unwrap();
        assert_eq!(target, 0x1200);
        assert_eq!(h.capregs.branch_target, code_cap(0x1200));

        h.commit_branch();
        assert_eq!(h.capregs.pcc, code_cap(0x1200));
    }

    #[test]
    fn test_jr_sealed_traps_but_sentry_does_not() {
        let mut h = hart();
        let mut sealed = code_cap(0x1200);
        sealed.set_sealed(7);
        h.capregs.write(1, sealed);
        let err = h.jr(1).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Seal));

        let mut sentry = code_cap(0x1200);
        sentry.make_sealed_entry();
        h.capregs.write(2, sentry);
        assert_eq!(h.jr(2).unwrap(), 0x1200);
        assert!(h.capregs.branch_target.is_unsealed());
    }

    #[test]
    fn test_jr_checks_perms_global_bounds_alignment() {
        let mut h = hart();

        let mut no_exec = code_cap(0x1200);
        no_exec.perms -= Perms::EXECUTE;
        h.capregs.write(1, no_exec);
        assert_eq!(
            h.jr(1).unwrap_err().cap_cause(),
            Some(CapCause::PermExecute)
        );

        let mut local = code_cap(0x1200);
        local.perms -= Perms::GLOBAL;
        h.capregs.write(2, local);
        assert_eq!(h.jr(2).unwrap_err().cap_cause(), Some(CapCause::Global));

        h.capregs.write(3, code_cap(0x2000));
        assert_eq!(h.jr(3).unwrap_err().cap_cause(), Some(CapCause::Length));

        h.capregs.write(4, code_cap(0x1202));
        assert_eq!(
            h.jr(4).unwrap_err(),
            Exception::AddressLoad { addr: 0x1202 }
        );
    }

    #[test]
    fn test_jalr_links_past_delay_slot() {
        let mut h = hart();
        h.capregs.pcc.cursor = 0x4000;
        h.capregs.write(1, code_cap(0x1200));

        let target = h.jalr(31, 1).unwrap();
        assert_eq!(target, 0x1200);
        let link = h.capregs.read(31);
        assert_eq!(link.cursor, 0x4008);
        assert!(link.is_unsealed());
    }

    #[test]
    fn test_jalr_sentry_call_seals_the_link() {
        let mut h = hart();
        h.capregs.pcc.cursor = 0x4000;
        let mut sentry = code_cap(0x1200);
        sentry.make_sealed_entry();
        h.capregs.write(1, sentry);

        let target = h.jalr(31, 1).unwrap();
        assert_eq!(target, 0x1200);
        assert!(h.capregs.branch_target.is_unsealed());
        assert!(h.capregs.read(31).is_sealed_entry());

        h.commit_branch();
        assert!(h.capregs.pcc.is_unsealed());
        assert_eq!(h.capregs.pcc.cursor, 0x1200);
    }

    fn ccall_pair() -> (Capability, Capability) {
        let mut cs = Capability::max_perms(0x1200);
        cs.base = 0x1000;
        cs.top = 0x2000;
        cs.set_sealed(7);

        let mut cb = Capability::max_perms(0x8000);
        cb.base = 0x8000;
        cb.top = 0x9000;
        cb.perms -= Perms::EXECUTE;
        cb.set_sealed(7);
        (cs, cb)
    }

    #[test]
    fn test_ccall_no_trap_crosses_domains() {
        let mut h = hart();
        let (cs, cb) = ccall_pair();
        h.capregs.write(1, cs);
        h.capregs.write(2, cb);

        let target = h.ccall_no_trap(1, 2).unwrap();
        assert_eq!(target, 0x1200);

        let idc = h.capregs.read(IDC_REGISTER);
        assert!(idc.is_unsealed());
        assert!(idc.tag);
        assert_eq!(idc.base, 0x8000);
        assert!(h.capregs.branch_target.is_unsealed());
        assert_eq!(h.capregs.branch_target.cursor, 0x1200);
    }

    #[test]
    fn test_ccall_type_mismatch_traps() {
        let mut h = hart();
        let (cs, mut cb) = ccall_pair();
        cb.otype = 8;
        h.capregs.write(1, cs);
        h.capregs.write(2, cb);
        let err = h.ccall_no_trap(1, 2).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Type));
    }

    #[test]
    fn test_ccall_permission_split() {
        let mut h = hart();
        // cs must be executable, cb must not be
        let (mut cs, cb) = ccall_pair();
        cs.perms -= Perms::EXECUTE;
        h.capregs.write(1, cs);
        h.capregs.write(2, cb);
        assert_eq!(
            h.ccall_no_trap(1, 2).unwrap_err().cap_cause(),
            Some(CapCause::PermExecute)
        );

        let (cs, mut cb) = ccall_pair();
        cb.perms |= Perms::EXECUTE;
        h.capregs.write(1, cs);
        h.capregs.write(2, cb);
        let err = h.ccall_no_trap(1, 2).unwrap_err();
        assert_eq!(err, Exception::C2 { cause: CapCause::PermExecute, reg: 2 });
    }

    #[test]
    fn test_ccall_selector_zero_traps() {
        let mut h = hart();
        let (cs, cb) = ccall_pair();
        h.capregs.write(1, cs);
        h.capregs.write(2, cb);
        let err = h.ccall(1, 2).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Call));
    }

    #[test]
    fn test_ccall_requires_ccall_permission_on_both() {
        let mut h = hart();
        let (mut cs, cb) = ccall_pair();
        cs.perms -= Perms::CCALL;
        h.capregs.write(1, cs);
        h.capregs.write(2, cb);
        assert_eq!(
            h.ccall_no_trap(1, 2).unwrap_err(),
            Exception::C2 { cause: CapCause::PermCCall, reg: 1 }
        );

        let (cs, mut cb) = ccall_pair();
        cb.perms -= Perms::CCALL;
        h.capregs.write(1, cs);
        h.capregs.write(2, cb);
        assert_eq!(
            h.ccall_no_trap(1, 2).unwrap_err(),
            Exception::C2 { cause: CapCause::PermCCall, reg: 2 }
        );
    }

    #[test]
    fn test_creturn_is_a_return_trap() {
        let mut h = hart();
        let err = h.creturn().unwrap_err();
        assert_eq!(
            err,
            Exception::C2NoReg {
                cause: CapCause::Return
            }
        );
    }

    #[test]
    fn test_branch_predicates() {
        let mut h = hart();
        assert_eq!(h.bez(1), 1);
        assert_eq!(h.bnz(1), 0);
        assert_eq!(h.bts(1), 0);
        assert_eq!(h.btu(1), 1);

        h.capregs.write(1, Capability::max_perms(0));
        assert_eq!(h.bez(1), 0);
        assert_eq!(h.bnz(1), 1);
        assert_eq!(h.bts(1), 1);
        assert_eq!(h.btu(1), 0);

        // An untagged value with a non-zero offset is not null
        let mut c = Capability::null();
        c.cursor = 4;
        h.capregs.write(2, c);
        assert_eq!(h.bez(2), 0);
        assert_eq!(h.bnz(2), 1);
    }

    #[test]
    fn test_check_pc_counts_and_checks() {
        let mut h = hart();
        h.check_pc(0x4000).unwrap();
        assert_eq!(h.capregs.pcc.cursor, 0x4000);
        assert_eq!(h.stats.icount, 1);
        assert_eq!(h.stats.icount_kernel, 1);

        h.capregs.pcc.base = 0x4000;
        h.capregs.pcc.top = 0x5000;
        let err = h.check_pc(0x5000).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Length));
        assert_eq!(h.cap_cause, (CapCause::Length as u16) << 8 | 0xff);
    }

    #[test]
    fn test_check_branch_target() {
        let mut h = hart();
        h.capregs.pcc.base = 0x4000;
        h.capregs.pcc.top = 0x5000;
        h.capregs.pcc.cursor = 0x4000;
        assert!(h.check_branch_target(0x4800).is_ok());
        // The PC itself does not move
        assert_eq!(h.capregs.pcc.cursor, 0x4000);
        let err = h.check_branch_target(0x5000).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Length));
    }
}
