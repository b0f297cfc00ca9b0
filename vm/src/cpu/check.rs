use cheri_common::error::CapCause;
use tracing::warn;

use crate::cap::{Capability, Perms};
use crate::cpu::Hart;
use crate::encoding::Codec;
use crate::error::Result;

/// Cause code for the first missing bit of a permission requirement.
pub(crate) fn perm_violation(missing: Perms) -> CapCause {
    // Ordered like the architectural cause codes.
    const MAP: &[(Perms, CapCause)] = &[
        (Perms::EXECUTE, CapCause::PermExecute),
        (Perms::LOAD, CapCause::PermLoad),
        (Perms::STORE, CapCause::PermStore),
        (Perms::LOAD_CAP, CapCause::PermLoadCap),
        (Perms::STORE_CAP, CapCause::PermStoreCap),
        (Perms::STORE_LOCAL, CapCause::PermStoreLocal),
        (Perms::SEAL, CapCause::PermSeal),
        (Perms::ACCESS_SYS_REGS, CapCause::AccessSysRegs),
        (Perms::CCALL, CapCause::PermCCall),
        (Perms::UNSEAL, CapCause::PermUnseal),
        (Perms::GLOBAL, CapCause::Global),
    ];
    for (perm, cause) in MAP {
        if missing.contains(*perm) {
            return *cause;
        }
    }
    CapCause::UserDefined
}

impl<C: Codec> Hart<C> {
    /// Validate a capability for an access of `len` bytes at `addr`.
    ///
    /// The checks apply in strict priority order, and the first failure
    /// wins: tag, then seal, then the required permissions, then bounds.
    /// A failure writes BadVAddr and the capability cause register
    /// before raising.
    pub fn check_cap(
        &mut self,
        cap: &Capability,
        perm: Perms,
        addr: u64,
        reg: u16,
        len: u32,
    ) -> Result<()> {
        let cause = if !cap.tag {
            CapCause::Tag
        } else if cap.is_sealed() {
            CapCause::Seal
        } else if !cap.perms.contains(perm) {
            perm_violation(perm - cap.perms)
        } else if !cap.is_in_bounds(addr, len as u64) {
            CapCause::Length
        } else {
            self.warn_on_type_mismatch(cap, reg);
            return Ok(());
        };

        self.cp0.badvaddr = addr;
        Err(self.raise_c2(cause, reg))
    }

    /// Diagnostic only: flag accesses through a capability whose object
    /// type differs from PCC's. The architectural intent of this check
    /// is unsettled, so it never traps.
    pub(crate) fn warn_on_type_mismatch(&self, cap: &Capability, reg: u16) {
        if !self.config.type_check_warnings {
            return;
        }
        let pcc = &self.capregs.pcc;
        if reg != 0 && cap.otype != pcc.otype {
            warn!(
                pcc_otype = pcc.otype,
                cap_otype = cap.otype,
                reg,
                "object type of capability differs from PCC"
            );
        }
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

    fn mem_cap() -> Capability {
        let mut c = Capability::max_perms(0x1000);
        c.base = 0x1000;
        c.top = 0x2000;
        c
    }

    #[test]
    fn test_check_passes() {
        let mut h = hart();
        let c = mem_cap();
        assert_eq!(h.check_cap(&c, Perms::LOAD, 0x1800, 3, 8), Ok(()));
    }

    #[test]
    fn test_tag_fails_first() {
        let mut h = hart();
        let mut c = mem_cap();
        c.tag = false;
        c.set_sealed(7);
        c.perms = Perms::empty();
        let err = h.check_cap(&c, Perms::LOAD, 0x9000, 3, 8).unwrap_err();
        assert_eq!(err, Exception::C2 { cause: CapCause::Tag, reg: 3 });
        assert_eq!(h.cp0.badvaddr, 0x9000);
        assert_eq!(h.cap_cause, (CapCause::Tag as u16) << 8 | 3);
    }

    #[test]
    fn test_seal_fails_before_perms() {
        let mut h = hart();
        let mut c = mem_cap();
        c.set_sealed(7);
        c.perms = Perms::empty();
        let err = h.check_cap(&c, Perms::LOAD, 0x9000, 3, 8).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Seal));
    }

    #[test]
    fn test_perms_fail_before_bounds() {
        let mut h = hart();
        let mut c = mem_cap();
        c.perms = Perms::LOAD | Perms::GLOBAL;
        let err = h.check_cap(&c, Perms::STORE, 0x9000, 3, 8).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::PermStore));
    }

    #[test]
    fn test_bounds_fail_last() {
        let mut h = hart();
        let c = mem_cap();
        let err = h.check_cap(&c, Perms::LOAD, 0x1ffd, 3, 8).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::Length));
        assert_eq!(h.cp0.badvaddr, 0x1ffd);
    }

    #[test]
    fn test_perm_violation_mapping() {
        assert_eq!(perm_violation(Perms::EXECUTE), CapCause::PermExecute);
        assert_eq!(perm_violation(Perms::STORE_LOCAL), CapCause::PermStoreLocal);
        assert_eq!(perm_violation(Perms::CCALL), CapCause::PermCCall);
        assert_eq!(perm_violation(Perms::UNSEAL), CapCause::PermUnseal);
        // A compound requirement reports its highest-priority bit
        assert_eq!(
            perm_violation(Perms::LOAD | Perms::LOAD_CAP),
            CapCause::PermLoad
        );
    }
}
