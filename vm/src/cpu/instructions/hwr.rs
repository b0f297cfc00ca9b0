//! Hardware capability register access.
//!
//! A table keyed by HWR index records what each register demands of the
//! accessor; unknown indices are reserved instructions. Read and write
//! access are currently governed identically.

use cheri_common::mips::CapHwr;
use num_traits::FromPrimitive;

use cheri_common::error::CapCause;

use crate::cap::Perms;
use crate::cpu::Hart;
use crate::encoding::Codec;
use crate::error::{Exception, Result};

struct HwrAccess {
    hwr: CapHwr,
    needs_kernel: bool,
    needs_sysregs: bool,
}

const HWR_ACCESS_TABLE: [HwrAccess; 9] = [
    HwrAccess { hwr: CapHwr::Ddc, needs_kernel: false, needs_sysregs: false },
    HwrAccess { hwr: CapHwr::UserTls, needs_kernel: false, needs_sysregs: false },
    HwrAccess { hwr: CapHwr::PrivTls, needs_kernel: false, needs_sysregs: true },
    HwrAccess { hwr: CapHwr::Kr1c, needs_kernel: true, needs_sysregs: false },
    HwrAccess { hwr: CapHwr::Kr2c, needs_kernel: true, needs_sysregs: false },
    HwrAccess { hwr: CapHwr::ErrorEpcc, needs_kernel: true, needs_sysregs: true },
    HwrAccess { hwr: CapHwr::Kcc, needs_kernel: true, needs_sysregs: true },
    HwrAccess { hwr: CapHwr::Kdc, needs_kernel: true, needs_sysregs: true },
    HwrAccess { hwr: CapHwr::Epcc, needs_kernel: true, needs_sysregs: true },
];

impl<C: Codec> Hart<C> {
    fn check_hwr_access(&mut self, index: u32) -> Result<CapHwr> {
        let Some(hwr) = u8::try_from(index).ok().and_then(CapHwr::from_u8) else {
            return Err(Exception::ReservedInstruction);
        };
        let entry = HWR_ACCESS_TABLE
            .iter()
            .find(|e| e.hwr == hwr)
            .expect("every named register has an access entry");

        let sysregs = self.capregs.pcc.perms.contains(Perms::ACCESS_SYS_REGS);
        if (entry.needs_kernel && !self.in_kernel_mode()) || (entry.needs_sysregs && !sysregs) {
            return Err(self.raise_c2(CapCause::AccessSysRegs, index as u16));
        }
        Ok(hwr)
    }

    /// CReadHwr.
    pub fn read_hwr(&mut self, cd: u8, index: u32) -> Result<()> {
        let hwr = self.check_hwr_access(index)?;
        let cap = *self.capregs.hwr.get(hwr);
        self.write_cap(cd, cap);
        Ok(())
    }

    /// CWriteHwr.
    pub fn write_hwr(&mut self, cs: u8, index: u32) -> Result<()> {
        let hwr = self.check_hwr_access(index)?;
        let cap = *self.capregs.read(cs);
        *self.capregs.hwr.get_mut(hwr) = cap;
        Ok(())
    }

    /// The EPC view the MFC0 path reads.
    pub fn read_epc(&self) -> u64 {
        self.cp0.epc
    }

    /// The ErrorEPC view the MFC0 path reads.
    pub fn read_error_epc(&self) -> u64 {
        self.cp0.error_epc
    }

    /// MTC0 to EPC: stored relative to EPCC's base. Kernel-only, and the
    /// executing PCC must carry the system-register permission.
    pub fn write_epc(&mut self, value: u64) -> Result<()> {
        if !self.in_kernel_mode() {
            return Err(Exception::ReservedInstruction);
        }
        if !self.capregs.pcc.perms.contains(Perms::ACCESS_SYS_REGS) {
            return Err(self.raise_c2(CapCause::AccessSysRegs, CapHwr::Epcc as u16));
        }
        self.cp0.epc = value.wrapping_add(self.capregs.hwr.epcc.base);
        Ok(())
    }

    /// MTC0 to ErrorEPC, relative to ErrorEPCC's base.
    pub fn write_error_epc(&mut self, value: u64) -> Result<()> {
        if !self.in_kernel_mode() {
            return Err(Exception::ReservedInstruction);
        }
        if !self.capregs.pcc.perms.contains(Perms::ACCESS_SYS_REGS) {
            return Err(self.raise_c2(CapCause::AccessSysRegs, CapHwr::ErrorEpcc as u16));
        }
        self.cp0.error_epc = value.wrapping_add(self.capregs.hwr.error_epcc.base);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::Capability;
    use crate::encoding::Compressed128;

    fn hart() -> Hart<Compressed128> {
        Hart::default()
    }

    fn user_mode(h: &mut Hart<Compressed128>) {
        h.cp0.status = 0x2 << 3;
    }

    #[test]
    fn test_ddc_and_user_tls_always_accessible() {
        let mut h = hart();
        user_mode(&mut h);
        h.capregs.pcc.perms -= Perms::ACCESS_SYS_REGS;

        h.read_hwr(1, CapHwr::Ddc as u32).unwrap();
        assert_eq!(h.capregs.read(1), &h.capregs.hwr.ddc);

        h.capregs.write(2, Capability::max_perms(0x42));
        h.write_hwr(2, CapHwr::UserTls as u32).unwrap();
        assert_eq!(h.capregs.hwr.user_tls.cursor, 0x42);
    }

    #[test]
    fn test_priv_tls_needs_sysregs_only() {
        let mut h = hart();
        user_mode(&mut h);
        h.read_hwr(1, CapHwr::PrivTls as u32).unwrap();

        h.capregs.pcc.perms -= Perms::ACCESS_SYS_REGS;
        let err = h.read_hwr(1, CapHwr::PrivTls as u32).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::AccessSysRegs));
    }

    #[test]
    fn test_kernel_scratch_needs_kernel_mode() {
        let mut h = hart();
        h.read_hwr(1, CapHwr::Kr1c as u32).unwrap();

        user_mode(&mut h);
        let err = h.read_hwr(1, CapHwr::Kr2c as u32).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::AccessSysRegs));
    }

    #[test]
    fn test_kcc_needs_kernel_and_sysregs() {
        let mut h = hart();
        h.read_hwr(1, CapHwr::Kcc as u32).unwrap();

        h.capregs.pcc.perms -= Perms::ACCESS_SYS_REGS;
        let err = h.read_hwr(1, CapHwr::Kcc as u32).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::AccessSysRegs));

        let mut h = hart();
        user_mode(&mut h);
        let err = h.read_hwr(1, CapHwr::Epcc as u32).unwrap_err();
        assert_eq!(err.cap_cause(), Some(CapCause::AccessSysRegs));
    }

    #[test]
    fn test_unknown_hwr_is_reserved() {
        let mut h = hart();
        assert_eq!(h.read_hwr(1, 2), Err(Exception::ReservedInstruction));
        assert_eq!(h.write_hwr(1, 24), Err(Exception::ReservedInstruction));
        assert_eq!(h.read_hwr(1, 400), Err(Exception::ReservedInstruction));
    }

    #[test]
    fn test_epc_writes_are_epcc_relative() {
        let mut h = hart();
        h.capregs.hwr.epcc.base = 0x1000;
        h.write_epc(0x234).unwrap();
        assert_eq!(h.read_epc(), 0x1234);

        user_mode(&mut h);
        assert_eq!(h.write_epc(0), Err(Exception::ReservedInstruction));
    }
}
