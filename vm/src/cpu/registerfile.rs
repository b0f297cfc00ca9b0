use std::fmt::Display;

use cheri_common::constants::NUM_CAP_REGISTERS;
use cheri_common::mips::CapHwr;

use crate::cap::Capability;

const NULL_CAP: Capability = Capability::null();

/// The named hardware capability registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapHwrs {
    pub ddc: Capability,
    pub user_tls: Capability,
    pub priv_tls: Capability,
    pub kr1c: Capability,
    pub kr2c: Capability,
    pub error_epcc: Capability,
    pub kcc: Capability,
    pub kdc: Capability,
    pub epcc: Capability,
}

impl CapHwrs {
    pub fn get(&self, hwr: CapHwr) -> &Capability {
        match hwr {
            CapHwr::Ddc => &self.ddc,
            CapHwr::UserTls => &self.user_tls,
            CapHwr::PrivTls => &self.priv_tls,
            CapHwr::Kr1c => &self.kr1c,
            CapHwr::Kr2c => &self.kr2c,
            CapHwr::ErrorEpcc => &self.error_epcc,
            CapHwr::Kcc => &self.kcc,
            CapHwr::Kdc => &self.kdc,
            CapHwr::Epcc => &self.epcc,
        }
    }

    pub fn get_mut(&mut self, hwr: CapHwr) -> &mut Capability {
        match hwr {
            CapHwr::Ddc => &mut self.ddc,
            CapHwr::UserTls => &mut self.user_tls,
            CapHwr::PrivTls => &mut self.priv_tls,
            CapHwr::Kr1c => &mut self.kr1c,
            CapHwr::Kr2c => &mut self.kr2c,
            CapHwr::ErrorEpcc => &mut self.error_epcc,
            CapHwr::Kcc => &mut self.kcc,
            CapHwr::Kdc => &mut self.kdc,
            CapHwr::Epcc => &mut self.epcc,
        }
    }
}

/// The architectural capability state of one hart: 32 general registers,
/// the named hardware registers, PCC and the staged branch target.
///
/// Register index 0 reads as the null capability through [`read`], but a
/// handful of operations (legacy loads/stores, CFromPtr/CToPtr,
/// CBuildCap) treat it as an alias of DDC and use [`read_or_ddc`]; the
/// distinction is made at the call site, never inside a shared helper.
///
/// [`read`]: CapRegisterFile::read
/// [`read_or_ddc`]: CapRegisterFile::read_or_ddc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapRegisterFile {
    regs: [Capability; NUM_CAP_REGISTERS],
    pub pcc: Capability,
    /// Capability installed into PCC by the delay-slot machinery after a
    /// taken capability branch.
    pub branch_target: Capability,
    pub hwr: CapHwrs,
}

impl Default for CapRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl CapRegisterFile {
    /// Reset state: PCC, DDC and the kernel/exception registers hold the
    /// maximally permissive capability, everything else is null.
    pub fn new() -> Self {
        let max = Capability::max_perms(0);
        CapRegisterFile {
            regs: [NULL_CAP; NUM_CAP_REGISTERS],
            pcc: max,
            branch_target: NULL_CAP,
            hwr: CapHwrs {
                ddc: max,
                user_tls: NULL_CAP,
                priv_tls: NULL_CAP,
                kr1c: NULL_CAP,
                kr2c: NULL_CAP,
                error_epcc: max,
                kcc: max,
                kdc: max,
                epcc: max,
            },
        }
    }

    /// Read a general capability register; index 0 is null.
    pub fn read(&self, reg: u8) -> &Capability {
        if reg == 0 {
            &NULL_CAP
        } else {
            &self.regs[reg as usize]
        }
    }

    /// Read a general capability register, with index 0 aliasing DDC.
    pub fn read_or_ddc(&self, reg: u8) -> &Capability {
        if reg == 0 {
            &self.hwr.ddc
        } else {
            &self.regs[reg as usize]
        }
    }

    /// Write a general capability register; index 0 is never written.
    pub fn write(&mut self, reg: u8, cap: Capability) {
        if reg != 0 {
            self.regs[reg as usize] = cap;
        }
    }

    /// Direct access for the debugger, which sees register 0 as stored.
    pub fn raw(&self, reg: u8) -> &Capability {
        &self.regs[reg as usize]
    }
}

impl Display for CapRegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn dump(f: &mut std::fmt::Formatter<'_>, name: &str, c: &Capability) -> std::fmt::Result {
            writeln!(
                f,
                "DEBUG CAP {name} t:{} s:{} perms:0x{:08x} type:0x{:016x} \
                 offset:0x{:016x} base:0x{:016x} length:0x{:016x}",
                c.tag as u8,
                c.is_sealed() as u8,
                c.perms_word(),
                c.otype_signed() as u64,
                c.offset(),
                c.base,
                c.length(),
            )
        }

        dump(f, "PCC", &self.pcc)?;
        for (i, c) in self.regs.iter().enumerate() {
            dump(f, &format!("REG {i:02}"), c)?;
        }
        dump(f, "HWREG 00 (DDC)", &self.hwr.ddc)?;
        dump(f, "HWREG 01 (CTLSU)", &self.hwr.user_tls)?;
        dump(f, "HWREG 08 (CTLSP)", &self.hwr.priv_tls)?;
        dump(f, "HWREG 22 (KR1C)", &self.hwr.kr1c)?;
        dump(f, "HWREG 23 (KR2C)", &self.hwr.kr2c)?;
        dump(f, "HWREG 28 (ErrorEPCC)", &self.hwr.error_epcc)?;
        dump(f, "HWREG 29 (KCC)", &self.hwr.kcc)?;
        dump(f, "HWREG 30 (KDC)", &self.hwr.kdc)?;
        dump(f, "HWREG 31 (EPCC)", &self.hwr.epcc)
    }
}
