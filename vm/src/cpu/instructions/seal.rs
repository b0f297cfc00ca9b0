//! Sealing and unsealing.

use cheri_common::constants::OTYPE_MAX_SEALED;
use cheri_common::error::CapCause;

use crate::cap::Perms;
use crate::cpu::Hart;
use crate::encoding::Codec;
use crate::error::Result;

impl<C: Codec> Hart<C> {
    fn seal_common(&mut self, cd: u8, cs: u8, ct: u8, conditional: bool) -> Result<()> {
        let csp = *self.capregs.read(cs);
        let ctp = *self.capregs.read(ct);
        let ct_cursor = ctp.cursor;

        if !csp.tag {
            return Err(self.raise_c2(CapCause::Tag, cs as u16));
        }
        if !ctp.tag {
            if conditional {
                self.write_cap(cd, csp);
                return Ok(());
            }
            return Err(self.raise_c2(CapCause::Tag, ct as u16));
        }
        if conditional && ct_cursor == u64::MAX {
            self.write_cap(cd, csp);
            return Ok(());
        }
        if csp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, cs as u16));
        }
        if ctp.is_sealed() {
            return Err(self.raise_c2(CapCause::Seal, ct as u16));
        }
        if !ctp.perms.contains(Perms::SEAL) {
            return Err(self.raise_c2(CapCause::PermSeal, ct as u16));
        }
        if !ctp.is_in_bounds(ct_cursor, 1) {
            return Err(self.raise_c2(CapCause::Length, ct as u16));
        }
        if ct_cursor > OTYPE_MAX_SEALED as u64 {
            return Err(self.raise_c2(CapCause::Length, ct as u16));
        }
        if !self.codec.is_representable_when_sealed(&csp, csp.cursor) {
            return Err(self.raise_c2(CapCause::Inexact, cs as u16));
        }

        let mut result = csp;
        result.set_sealed(ct_cursor as u32);
        self.write_cap(cd, result);
        Ok(())
    }

    /// CSeal: seal `cs` with the object type addressed by `ct`.
    pub fn seal(&mut self, cd: u8, cs: u8, ct: u8) -> Result<()> {
        self.seal_common(cd, cs, ct, false)
    }

    /// CCSeal: conditional seal. An untagged `ct` or a cursor of -1
    /// moves `cs` through unchanged.
    pub fn cseal(&mut self, cd: u8, cs: u8, ct: u8) -> Result<()> {
        self.seal_common(cd, cs, ct, true)
    }

    /// CSealEntry: turn an executable capability into a sentry, callable
    /// only through CJR/CJALR.
    pub fn seal_entry(&mut self, cd: u8, cs: u8) -> Result<()> {
        let csp = *self.capregs.read(cs);

        if !csp.tag {
            return Err(self.raise_c2(CapCause::Tag, cs as u16));
        }
        if !csp.is_unsealed() {
            return Err(self.raise_c2(CapCause::Seal, cs as u16));
        }
        // A non-executable sentry would be useless
        if !csp.perms.contains(Perms::EXECUTE) {
            return Err(self.raise_c2(CapCause::PermExecute, cs as u16));
        }

        let mut result = csp;
        result.make_sealed_entry();
        self.write_cap(cd, result);
        Ok(())
    }

    /// CUnseal: remove the seal of `cs` using an authorising capability
    /// whose cursor names the object type. The result is global only if
    /// both inputs are.
    pub fn unseal(&mut self, cd: u8, cs: u8, ct: u8) -> Result<()> {
        let csp = *self.capregs.read(cs);
        let ctp = *self.capregs.read(ct);
        let ct_cursor = ctp.cursor;

        if !csp.tag {
            return Err(self.raise_c2(CapCause::Tag, cs as u16));
        }
        if !ctp.tag {
            return Err(self.raise_c2(CapCause::Tag, ct as u16));
        }
        if csp.is_unsealed() {
            return Err(self.raise_c2(CapCause::Seal, cs as u16));
        }
        if !ctp.is_unsealed() {
            return Err(self.raise_c2(CapCause::Seal, ct as u16));
        }
        if ct_cursor != csp.otype as u64 || !csp.is_sealed_with_type() {
            return Err(self.raise_c2(CapCause::Type, ct as u16));
        }
        if !ctp.perms.contains(Perms::UNSEAL) {
            return Err(self.raise_c2(CapCause::PermUnseal, ct as u16));
        }
        if !ctp.is_in_bounds(ct_cursor, 1) {
            return Err(self.raise_c2(CapCause::Length, ct as u16));
        }
        if ct_cursor >= OTYPE_MAX_SEALED as u64 {
            // Unreachable given the otype comparison above
            return Err(self.raise_c2(CapCause::Length, ct as u16));
        }

        let mut result = csp;
        if csp.perms.contains(Perms::GLOBAL) && ctp.perms.contains(Perms::GLOBAL) {
            result.perms |= Perms::GLOBAL;
        } else {
            result.perms -= Perms::GLOBAL;
        }
        result.set_unsealed();
        self.write_cap(cd, result);
        Ok(())
    }
}
