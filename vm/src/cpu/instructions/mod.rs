//! One operation per CHERI instruction.
//!
//! Each helper takes the hart plus operand register indices and
//! immediates, exactly as the translator invokes them. Helpers that can
//! trap return `Result`; raising writes the architectural side effects
//! (cause register, BadVAddr) and aborts before any destination is
//! written.

mod bounds;
mod compare;
mod flow;
mod hwr;
mod inspect;
mod loadstore;
mod modify;
mod seal;

use cheri_common::error::CapCause;
use tracing::debug;

use crate::cpu::Hart;
use crate::encoding::Codec;
use crate::error::{Exception, Result};
use crate::stats::DerivedOp;

impl<C: Codec> Hart<C> {
    /// Bookkeeping and policy when a derivation's result cannot be
    /// represented. When this returns `Ok` the caller writes back the
    /// untagged marker pattern instead of trapping.
    pub(crate) fn became_unrepresentable(&mut self, op: DerivedOp, reg: u8) -> Result<()> {
        self.stats.unrepresentable_caps += 1;
        self.stats.bounds_mut(op).unrepresentable += 1;
        debug!(?op, reg, "created unrepresentable capability");

        if self.config.debug_on_unrepresentable {
            return Err(Exception::DebugBreak);
        }
        if self.config.trap_on_unrepresentable {
            return Err(self.raise_c2(CapCause::Inexact, reg as u16));
        }
        Ok(())
    }
}
