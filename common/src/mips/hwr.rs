use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The named hardware capability registers, keyed by their index in the
/// CReadHwr/CWriteHwr encoding space. Gaps in the numbering are reserved
/// and trap as reserved instructions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum CapHwr {
    /// Default data capability for legacy loads and stores.
    Ddc = 0,
    /// User thread-local storage capability.
    UserTls = 1,
    /// Privileged thread-local storage capability.
    PrivTls = 8,
    /// Kernel scratch capability 1.
    Kr1c = 22,
    /// Kernel scratch capability 2.
    Kr2c = 23,
    /// Exception program counter capability for error-level exceptions.
    ErrorEpcc = 28,
    /// Kernel code capability.
    Kcc = 29,
    /// Kernel data capability.
    Kdc = 30,
    /// Exception program counter capability.
    Epcc = 31,
}

impl CapHwr {
    pub fn name(&self) -> &'static str {
        match self {
            CapHwr::Ddc => "DDC",
            CapHwr::UserTls => "CTLSU",
            CapHwr::PrivTls => "CTLSP",
            CapHwr::Kr1c => "KR1C",
            CapHwr::Kr2c => "KR2C",
            CapHwr::ErrorEpcc => "ErrorEPCC",
            CapHwr::Kcc => "KCC",
            CapHwr::Kdc => "KDC",
            CapHwr::Epcc => "EPCC",
        }
    }
}

impl Display for CapHwr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
