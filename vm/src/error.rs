use cheri_common::error::{CapCause, MemoryError};
use thiserror::Error;

/// An architectural exception raised while executing a capability
/// instruction.
///
/// Exceptions are control transfers, not error returns: raising one
/// aborts the in-progress instruction before it writes any destination
/// register, and the CPU resumes at the exception vector. The engine
/// models this by threading `Result` through every helper; the
/// architectural side effects of the raise itself (BadVAddr, the
/// capability cause register) are applied before the `Err` is produced.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    /// Coprocessor-2 exception attributed to a capability register.
    #[error("C2 exception: {cause} (register {reg})")]
    C2 { cause: CapCause, reg: u16 },

    /// Coprocessor-2 exception with no attributable register.
    #[error("C2 exception: {cause}")]
    C2NoReg { cause: CapCause },

    /// Address error on load (coprocessor-0 AdEL).
    #[error("address error on load at 0x{addr:016x}")]
    AddressLoad { addr: u64 },

    /// Address error on store (coprocessor-0 AdES).
    #[error("address error on store at 0x{addr:016x}")]
    AddressStore { addr: u64 },

    /// Reserved instruction.
    #[error("reserved instruction")]
    ReservedInstruction,

    /// Debugger breakpoint requested by the unrepresentability policy.
    #[error("debug breakpoint")]
    DebugBreak,

    /// A memory access faulted in the collaborator (TLB miss etc.);
    /// control returns there without completing the instruction.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl Exception {
    /// The capability cause this exception carries, if it is a C2 one.
    pub fn cap_cause(&self) -> Option<CapCause> {
        match self {
            Exception::C2 { cause, .. } | Exception::C2NoReg { cause } => Some(*cause),
            _ => None,
        }
    }
}

/// Result type for every instruction helper.
pub type Result<T, E = Exception> = std::result::Result<T, E>;
