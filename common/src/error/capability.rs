use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Capability exception cause codes, as written to the capability cause
/// register when a coprocessor-2 exception is raised.
///
/// The numeric values are architectural: the low byte of the cause
/// register holds the faulting register number, the next byte holds one
/// of these codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum CapCause {
    None = 0x00,
    Length = 0x01,
    Tag = 0x02,
    Seal = 0x03,
    Type = 0x04,
    Call = 0x05,
    Return = 0x06,
    StackUnderflow = 0x07,
    UserDefined = 0x08,
    TlbNoStoreCap = 0x09,
    Inexact = 0x0a,
    Global = 0x10,
    PermExecute = 0x11,
    PermLoad = 0x12,
    PermStore = 0x13,
    PermLoadCap = 0x14,
    PermStoreCap = 0x15,
    PermStoreLocal = 0x16,
    PermSeal = 0x17,
    AccessSysRegs = 0x18,
    PermCCall = 0x19,
    AccessEpcc = 0x1a,
    AccessKdc = 0x1b,
    AccessKcc = 0x1c,
    AccessKr1c = 0x1d,
    AccessKr2c = 0x1e,
    PermUnseal = 0x1f,
}

impl CapCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapCause::None => "None",
            CapCause::Length => "Length Violation",
            CapCause::Tag => "Tag Violation",
            CapCause::Seal => "Seal Violation",
            CapCause::Type => "Type Violation",
            CapCause::Call => "Call Trap",
            CapCause::Return => "Return Trap",
            CapCause::StackUnderflow => "Underflow of Trusted System Stack",
            CapCause::UserDefined => "User-defined Permission Violation",
            CapCause::TlbNoStoreCap => "TLB prohibits Store Capability",
            CapCause::Inexact => "Bounds Cannot Be Represented Exactly",
            CapCause::Global => "Global Violation",
            CapCause::PermExecute => "Permit_Execute Violation",
            CapCause::PermLoad => "Permit_Load Violation",
            CapCause::PermStore => "Permit_Store Violation",
            CapCause::PermLoadCap => "Permit_Load_Capability Violation",
            CapCause::PermStoreCap => "Permit_Store_Capability Violation",
            CapCause::PermStoreLocal => "Permit_Store_Local_Capability Violation",
            CapCause::PermSeal => "Permit_Seal Violation",
            CapCause::AccessSysRegs => "Access_Sys_Reg Violation",
            CapCause::PermCCall => "Permit_CCall Violation",
            CapCause::AccessEpcc => "Access_EPCC Violation",
            CapCause::AccessKdc => "Access_KDC Violation",
            CapCause::AccessKcc => "Access_KCC Violation",
            CapCause::AccessKr1c => "Access_KR1C Violation",
            CapCause::AccessKr2c => "Access_KR2C Violation",
            CapCause::PermUnseal => "Permit_Unseal Violation",
        }
    }
}

impl Display for CapCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
