//! A software model of a CHERI-extended 64-bit MIPS capability
//! coprocessor.
//!
//! The crate implements the semantic engine behind every capability
//! instruction: the abstract capability value, the three memory
//! encodings, the register file, the permission/bounds/seal check
//! machinery, and the load/store path that carries capabilities together
//! with their out-of-band tag bit. Surrounding CPU infrastructure
//! (translation, TLB, devices, main loop) is a collaborator reached
//! through the interfaces in [`memory`] and the exceptions in [`error`].

pub mod cap;
pub mod cpu;
pub mod debugger;
pub mod encoding;
pub mod error;
pub mod memory;
pub mod stats;
