pub mod constants;
pub mod error;
pub mod memory;
pub mod mips;
