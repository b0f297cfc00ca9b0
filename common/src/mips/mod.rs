mod hwr;
mod register;

pub use hwr::CapHwr;
pub use register::Register;
