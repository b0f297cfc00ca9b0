use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A MIPS integer general-purpose register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Register {
    #[default]
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
    R16 = 16,
    R17 = 17,
    R18 = 18,
    R19 = 19,
    R20 = 20,
    R21 = 21,
    R22 = 22,
    R23 = 23,
    R24 = 24,
    R25 = 25,
    R26 = 26,
    R27 = 27,
    R28 = 28,
    R29 = 29,
    R30 = 30,
    R31 = 31,
}

impl From<u8> for Register {
    fn from(value: u8) -> Self {
        match value {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            3 => Register::R3,
            4 => Register::R4,
            5 => Register::R5,
            6 => Register::R6,
            7 => Register::R7,
            8 => Register::R8,
            9 => Register::R9,
            10 => Register::R10,
            11 => Register::R11,
            12 => Register::R12,
            13 => Register::R13,
            14 => Register::R14,
            15 => Register::R15,
            16 => Register::R16,
            17 => Register::R17,
            18 => Register::R18,
            19 => Register::R19,
            20 => Register::R20,
            21 => Register::R21,
            22 => Register::R22,
            23 => Register::R23,
            24 => Register::R24,
            25 => Register::R25,
            26 => Register::R26,
            27 => Register::R27,
            28 => Register::R28,
            29 => Register::R29,
            30 => Register::R30,
            31 => Register::R31,
            _ => unreachable!(),
        }
    }
}

impl Register {
    pub fn abi_name(&self) -> &'static str {
        match self {
            Register::R0 => "zero", // Hardwired zero
            Register::R1 => "at",   // Assembler temporary
            Register::R2 => "v0",   // Return value 0
            Register::R3 => "v1",   // Return value 1
            Register::R4 => "a0",   // Function argument 0
            Register::R5 => "a1",   // Function argument 1
            Register::R6 => "a2",   // Function argument 2
            Register::R7 => "a3",   // Function argument 3
            Register::R8 => "t0",   // Temporary register 0
            Register::R9 => "t1",   // Temporary register 1
            Register::R10 => "t2",  // Temporary register 2
            Register::R11 => "t3",  // Temporary register 3
            Register::R12 => "t4",  // Temporary register 4
            Register::R13 => "t5",  // Temporary register 5
            Register::R14 => "t6",  // Temporary register 6
            Register::R15 => "t7",  // Temporary register 7
            Register::R16 => "s0",  // Saved register 0
            Register::R17 => "s1",  // Saved register 1
            Register::R18 => "s2",  // Saved register 2
            Register::R19 => "s3",  // Saved register 3
            Register::R20 => "s4",  // Saved register 4
            Register::R21 => "s5",  // Saved register 5
            Register::R22 => "s6",  // Saved register 6
            Register::R23 => "s7",  // Saved register 7
            Register::R24 => "t8",  // Temporary register 8
            Register::R25 => "t9",  // Temporary register 9
            Register::R26 => "k0",  // Kernel temporary 0
            Register::R27 => "k1",  // Kernel temporary 1
            Register::R28 => "gp",  // Global pointer
            Register::R29 => "sp",  // Stack pointer
            Register::R30 => "fp",  // Frame pointer / saved register 8
            Register::R31 => "ra",  // Return address
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abi_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_from_u8() {
        for i in 0..32 {
            let reg = Register::from(i);
            assert_eq!(reg as u8, i);
        }
    }

    #[test]
    fn test_register_abi_name() {
        let abi_names = [
            "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5",
            "t6", "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1",
            "gp", "sp", "fp", "ra",
        ];

        for i in 0..32 {
            let reg = Register::from(i);
            assert_eq!(
                reg.abi_name(),
                abi_names[i as usize],
                "Mismatch for register R{i}"
            );
        }
    }
}
