//! Register description for the 64-bit, 16-general-register target.

use crate::isa::registers::{RegBank, RegClass, RegInfo};

/// General-purpose integer registers, in the same non-alphabetical
/// encoding order the original `6g` backend used for its operand bytes
/// (accumulator first, then the other argument-passing/scratch registers,
/// then the extended r8-r15 bank).
pub static GPR_NAMES: [&str; 16] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15",
];

/// Floating-point registers.
pub static FPR_NAMES: [&str; 16] = [
    "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9", "xmm10",
    "xmm11", "xmm12", "xmm13", "xmm14", "xmm15",
];

pub static GPR_UNITS: [u16; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
pub static FPR_UNITS: [u16; 16] = [16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31];

pub static BANKS: [RegBank; 2] = [
    RegBank { name: "int", first_unit: 0, units: 16, names: &GPR_NAMES, prefix: "r" },
    RegBank { name: "float", first_unit: 16, units: 16, names: &FPR_NAMES, prefix: "xmm" },
];

pub static GPR: RegClass = RegClass { name: "GPR", bank: 0, units: &GPR_UNITS };
pub static FPR: RegClass = RegClass { name: "FPR", bank: 1, units: &FPR_UNITS };

pub static CLASSES: [RegClass; 2] = [GPR, FPR];

pub static INFO: RegInfo = RegInfo { banks: &BANKS, classes: &CLASSES };

/// Register unit for `%rax`.
pub const RAX: u16 = 0;
/// Register unit for `%rcx`.
pub const RCX: u16 = 1;
/// Register unit for `%rdx`.
pub const RDX: u16 = 2;
/// Register unit for `%rsp`.
pub const RSP: u16 = 4;
/// Register unit for `%rbp`.
pub const RBP: u16 = 5;
/// Register unit for `%rsi`.
pub const RSI: u16 = 6;
/// Register unit for `%rdi`.
pub const RDI: u16 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_back_to_expected_offsets() {
        assert_eq!(INFO.bank_containing(RAX).unwrap().name, "int");
        assert_eq!(INFO.bank_containing(16).unwrap().name, "float");
        assert_eq!(format!("{}", INFO.display_regunit(RAX)), "%rax");
        assert_eq!(format!("{}", INFO.display_regunit(16)), "%xmm0");
    }
}
