//! Target-machine descriptions.
//!
//! Per the redesign notes (`SPEC_FULL.md` §9), the 64-bit and 32-bit
//! targets share roughly 80% of the code-generation logic; the 20% that
//! differs (pointer width, register-file size, the specific register used
//! for each special purpose, the smallest hardware division width) is
//! factored into the [`TargetIsa`] trait so `crate::lower` never has a
//! target-specific `if` in it. [`amd64::Isa64`] and [`x86::Isa32`] are the
//! two concrete implementations named in the spec's scope: a 64-bit target
//! with 16 general registers and a 32-bit target with 8.

pub mod amd64;
pub mod call_conv;
pub mod registers;
pub mod x86;

pub use call_conv::CallConv;
use registers::{RegClass, RegInfo, RegUnit};

/// A hardware register reserved for one specific lowering.
///
/// The spec's "special-register save/restore protocol" (§4.1) and the
/// division/shift lowerings (§4.4, §4.5) all pin a value to one of these
/// roles before emitting a hardware instruction that only reads its
/// operand from that exact register.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SpecialReg {
    /// Holds the dividend's low half going into DIV/IDIV, and the quotient
    /// coming out.
    Accumulator,
    /// Holds the dividend's high half going into DIV/IDIV, and the
    /// remainder coming out.
    DivideHigh,
    /// Holds a variable shift count; the ISA's shift instruction only reads
    /// its count operand from this register.
    Count,
    /// The hardware stack pointer.
    StackPointer,
    /// The hardware frame pointer.
    FramePointer,
    /// Source pointer for string/block-move instructions (`REP MOVS`-style
    /// fat-object clears and copies).
    StringSrc,
    /// Destination pointer for string/block-move instructions.
    StringDst,
}

/// A description of one of the two supported machine targets.
///
/// This plays the role the source's per-file `#ifdef`s and the duplicated
/// `6g`/`8g` command sources played: one object, queried by every lowering,
/// instead of two copies of the lowering logic.
pub trait TargetIsa: Send + Sync {
    /// A short, stable name for diagnostics (`"amd64"`, `"x86"`).
    fn name(&self) -> &'static str;

    /// Size of a pointer/machine word, in bytes. 8 for the 64-bit target,
    /// 4 for the 32-bit target.
    fn pointer_width(&self) -> u64;

    /// Static register bank/class description.
    fn reg_info(&self) -> &'static RegInfo;

    /// The general-purpose integer register class.
    fn gpr_class(&self) -> RegClass;

    /// The floating-point register class.
    fn fpr_class(&self) -> RegClass;

    /// Resolve a [`SpecialReg`] to the concrete unit that plays that role
    /// on this target.
    fn special(&self, reg: SpecialReg) -> RegUnit;

    /// The narrowest integer width, in bytes, the hardware DIV/IDIV
    /// instruction operates on directly. Operands narrower than this are
    /// widened to this width before the general-divisor lowering runs
    /// (`SPEC_FULL.md` §4.4).
    fn smallest_division_width(&self) -> u64 {
        4
    }

    /// The `unmappedzero` threshold used to decide whether a slice
    /// element's width is large enough to need an explicit nil-dereference
    /// probe (`SPEC_FULL.md` §4.6, §9 open questions). Conservative by
    /// construction: the probe itself only ever reads one byte at offset 0
    /// regardless of this value.
    fn unmapped_zero_page(&self) -> u64 {
        4096
    }

    /// The calling convention procedures on this target use.
    fn default_call_conv(&self) -> CallConv {
        CallConv::StackSystemV
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_isa_basics(isa: &dyn TargetIsa, expect_width: u64) {
        assert_eq!(isa.pointer_width(), expect_width);
        // Every special register must resolve to a unit actually described
        // by the target's register info.
        for reg in [
            SpecialReg::Accumulator,
            SpecialReg::DivideHigh,
            SpecialReg::Count,
            SpecialReg::StackPointer,
            SpecialReg::FramePointer,
        ] {
            let unit = isa.special(reg);
            assert!(
                isa.reg_info().bank_containing(unit).is_some(),
                "{:?} unit {} not in any bank on {}",
                reg,
                unit,
                isa.name()
            );
        }
    }

    #[test]
    fn amd64_is_a_64_bit_16_register_target() {
        let isa = amd64::Isa64::new();
        assert_isa_basics(&isa, 8);
        assert_eq!(isa.gpr_class().units.len(), 16);
    }

    #[test]
    fn x86_is_a_32_bit_8_register_target() {
        let isa = x86::Isa32::new();
        assert_isa_basics(&isa, 4);
        assert_eq!(isa.gpr_class().units.len(), 8);
    }
}
