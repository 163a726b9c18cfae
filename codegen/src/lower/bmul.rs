//! Byte multiply lowering.
//!
//! Byte multiply is one of the special-case lowerings, and its
//! division-fix-up for 8-bit products is one of the few places the two
//! targets actually diverge rather than merely
//! differing in width: a one-byte `IMUL`/`MUL` on both x86 and amd64
//! widens its implicit destination to the accumulator's 16-bit half
//! (`AL * r/m8 -> AX`) rather than reusing the accumulator's full width,
//! so a one-byte product has to be narrowed back down after the multiply
//! instead of simply reading the accumulator at the requested width the
//! way every wider product can.

use crate::binemit::Addr;
use crate::context::CodeGen;
use crate::isa::SpecialReg;

/// Lower `dividend * multiplier` for an 8-bit operand width, returning the
/// narrowed product.
///
/// Wider products (2, 4, 8 bytes) need no special handling: the
/// accumulator already holds the full-width result at the requested
/// width, so callers never route them through this function.
pub fn lower_byte_multiply(cg: &mut CodeGen<'_>, signed: bool, multiplicand: Addr, multiplier: Addr, line: u32) -> Addr {
    let acc = cg.isa.special(SpecialReg::Accumulator);
    cg.buf.emit(
        "MOVB",
        multiplicand,
        Addr::Register { unit: acc, width: 1 },
        line,
        None,
    );
    let opcode = if signed { "IMULB" } else { "MULB" };
    cg.buf.emit(opcode, multiplier, Addr::Register { unit: acc, width: 1 }, line, None);
    // AX now holds the 16-bit product; the low byte is the 8-bit result
    // the caller asked for.
    Addr::Register { unit: acc, width: 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::diag::NullSink;
    use crate::isa::amd64::{registers as amd64, Isa64};

    #[test]
    fn byte_multiply_routes_through_the_accumulator() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let a = Addr::Register { unit: amd64::RCX, width: 1 };
        let b = Addr::Const { value: 3, width: 1 };
        let result = lower_byte_multiply(&mut cg, true, a, b, 1);
        assert_eq!(result, Addr::Register { unit: amd64::RAX, width: 1 });
        assert!(cg.buf.iter().any(|p| p.opcode == "IMULB"));
    }
}
