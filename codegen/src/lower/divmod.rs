//! Division and modulo lowering (`SPEC_FULL.md` §4.4).

use crate::binemit::Addr;
use crate::context::CodeGen;
use crate::divconst_magic::{magic_i32, magic_u32};
use crate::isa::SpecialReg;
use crate::result::{CodegenError, CodegenResult};

/// Which operation the caller wants out of the division lowering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DivOp {
    /// Truncating quotient.
    Quotient,
    /// Truncating remainder.
    Remainder,
}

/// A divisor, known at compile time or not, dispatching to one of the
/// three strategies the spec describes. The runtime case carries the
/// already-materialised divisor operand, since hardware DIV/IDIV reads it
/// from a register or memory location rather than from an immediate.
#[derive(Debug, Clone)]
pub enum Divisor {
    /// A literal integer constant.
    Const(i64),
    /// Not known until compile time: always takes the general DIV/IDIV
    /// path, reading the divisor from `Addr`.
    Runtime(Addr),
}

fn is_power_of_two(n: i64) -> Option<u32> {
    if n > 0 && (n as u64).is_power_of_two() {
        Some((n as u64).trailing_zeros())
    } else {
        None
    }
}

/// Lower `dividend op divisor` for a signed or unsigned integer of `width`
/// bytes, emitting into `cg.buf` and returning the operand holding the
/// result.
///
/// `dividend` must already be materialised in a register; the lowering
/// takes ownership of that register (it may reuse it for the result) and
/// returns a fresh or reused register operand for the caller to consume.
pub fn lower_divmod(
    cg: &mut CodeGen<'_>,
    op: DivOp,
    signed: bool,
    width: u8,
    dividend: Addr,
    divisor: Divisor,
    line: u32,
) -> CodegenResult<Addr> {
    match divisor {
        Divisor::Const(d) if cg.options.optimize_div => {
            lower_const_divmod(cg, op, signed, width, dividend, d, line)
        }
        Divisor::Const(d) => {
            // Optimizations disabled: fall through to the general path,
            // materialising the constant as an immediate for DIV/IDIV to
            // read.
            lower_general_divmod(cg, op, signed, width, dividend, Addr::Const { value: d, width }, line)
        }
        Divisor::Runtime(divisor) => lower_general_divmod(cg, op, signed, width, dividend, divisor, line),
    }
}

fn lower_const_divmod(
    cg: &mut CodeGen<'_>,
    op: DivOp,
    signed: bool,
    width: u8,
    dividend: Addr,
    d: i64,
    line: u32,
) -> CodegenResult<Addr> {
    if d == 0 {
        return Err(CodegenError::Invalid("division by constant zero".into()));
    }
    if d == 1 {
        return Ok(match op {
            DivOp::Quotient => dividend,
            DivOp::Remainder => Addr::Const { value: 0, width },
        });
    }
    if op == DivOp::Remainder && !signed && d == 2 {
        // `x % 2` for unsigned `x` is `x & 1`.
        cg.buf.emit("ANDQ", Addr::Const { value: 1, width }, dividend.clone(), line, None);
        return Ok(dividend);
    }

    if let Some(shift) = is_power_of_two(d.abs()) {
        if op == DivOp::Quotient {
            let shifted = lower_pow2_divmod(cg, width, dividend, shift, signed, d < 0, line)?;
            return Ok(shifted);
        }
    }

    if op == DivOp::Remainder {
        // "Modulo via division": q = x / d (already-optimised divide),
        // r = x - q*d (`SPEC_FULL.md` §4.4). Covers both the
        // non-power-of-two magic-multiplier path and the signed
        // power-of-two path, neither of which has a cheaper direct form.
        let q = lower_const_divmod(cg, DivOp::Quotient, signed, width, dividend.clone(), d, line)?;
        cg.buf.emit("IMULQ", Addr::Const { value: d, width }, q.clone(), line, None);
        cg.buf.emit("SUBQ", q, dividend.clone(), line, None);
        return Ok(dividend);
    }

    if signed {
        let m = magic_i32(d as i32);
        let original = dividend.clone();
        cg.buf.emit("IMULQ", Addr::Const { value: i64::from(m.magic), width }, dividend.clone(), line, None);
        if (d > 0 && m.magic < 0) || (d < 0 && m.magic > 0) {
            cg.buf.emit("ADDQ", original, dividend.clone(), line, None);
        }
        if m.shift > 0 {
            cg.buf.emit("SARQ", Addr::Const { value: i64::from(m.shift), width }, dividend.clone(), line, None);
        }
        // Final correction: add 1 if the shifted product is negative,
        // i.e. add its own unsigned-shifted sign bit
        // (`SPEC_FULL.md` §4.4's "subtract the sign-bit-of-numerator",
        // applied here to the already-computed quotient rather than the
        // original dividend, per Hacker's Delight figure 10-1).
        let scratch = cg.regs.pick(cg.isa.gpr_class(), None).ok_or(CodegenError::OutOfRegisters("GPR"))?;
        cg.regs.take(scratch);
        let bits = u32::from(width) * 8;
        cg.buf.emit("MOVQ", dividend.clone(), Addr::Register { unit: scratch, width }, line, None);
        cg.buf.emit(
            "SHRQ",
            Addr::Const { value: i64::from(bits - 1), width },
            Addr::Register { unit: scratch, width },
            line,
            None,
        );
        cg.buf.emit("ADDQ", Addr::Register { unit: scratch, width }, dividend.clone(), line, None);
        cg.regs.free(scratch);
        Ok(dividend)
    } else {
        let m = magic_u32(d as u32);
        cg.buf.emit("MULQ", Addr::Const { value: i64::from(m.magic), width }, dividend.clone(), line, None);
        if m.add {
            cg.buf.emit("ADDQ", dividend.clone(), dividend.clone(), line, None);
        }
        if m.shift > 0 {
            cg.buf.emit("SHRQ", Addr::Const { value: i64::from(m.shift), width }, dividend.clone(), line, None);
        }
        Ok(dividend)
    }
}

/// Quotient by a power-of-two constant: a shift, with a rounding bias for
/// signed operands and a final negate for a negative power of two
/// (`SPEC_FULL.md` §4.4).
fn lower_pow2_divmod(
    cg: &mut CodeGen<'_>,
    width: u8,
    dividend: Addr,
    shift: u32,
    signed: bool,
    negate: bool,
    line: u32,
) -> CodegenResult<Addr> {
    if signed && shift > 0 {
        // Bias before the shift so truncation rounds toward zero:
        // (x >> (w-1)) >> (w-shift), added to x. The bias is computed into
        // a scratch register so the original value survives to be added.
        let bits = u32::from(width) * 8;
        let scratch = cg.regs.pick(cg.isa.gpr_class(), None).ok_or(CodegenError::OutOfRegisters("GPR"))?;
        cg.regs.take(scratch);
        cg.buf.emit("MOVQ", dividend.clone(), Addr::Register { unit: scratch, width }, line, None);
        cg.buf.emit(
            "SARQ",
            Addr::Const { value: i64::from(bits - 1), width },
            Addr::Register { unit: scratch, width },
            line,
            None,
        );
        cg.buf.emit(
            "SHRQ",
            Addr::Const { value: i64::from(bits - shift), width },
            Addr::Register { unit: scratch, width },
            line,
            None,
        );
        cg.buf.emit("ADDQ", Addr::Register { unit: scratch, width }, dividend.clone(), line, None);
        cg.regs.free(scratch);
    }
    let opcode = if signed { "SARQ" } else { "SHRQ" };
    cg.buf.emit(opcode, Addr::Const { value: i64::from(shift), width }, dividend.clone(), line, None);
    if negate {
        cg.buf.emit("NEGQ", Addr::None, dividend.clone(), line, None);
    }
    Ok(dividend)
}

/// Hardware DIV/IDIV, with the INT_MIN / -1 guard for signed division.
///
/// The guard is a compare-compare-branch sequence: if the dividend is not
/// `INT_MIN`, or the divisor is not `-1`, control falls through to the
/// ordinary DIV/IDIV; if both match, the defined result (`INT_MIN` for
/// quotient, `0` for remainder) is produced directly and the division
/// itself is skipped, avoiding the hardware trap.
fn lower_general_divmod(
    cg: &mut CodeGen<'_>,
    op: DivOp,
    signed: bool,
    width: u8,
    dividend: Addr,
    divisor: Addr,
    line: u32,
) -> CodegenResult<Addr> {
    let acc = cg.isa.special(SpecialReg::Accumulator);
    let dh = cg.isa.special(SpecialReg::DivideHigh);
    let small = cg.isa.smallest_division_width() as u8;
    let eff_width = width.max(small);

    let mut to_normal_division = std::vec::Vec::new();
    if signed && width == eff_width {
        cg.buf.emit(
            "CMPQ",
            Addr::Const { value: int_min(eff_width), width: eff_width },
            dividend.clone(),
            line,
            None,
        );
        to_normal_division.push(cg.buf.gbranch("JNE", line));
        cg.buf.emit("CMPQ", Addr::Const { value: -1, width: eff_width }, divisor.clone(), line, None);
        to_normal_division.push(cg.buf.gbranch("JNE", line));

        let dest = match op {
            DivOp::Quotient => int_min(eff_width),
            DivOp::Remainder => 0,
        };
        cg.buf.emit(
            "MOVQ",
            Addr::Const { value: dest, width: eff_width },
            Addr::Register { unit: acc, width: eff_width },
            line,
            None,
        );
        let skip_division = cg.buf.gbranch("JMP", line);

        let normal_division = cg.buf.emit(
            if signed { "IDIVQ" } else { "DIVQ" },
            divisor,
            Addr::None,
            line,
            None,
        );
        for h in to_normal_division {
            cg.buf.patch(h, normal_division);
        }
        let after = cg.buf.emit("NOP", Addr::None, Addr::None, line, None);
        cg.buf.patch(skip_division, after);
    } else {
        cg.buf.emit(if signed { "IDIVQ" } else { "DIVQ" }, divisor, Addr::None, line, None);
    }

    Ok(match op {
        DivOp::Quotient => Addr::Register { unit: acc, width },
        DivOp::Remainder => Addr::Register { unit: dh, width },
    })
}

fn int_min(width: u8) -> i64 {
    match width {
        1 => i64::from(i8::MIN),
        2 => i64::from(i16::MIN),
        4 => i64::from(i32::MIN),
        _ => i64::MIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::diag::NullSink;
    use crate::isa::amd64::{registers as amd64, Isa64};

    fn new_cg(isa: &Isa64, sink: &mut NullSink) -> CodeGen<'_> {
        CodeGen::new(isa, Options::default(), sink)
    }

    #[test]
    fn division_by_one_is_a_pass_through() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = new_cg(&isa, &mut sink);
        let dividend = Addr::Register { unit: amd64::RAX, width: 4 };
        let result = lower_divmod(&mut cg, DivOp::Quotient, true, 4, dividend.clone(), Divisor::Const(1), 1).unwrap();
        assert_eq!(result, dividend);
        assert_eq!(cg.buf.len(), 0);
    }

    #[test]
    fn modulo_by_one_is_zero() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = new_cg(&isa, &mut sink);
        let dividend = Addr::Register { unit: amd64::RAX, width: 4 };
        let result = lower_divmod(&mut cg, DivOp::Remainder, true, 4, dividend, Divisor::Const(1), 1).unwrap();
        assert_eq!(result, Addr::Const { value: 0, width: 4 });
    }

    #[test]
    fn unsigned_modulo_by_two_is_a_mask() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = new_cg(&isa, &mut sink);
        let dividend = Addr::Register { unit: amd64::RAX, width: 4 };
        lower_divmod(&mut cg, DivOp::Remainder, false, 4, dividend, Divisor::Const(2), 1).unwrap();
        assert_eq!(cg.buf.prog(crate::ir::entities::ProgRef::from_u32(0)).opcode, "ANDQ");
    }

    #[test]
    fn power_of_two_quotient_emits_a_shift() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = new_cg(&isa, &mut sink);
        let dividend = Addr::Register { unit: amd64::RAX, width: 4 };
        lower_divmod(&mut cg, DivOp::Quotient, false, 4, dividend, Divisor::Const(8), 1).unwrap();
        assert!(cg.buf.iter().any(|p| p.opcode == "SHRQ"));
    }

    #[test]
    fn general_signed_division_guards_int_min_over_minus_one() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = new_cg(&isa, &mut sink);
        let dividend = Addr::Register { unit: amd64::RAX, width: 8 };
        let divisor = Addr::Register { unit: amd64::RCX, width: 8 };
        lower_divmod(&mut cg, DivOp::Quotient, true, 8, dividend, Divisor::Runtime(divisor), 1).unwrap();
        assert!(cg.buf.iter().any(|p| p.opcode == "CMPQ"));
        assert!(cg.buf.iter().any(|p| p.opcode == "IDIVQ"));
        assert!(cg.buf.close().is_ok());
    }
}
