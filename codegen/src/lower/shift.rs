//! Shift lowering (`SPEC_FULL.md` §4.5).

use crate::binemit::Addr;
use crate::context::CodeGen;
use crate::isa::SpecialReg;
use crate::regalloc::savex::{restx, savex};
use crate::result::{CodegenError, CodegenResult};

/// Which shift instruction a lowering produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShiftOp {
    /// Logical left shift.
    Shl,
    /// Logical right shift: zero-fills from the top.
    Shr,
    /// Arithmetic right shift: sign-fills from the top.
    Sar,
}

impl ShiftOp {
    fn mnemonic(self, width: u8) -> &'static str {
        match (self, width) {
            (ShiftOp::Shl, _) => "SHLQ",
            (ShiftOp::Shr, _) => "SHRQ",
            (ShiftOp::Sar, _) => "SARQ",
        }
    }
}

/// Lower a shift by a literal count, known at compile time.
///
/// `SPEC_FULL.md` §4.5: "if the count is ≥ the operand width, the shift is
/// emitted *twice* with `width-1`; else emit one shift with the literal."
/// The double-shift-by-`width-1` form is what the hardware shift
/// instruction would do if asked to shift by the full width twice in a
/// row (the count is masked mod the operand width by the ISA, so one
/// shift of `width-1` followed by another of `width-1` drains every bit),
/// which is cheaper than materialising the true count as an immediate the
/// hardware would silently mask anyway.
pub fn lower_const_shift(cg: &mut CodeGen<'_>, op: ShiftOp, width: u8, value: Addr, count: u32, line: u32) -> Addr {
    let bits = u32::from(width) * 8;
    let mnemonic = op.mnemonic(width);
    if count >= bits {
        cg.buf.emit(mnemonic, Addr::Const { value: i64::from(bits - 1), width }, value.clone(), line, None);
        cg.buf.emit(mnemonic, Addr::Const { value: i64::from(bits - 1), width }, value.clone(), line, None);
    } else if count > 0 {
        cg.buf.emit(mnemonic, Addr::Const { value: i64::from(count), width }, value.clone(), line, None);
    }
    value
}

/// Lower a shift by a value not known until runtime.
///
/// Follows the five-step scheme of `SPEC_FULL.md` §4.5: save the
/// shift-count register if busy, materialise count and value, compare the
/// count to the operand width and saturate if it's out of range, emit the
/// shift, then restore the shift-count register.
pub fn lower_var_shift(
    cg: &mut CodeGen<'_>,
    op: ShiftOp,
    width: u8,
    value: Addr,
    count: Addr,
    dest_is_count_reg: bool,
    line: u32,
) -> CodegenResult<Addr> {
    let count_reg = cg.isa.special(SpecialReg::Count);
    let class = cg.isa.gpr_class();
    let bits = u32::from(width) * 8;

    let stack_temps = &mut cg.stack_temps;
    let displaced = savex(&mut cg.regs, class, count_reg, dest_is_count_reg, |w| *stack_temps += i64::from(w));

    // Materialise the count into the count register. The count is widened
    // to 32 bits if narrower, per §4.5; a wider count coming from the
    // 32-bit target's 64-bit shift-count operand would additionally need
    // its high word tested against zero, which `crate::isa::TargetIsa`
    // callers on Isa32 are expected to have already folded into `count`
    // before calling this lowering (the two halves are IR-level nodes,
    // not something this function can see).
    let count_width = count.width().unwrap_or(4).max(4);
    cg.buf.emit("MOVL", count, Addr::Register { unit: count_reg, width: count_width }, line, None);
    cg.regs.take_exact(count_reg);

    cg.buf.emit(
        "CMPL",
        Addr::Const { value: i64::from(bits), width: count_width },
        Addr::Register { unit: count_reg, width: count_width },
        line,
        None,
    );
    let in_range = cg.buf.gbranch("JLT", line);

    // count >= width: the result saturates. A logical shift (either
    // direction) yields zero; an arithmetic right shift yields the
    // all-sign-bits broadcast of the operand, produced here by shifting by
    // `width-1` twice exactly as `lower_const_shift` would for a literal
    // out-of-range count.
    match op {
        ShiftOp::Sar => {
            cg.buf.emit("SARQ", Addr::Const { value: i64::from(bits - 1), width }, value.clone(), line, None);
            cg.buf.emit("SARQ", Addr::Const { value: i64::from(bits - 1), width }, value.clone(), line, None);
        }
        ShiftOp::Shl | ShiftOp::Shr => {
            cg.buf.emit("MOVQ", Addr::Const { value: 0, width }, value.clone(), line, None);
        }
    }
    let skip_shift = cg.buf.gbranch("JMP", line);

    let do_shift = cg.buf.emit(op.mnemonic(width), Addr::Register { unit: count_reg, width: 1 }, value.clone(), line, None);
    cg.buf.patch(in_range, do_shift);
    let after = cg.buf.emit("NOP", Addr::None, Addr::None, line, None);
    cg.buf.patch(skip_shift, after);

    cg.regs.free(count_reg);
    restx(&mut cg.regs, count_reg, displaced);

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::diag::NullSink;
    use crate::isa::amd64::{registers as amd64, Isa64};

    #[test]
    fn literal_shift_within_width_emits_once() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let value = Addr::Register { unit: amd64::RAX, width: 4 };
        lower_const_shift(&mut cg, ShiftOp::Shl, 4, value, 3, 1);
        assert_eq!(cg.buf.len(), 1);
    }

    #[test]
    fn literal_shift_at_or_past_width_emits_twice() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let value = Addr::Register { unit: amd64::RAX, width: 4 };
        lower_const_shift(&mut cg, ShiftOp::Shr, 4, value, 35, 1);
        assert_eq!(cg.buf.len(), 2);
        assert!(cg.buf.iter().all(|p| p.opcode == "SHRQ"));
    }

    #[test]
    fn variable_shift_saturates_and_restores_the_count_register() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let before = cg.regs.snapshot();
        let value = Addr::Register { unit: amd64::RAX, width: 4 };
        let count = Addr::Register { unit: amd64::RBX, width: 4 };
        lower_var_shift(&mut cg, ShiftOp::Sar, 4, value, count, false, 1).unwrap();
        assert!(cg.buf.close().is_ok());
        assert_eq!(cg.regs.snapshot(), before);
    }
}
