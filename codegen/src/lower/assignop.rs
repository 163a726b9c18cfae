//! Compound assignment lowering: `x op= y`.

use crate::binemit::Addr;
use crate::context::CodeGen;
use crate::regalloc::alloc::{regalloc, regfree};
use crate::ir::types::Bank;
use crate::result::CodegenResult;

/// The arithmetic or bitwise operator of a compound assignment, named the
/// way the front end's `AssignOp` mnemonic strings are (`"+"`, `"-"`, ...),
/// mapped here to the opcode each preferred form emits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssignOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
}

impl AssignOp {
    fn two_operand_opcode(self) -> &'static str {
        match self {
            AssignOp::Add => "ADDQ",
            AssignOp::Sub => "SUBQ",
            AssignOp::And => "ANDQ",
            AssignOp::Or => "ORQ",
            AssignOp::Xor => "XORQ",
        }
    }
}

/// Lower `x op= y` for an addressable `x` and a small-constant or
/// already-materialised `y`.
///
/// Preference order, per §4.7:
/// 1. `x += 1` → `INC x`, `x -= 1` → `DEC x`, when `x` is addressable.
/// 2. `x` addressable and `y` a small constant → one two-operand
///    instruction against `x`'s addressable form directly.
/// 3. Otherwise, evaluate `y` into a register first, then emit to `x`'s
///    addressable form.
///
/// If `x` is not addressable the caller must instead fall back to
/// [`lower_assignop_unaddressable`], which this function never does on its
/// own — the two paths differ in whether a temporary register is freed
/// before or after the store, and conflating them would either leak a
/// register or store to the wrong cell.
pub fn lower_assignop(cg: &mut CodeGen<'_>, op: AssignOp, x: Addr, y: RhsOperand, line: u32) -> Addr {
    if let RhsOperand::Const(1) = y {
        let mnemonic = match op {
            AssignOp::Add => "INCQ",
            AssignOp::Sub => "DECQ",
            _ => op.two_operand_opcode(),
        };
        if matches!(op, AssignOp::Add | AssignOp::Sub) {
            cg.buf.emit(mnemonic, Addr::None, x.clone(), line, None);
            return x;
        }
    }

    let rhs = match y {
        RhsOperand::Const(v) => Addr::Const { value: v, width: x.width().unwrap_or(8) },
        RhsOperand::Materialised(addr) => addr,
    };
    cg.buf.emit(op.two_operand_opcode(), rhs, x.clone(), line, None);
    x
}

/// The already-decided shape of a compound assignment's right-hand side:
/// a constant small enough to fold into the two-operand form directly, or
/// a value some earlier step has put in a register.
#[derive(Debug, Clone)]
pub enum RhsOperand {
    /// A small integer constant.
    Const(i64),
    /// An already-materialised operand (typically a register).
    Materialised(Addr),
}

/// Lower `x op= y` when neither side is addressable: evaluate `y` into a
/// temporary, compute `x op y` into a fresh register, then move the
/// result back to `x`'s (non-addressable) location via whatever store the
/// caller's `store` closure performs.
pub fn lower_assignop_unaddressable(
    cg: &mut CodeGen<'_>,
    op: AssignOp,
    x_value: Addr,
    y_value: Addr,
    bank: Bank,
    width: u8,
    mut store: impl FnMut(&mut CodeGen<'_>, Addr),
    line: u32,
) -> CodegenResult<()> {
    let result = regalloc(&mut cg.regs, cg.isa.gpr_class(), cg.isa.fpr_class(), bank, width, None)?;
    cg.buf.emit("MOVQ", x_value, result.clone(), line, None);
    cg.buf.emit(op.two_operand_opcode(), y_value, result.clone(), line, None);
    store(cg, result.clone());
    regfree(&mut cg.regs, &result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::diag::NullSink;
    use crate::isa::amd64::{registers as amd64, Isa64};

    #[test]
    fn increment_by_one_emits_inc() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let x = Addr::Automatic { offset: -8, width: 8 };
        lower_assignop(&mut cg, AssignOp::Add, x, RhsOperand::Const(1), 1);
        assert_eq!(cg.buf.len(), 1);
        assert_eq!(cg.buf.prog(crate::ir::entities::ProgRef::from_u32(0)).opcode, "INCQ");
    }

    #[test]
    fn general_constant_rhs_emits_one_two_operand_instruction() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let x = Addr::Automatic { offset: -8, width: 8 };
        lower_assignop(&mut cg, AssignOp::Xor, x, RhsOperand::Const(7), 1);
        assert_eq!(cg.buf.len(), 1);
        assert_eq!(cg.buf.prog(crate::ir::entities::ProgRef::from_u32(0)).opcode, "XORQ");
    }

    #[test]
    fn unaddressable_fallback_frees_its_scratch_register() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let before = cg.regs.snapshot();
        let x = Addr::Register { unit: amd64::RAX, width: 8 };
        let y = Addr::Const { value: 3, width: 8 };
        lower_assignop_unaddressable(&mut cg, AssignOp::Add, x, y, Bank::Int, 8, |_, _| {}, 1).unwrap();
        assert_eq!(cg.regs.snapshot(), before);
    }
}
