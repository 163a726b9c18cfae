//! Slice inline expansion.
//!
//! `slicearray`, `sliceslice`, and `sliceslice1` are recognised by name
//! and never actually called at runtime; this module is what expands them
//! in place instead. All three forms reduce to the same arithmetic once
//! their caller has named the right operands:
//!
//! - `slicearray(ptr, nel, lb, hb, width)`: `len_bound = cap_bound = nel`.
//! - `sliceslice(old, lb, hb, width)`: `len_bound = cap_bound = old.len`
//!   and `old.cap` respectively — see [`SliceInputs`].
//! - `sliceslice1(old, lb, width)`: like `sliceslice` with `hb` defaulted
//!   to `old.len` by the caller before this module ever sees it.

use crate::binemit::Addr;
use crate::context::CodeGen;
use crate::ir::SymbolRef;
use crate::result::CodegenResult;

/// The operands a slice expansion needs, already materialised by the
/// caller (`crate::lower::statement`) according to which of the three
/// recognised forms it is lowering.
#[derive(Debug, Clone)]
pub struct SliceInputs {
    /// The base pointer: the array's address, or the old slice's
    /// `array` word.
    pub array: Addr,
    /// The bound `hb` is checked against: `nel` for `slicearray`, the old
    /// slice's `len` for `sliceslice`/`sliceslice1`.
    pub len_bound: Addr,
    /// The bound the new `cap` is computed from: `nel` for `slicearray`,
    /// the old slice's `cap` for `sliceslice`/`sliceslice1`.
    pub cap_bound: Addr,
    /// Low bound.
    pub lb: Addr,
    /// High bound (already defaulted to `len_bound` by the caller for the
    /// one-bound `sliceslice1` form).
    pub hb: Addr,
    /// Element width in bytes.
    pub elem_width: u64,
}

/// Emit a bounds check asserting `a <= b`, sharing the procedure's single
/// slice-panic throw target.
///
/// The first violation in a procedure emits the actual call to
/// `panicslice` and records its `ProgRef` as the shared target; subsequent
/// checks branch to the existing target with the reversed condition.
/// Every later check reaches the same target directly: comparing the
/// operands in the opposite order and branching on the opposite relation
/// (`b < a` instead of `a > b`) reaches an already-resolved `ProgRef`
/// without needing a second forward patch.
fn check_le(cg: &mut CodeGen<'_>, a: &Addr, b: &Addr, panicslice: SymbolRef, line: u32) {
    match cg.throw.get() {
        Some(target) => {
            cg.buf.emit("CMPQ", b.clone(), a.clone(), line, None);
            let h = cg.buf.gbranch("JLT", line);
            cg.buf.patch(h, target);
        }
        None => {
            cg.buf.emit("CMPQ", a.clone(), b.clone(), line, None);
            let h = cg.buf.gbranch("JGT", line);
            let call = cg.buf.emit("CALL", Addr::Symbol { symbol: panicslice, offset: 0 }, Addr::None, line, None);
            cg.buf.patch(h, call);
            cg.throw.set(call);
        }
    }
}

/// Expand a recognised slice call inline, writing the resulting
/// `(array, len, cap)` header to `dest`.
///
/// `dest` must be wide enough for three pointer-width words; the caller is
/// expected to have addressed it as three consecutive slots (e.g. a fat
/// local or the outgoing return-value area).
pub fn lower_slice_expr(
    cg: &mut CodeGen<'_>,
    inputs: SliceInputs,
    dest: (Addr, Addr, Addr),
    panicslice: SymbolRef,
    line: u32,
) -> CodegenResult<()> {
    let pointer_width = cg.isa.pointer_width() as u8;

    check_le(cg, &inputs.lb, &inputs.hb, panicslice, line);
    check_le(cg, &inputs.hb, &inputs.len_bound, panicslice, line);

    // len = hb - lb
    let len = inputs.hb.clone();
    cg.buf.emit("SUBQ", inputs.lb.clone(), len.clone(), line, None);

    // cap = cap_bound - lb
    let cap = inputs.cap_bound.clone();
    cg.buf.emit("SUBQ", inputs.lb.clone(), cap.clone(), line, None);

    // array = array + lb * width
    let array = inputs.array.clone();
    let scaled_lb = inputs.lb.clone();
    cg.buf.emit("IMULQ", Addr::Const { value: inputs.elem_width as i64, width: pointer_width }, scaled_lb.clone(), line, None);
    cg.buf.emit("ADDQ", scaled_lb, array.clone(), line, None);

    // An element wider than the target's unmapped-zero-page threshold
    // gets an explicit nil-dereference probe: a byte load at offset 0 of
    // the (possibly nil) base pointer, which faults before the header is
    // ever written if `array` was nil and the slice is otherwise empty
    // enough that no other access would have faulted first.
    if inputs.elem_width > cg.isa.unmapped_zero_page() {
        cg.buf.emit(
            "TESTB",
            Addr::Indirect { base: array.register_unit().unwrap_or(0), index: None, offset: 0, width: 1 },
            Addr::Indirect { base: array.register_unit().unwrap_or(0), index: None, offset: 0, width: 1 },
            line,
            None,
        );
    }

    cg.buf.emit("MOVQ", array, dest.0, line, None);
    cg.buf.emit("MOVQ", len, dest.1, line, None);
    cg.buf.emit("MOVQ", cap, dest.2, line, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::diag::NullSink;
    use crate::ir::entities::SymbolRef;
    use crate::isa::amd64::{registers as amd64, Isa64};

    fn addrs() -> (Addr, Addr, Addr, Addr, Addr) {
        (
            Addr::Register { unit: amd64::RAX, width: 8 },
            Addr::Register { unit: amd64::RBX, width: 8 },
            Addr::Register { unit: amd64::RCX, width: 8 },
            Addr::Const { value: 2, width: 8 },
            Addr::Const { value: 5, width: 8 },
        )
    }

    #[test]
    fn first_bounds_violation_creates_the_shared_throw_target() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let (array, len_bound, cap_bound, lb, hb) = addrs();
        let inputs = SliceInputs { array, len_bound, cap_bound, lb, hb, elem_width: 8 };
        let dest = (
            Addr::Register { unit: amd64::RSI, width: 8 },
            Addr::Register { unit: amd64::RDI, width: 8 },
            Addr::Register { unit: amd64::R8, width: 8 },
        );
        lower_slice_expr(&mut cg, inputs, dest, SymbolRef::from_u32(9), 1).unwrap();
        assert!(cg.throw.get().is_some());
        assert!(cg.buf.iter().any(|p| p.opcode == "CALL"));
        assert!(cg.buf.close().is_ok());
    }

    #[test]
    fn a_second_slice_expr_reuses_the_existing_throw_target() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let (array, len_bound, cap_bound, lb, hb) = addrs();
        let inputs = SliceInputs { array: array.clone(), len_bound: len_bound.clone(), cap_bound: cap_bound.clone(), lb: lb.clone(), hb: hb.clone(), elem_width: 8 };
        let dest = (
            Addr::Register { unit: amd64::RSI, width: 8 },
            Addr::Register { unit: amd64::RDI, width: 8 },
            Addr::Register { unit: amd64::R8, width: 8 },
        );
        lower_slice_expr(&mut cg, inputs, dest.clone(), SymbolRef::from_u32(9), 1).unwrap();
        let calls_after_first = cg.buf.iter().filter(|p| p.opcode == "CALL").count();

        let inputs2 = SliceInputs { array, len_bound, cap_bound, lb, hb, elem_width: 8 };
        lower_slice_expr(&mut cg, inputs2, dest, SymbolRef::from_u32(9), 2).unwrap();
        let calls_after_second = cg.buf.iter().filter(|p| p.opcode == "CALL").count();
        assert_eq!(calls_after_first, calls_after_second);
        assert!(cg.buf.close().is_ok());
    }
}
