//! Call lowering: normal, deferred, and asynchronous calls; interface
//! dispatch; return-value pickup.

use crate::binemit::Addr;
use crate::context::CodeGen;
use crate::ir::node::{Node, Op};
use crate::ir::{NodeRef, SymbolRef};
use crate::result::{CodegenError, CodegenResult};

/// Which runtime entry point a call passes through.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CallMode {
    /// A direct call: push arguments, `CALL`, copy back return values.
    Normal,
    /// `defer f(...)`: push `(callee, argsize)`, call `deferproc`, test the
    /// return value for the panic-in-defer path.
    Deferred,
    /// `go f(...)`: identical to `Deferred` but through `newproc`, with no
    /// return-value test.
    Asynchronous,
}

impl CallMode {
    fn from_op(op: &Op) -> CallMode {
        match op {
            Op::DeferCall => CallMode::Deferred,
            Op::AsyncCall => CallMode::Asynchronous,
            _ => CallMode::Normal,
        }
    }
}

/// Lower a call node. `call_node` must carry `Op::Call`, `Op::DeferCall`,
/// or `Op::AsyncCall`; `args_width` is the total byte width of the
/// evaluated argument list already pushed to the outgoing argument area.
/// Returns the handle of a branch to the procedure epilogue when the panic-
/// in-defer path was taken (`CallMode::Deferred` only); the caller patches
/// it once the epilogue's address is known.
pub fn ginscall(
    cg: &mut CodeGen<'_>,
    call_node: &Node,
    callee: SymbolRef,
    args_width: u64,
    line: u32,
) -> CodegenResult<Option<crate::binemit::BranchHandle>> {
    let mode = CallMode::from_op(&call_node.op);

    match mode {
        CallMode::Normal => {
            cg.buf.emit("CALL", Addr::Symbol { symbol: callee, offset: 0 }, Addr::None, line, None);
            Ok(None)
        }
        CallMode::Deferred | CallMode::Asynchronous => {
            // Push (callee, argsize) for the runtime entry point; the
            // callee's own arguments were already pushed by the caller.
            cg.buf.emit(
                "PUSHQ",
                Addr::Symbol { symbol: callee, offset: 0 },
                Addr::None,
                line,
                None,
            );
            cg.buf.emit(
                "PUSHQ",
                Addr::Const { value: args_width as i64, width: 8 },
                Addr::None,
                line,
                None,
            );
            let entry_sym = match mode {
                CallMode::Deferred => cg.options.runtime.deferproc,
                CallMode::Asynchronous => cg.options.runtime.newproc,
                CallMode::Normal => unreachable!(),
            };
            cg.buf.emit("CALL", Addr::Symbol { symbol: entry_sym, offset: 0 }, Addr::None, line, None);
            cg.buf.emit("ADDQ", Addr::Const { value: 16, width: 8 }, Addr::None, line, None);

            if mode == CallMode::Deferred {
                // Test the return value: non-zero means a panic is
                // unwinding through this defer; jump to the epilogue.
                let acc = cg.isa.special(crate::isa::SpecialReg::Accumulator);
                cg.buf.emit(
                    "TESTQ",
                    Addr::Register { unit: acc, width: 8 },
                    Addr::Register { unit: acc, width: 8 },
                    line,
                    None,
                );
                let handle = cg.buf.gbranch("JNE", line);
                Ok(Some(handle))
            } else {
                Ok(None)
            }
        }
    }
}

/// Interface method dispatch (`cgen_callinter`). `receiver` is the
/// already-materialised interface value's address; `method_offset` is the
/// method's field offset within the table's method vector.
pub fn cgen_callinter(
    cg: &mut CodeGen<'_>,
    receiver: Addr,
    method_offset: u64,
    line: u32,
) -> CodegenResult<()> {
    let width = cg.isa.pointer_width();

    // Copy the interface's data word to offset 0 of the outgoing argument
    // area.
    let data_word = match &receiver {
        Addr::Indirect { base, offset, width: w, .. } => {
            Addr::Indirect { base: *base, index: None, offset: offset + width as i64, width: *w }
        }
        other => other.clone(),
    };
    cg.buf.emit("MOVQ", data_word, Addr::Parameter { offset: 0, width: width as u8 }, line, None);

    // Load the table pointer, then the function pointer at
    // `3*pointer_width + 8` plus the method's offset.
    let scratch = cg
        .regs
        .pick(cg.isa.gpr_class(), None)
        .ok_or(CodegenError::OutOfRegisters("GPR"))?;
    cg.regs.take(scratch);
    cg.buf.emit(
        "MOVQ",
        receiver,
        Addr::Register { unit: scratch, width: width as u8 },
        line,
        None,
    );
    let table_slot_offset = (3 * width + 8) as i64 + method_offset as i64;
    cg.buf.emit(
        "MOVQ",
        Addr::Indirect { base: scratch, index: None, offset: table_slot_offset, width: width as u8 },
        Addr::Register { unit: scratch, width: width as u8 },
        line,
        None,
    );
    cg.buf.emit(
        "CALL",
        Addr::Indirect { base: scratch, index: None, offset: 0, width: width as u8 },
        Addr::None,
        line,
        None,
    );
    cg.regs.free(scratch);
    Ok(())
}

/// Copy a call's return value out of the outgoing argument area
/// (`cgen_callret`). `result_offset` is the first output parameter's
/// offset within the output tuple; `args_width` is the size of the pushed
/// argument area preceding it.
pub fn cgen_callret(args_width: u64, result_offset: u64, width: u8) -> Addr {
    Addr::Parameter { offset: (args_width + result_offset) as i64, width }
}

/// Address-of the first output slot (`cgen_aret`): a load-effective-address
/// of the outgoing argument area at `args_width`.
pub fn cgen_aret(args_width: u64) -> Addr {
    Addr::Parameter { offset: args_width as i64, width: 0 }
}

/// Walk a call node's argument list and return the total width that will
/// occupy the outgoing argument area, given each argument's resolved
/// width in `widths`. Exists so callers don't have to re-derive the
/// argument area size from `aux` by hand.
pub fn args_width(aux: &[NodeRef], widths: &[u8]) -> u64 {
    aux.iter().zip(widths).map(|(_, w)| u64::from(*w)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Options, RuntimeSymbols};
    use crate::diag::NullSink;
    use crate::ir::entities::TypeRef;
    use crate::isa::amd64::Isa64;

    #[test]
    fn normal_call_emits_a_single_call_instruction() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let node = Node::constant(TypeRef::from_u32(0));
        let node = Node { op: Op::Call, ..node };
        ginscall(&mut cg, &node, SymbolRef::from_u32(2), 0, 1).unwrap();
        assert_eq!(cg.buf.len(), 1);
        let call = cg.buf.prog(crate::ir::entities::ProgRef::from_u32(0));
        assert_eq!(call.opcode, "CALL");
        assert_eq!(call.from, Addr::Symbol { symbol: SymbolRef::from_u32(2), offset: 0 });
    }

    #[test]
    fn deferred_call_targets_deferproc_tests_the_return_value_and_branches() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut options = Options::default();
        options.runtime = RuntimeSymbols { deferproc: SymbolRef::from_u32(9), newproc: SymbolRef::from_u32(10) };
        let mut cg = CodeGen::new(&isa, options, &mut sink);
        let node = Node::constant(TypeRef::from_u32(0));
        let node = Node { op: Op::DeferCall, ..node };
        let handle = ginscall(&mut cg, &node, SymbolRef::from_u32(2), 8, 1).unwrap();
        assert!(handle.is_some());
        let call = cg.buf.iter().find(|p| p.opcode == "CALL").expect("a CALL was emitted");
        assert_eq!(call.from, Addr::Symbol { symbol: SymbolRef::from_u32(9), offset: 0 });
        cg.buf.patch(handle.unwrap(), crate::ir::entities::ProgRef::from_u32(0));
        assert!(cg.buf.close().is_ok());
    }

    #[test]
    fn async_call_targets_newproc_and_does_not_test_the_return_value() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut options = Options::default();
        options.runtime = RuntimeSymbols { deferproc: SymbolRef::from_u32(9), newproc: SymbolRef::from_u32(10) };
        let mut cg = CodeGen::new(&isa, options, &mut sink);
        let node = Node::constant(TypeRef::from_u32(0));
        let node = Node { op: Op::AsyncCall, ..node };
        let handle = ginscall(&mut cg, &node, SymbolRef::from_u32(2), 8, 1).unwrap();
        assert!(handle.is_none());
        let call = cg.buf.iter().find(|p| p.opcode == "CALL").expect("a CALL was emitted");
        assert_eq!(call.from, Addr::Symbol { symbol: SymbolRef::from_u32(10), offset: 0 });
        assert!(cg.buf.close().is_ok());
    }
}
