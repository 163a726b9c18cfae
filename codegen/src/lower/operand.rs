//! Operand canonicalisation: `naddr`, `gins`, `gmove` (`SPEC_FULL.md` §4.1).

use crate::binemit::{Addr, InstBuffer};
use crate::context::CodeGen;
use crate::ir::node::{Class, Node, Op};
use crate::ir::types::{Bank, Kind};
use crate::ir::{Procedure, TypeRef};
use crate::result::{CodegenError, CodegenResult};

/// Project an addressable node onto an operand descriptor.
///
/// Only `Op::Name` and `Op::Const` leaves are addressable; anything else
/// must first be evaluated into a register by `crate::lower::eval_order`.
/// When `canfail` is true a non-addressable node yields `None` rather than
/// an error, letting the caller fall back to evaluating it; when false
/// (the caller has already checked `node.addable`) a non-addressable node
/// is an internal-invariant violation.
pub fn naddr(proc: &Procedure, node: &Node, canfail: bool) -> CodegenResult<Option<Addr>> {
    let width = proc.types.get(node.ty).size.min(8) as u8;
    match &node.op {
        Op::Name => {
            let symbol = node.symbol.expect("Op::Name without a symbol");
            let addr = match node.class {
                Some(Class::Auto) => Addr::Automatic { offset: node.offset, width },
                Some(Class::Param) => Addr::Parameter { offset: node.offset, width },
                Some(Class::Func) | Some(Class::Global) | None => {
                    Addr::Symbol { symbol, offset: node.offset }
                }
            };
            Ok(Some(addr))
        }
        Op::Const => Ok(Some(const_addr(proc, node, width))),
        _ if canfail => Ok(None),
        _ => Err(CodegenError::Invalid(std::format!(
            "naddr: non-addressable node {:?} with canfail=false",
            node.op
        ))),
    }
}

fn const_addr(proc: &Procedure, node: &Node, width: u8) -> Addr {
    match proc.types.get(node.ty).kind {
        Kind::Float(_) => Addr::FloatConst { bits: node.offset as u64, width },
        _ => Addr::Const { value: node.offset, width },
    }
}

/// Emit one instruction with the given operands, returning its reference.
pub fn gins(buf: &mut InstBuffer, opcode: &'static str, from: Addr, to: Addr, line: u32) -> crate::ir::entities::ProgRef {
    buf.emit(opcode, from, to, line, None)
}

/// Emit a typed move from `src` to `dst`, choosing a plain move, a
/// width-extending move, or a floating/integer conversion move based on
/// the two operands' types.
///
/// `SPEC_FULL.md` §4.1: "inserting width extension or floating-integer
/// conversion as required by the two operand types."
pub fn gmove(
    cg: &mut CodeGen<'_>,
    src: Addr,
    src_ty: TypeRef,
    dst: Addr,
    dst_ty: TypeRef,
    proc: &Procedure,
    line: u32,
) {
    let src_kind = &proc.types.get(src_ty).kind;
    let dst_kind = &proc.types.get(dst_ty).kind;
    let src_bank = proc.types.get(src_ty).bank();
    let dst_bank = proc.types.get(dst_ty).bank();

    let opcode: &'static str = match (src_bank, dst_bank) {
        (Bank::Int, Bank::Float) => "CVTSI2SD",
        (Bank::Float, Bank::Int) => "CVTTSD2SI",
        (Bank::Float, Bank::Float) => "MOVSD",
        (Bank::Int, Bank::Int) => {
            let src_w = proc.types.get(src_ty).size;
            let dst_w = proc.types.get(dst_ty).size;
            if dst_w > src_w {
                if matches!(src_kind, Kind::Uint(_)) {
                    "MOVZX"
                } else {
                    "MOVSX"
                }
            } else {
                "MOV"
            }
        }
    };
    let _ = dst_kind;
    gins(&mut cg.buf, opcode, src, dst, line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::entities::{SymbolRef, TypeRef};
    use crate::ir::function::ProcSignature;
    use crate::ir::types::Type;

    fn sample_proc() -> Procedure {
        let mut proc = Procedure::new(ProcSignature {
            entry: SymbolRef::from_u32(0),
            arg_width: 0,
            external: false,
        });
        proc.types.push(Type {
            name: "int32".into(),
            kind: Kind::Int(4),
            size: 4,
            align: 4,
            no_pointers: true,
        });
        proc
    }

    #[test]
    fn name_leaf_projects_to_its_storage_class() {
        let proc = sample_proc();
        let ty = TypeRef::from_u32(0);
        let node = Node::name(SymbolRef::from_u32(1), ty, Class::Auto);
        let addr = naddr(&proc, &node, false).unwrap().unwrap();
        assert!(matches!(addr, Addr::Automatic { .. }));
    }

    #[test]
    fn non_addressable_node_with_canfail_false_errors() {
        let proc = sample_proc();
        let ty = TypeRef::from_u32(0);
        let mut node = Node::constant(ty);
        node.op = Op::Binary("+".into());
        node.addable = false;
        assert!(naddr(&proc, &node, false).is_err());
        assert!(naddr(&proc, &node, true).unwrap().is_none());
    }
}
