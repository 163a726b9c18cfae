//! The top-level unit the back end compiles: one [`Procedure`].

use crate::ir::entities::{AutoRef, NodeRef, SymbolRef, TypeRef};
use crate::ir::node::{Class, Node};
use crate::ir::types::TypePool;
use cranelift_entity::PrimaryMap;

/// A single automatic (stack-local) variable declared in a procedure's
/// preamble, before any liveness information has been computed.
#[derive(Debug, Clone)]
pub struct Auto {
    /// The variable's source name, used for DWARF `DW_AT_name` and for
    /// de-duplicating shadowed locals the way `mkvarname` does in the
    /// teacher implementation's `writelines`.
    pub name: String,
    /// Resolved type.
    pub ty: TypeRef,
    /// The symbol this automatic is addressed through.
    pub symbol: SymbolRef,
    /// Storage class: `Auto` or `Param`.
    pub class: Class,
    /// Stack offset *before* `compactframe` has run. Updated in place by
    /// `crate::lower::frame::fixautoused` once the final frame layout is
    /// known.
    pub offset: i64,
    /// Set by `crate::lower::frame::markautoused`; an automatic with
    /// `used == false` after the forward scan is eligible for elimination.
    pub used: bool,
}

/// The entry-point descriptor the front end supplies alongside the node
/// tree: the symbol the procedure is entered through and the size of its
/// argument area.
#[derive(Debug, Clone)]
pub struct ProcSignature {
    /// The procedure's externally visible name.
    pub entry: SymbolRef,
    /// Total size in bytes of the incoming argument area.
    pub arg_width: u64,
    /// True iff the procedure is visible outside its compilation unit
    /// (mirrors the DWARF builder's `DW_AT_external` flag).
    pub external: bool,
}

/// One procedure: a tree of [`Node`]s plus the declarations the code
/// generator needs before it can walk that tree.
#[derive(Debug, Clone)]
pub struct Procedure {
    /// Entry-point descriptor.
    pub signature: ProcSignature,
    /// Arena of every node reachable from `root`.
    pub nodes: PrimaryMap<NodeRef, Node>,
    /// The statement list making up the procedure's body, in source order.
    pub body: Vec<NodeRef>,
    /// Declared automatics, in declaration order.
    pub autos: PrimaryMap<AutoRef, Auto>,
    /// Types referenced from this procedure's nodes and automatics,
    /// interned by the front end before handing the procedure to this
    /// crate.
    pub types: TypePool,
}

impl Procedure {
    /// Start an empty procedure with the given signature.
    pub fn new(signature: ProcSignature) -> Self {
        Procedure {
            signature,
            nodes: PrimaryMap::new(),
            body: Vec::new(),
            autos: PrimaryMap::new(),
            types: TypePool::new(),
        }
    }

    /// Intern a node, returning a stable reference to it.
    pub fn push_node(&mut self, node: Node) -> NodeRef {
        self.nodes.push(node)
    }

    /// Declare an automatic, returning a stable reference to it.
    pub fn push_auto(&mut self, auto: Auto) -> AutoRef {
        self.autos.push(auto)
    }

    /// Look up a node by reference.
    pub fn node(&self, r: NodeRef) -> &Node {
        &self.nodes[r]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::entities::{SymbolRef, TypeRef};

    #[test]
    fn body_order_is_preserved() {
        let mut proc = Procedure::new(ProcSignature {
            entry: SymbolRef::from_u32(0),
            arg_width: 8,
            external: true,
        });
        let a = proc.push_node(Node::constant(TypeRef::from_u32(0)));
        let b = proc.push_node(Node::constant(TypeRef::from_u32(0)));
        proc.body.push(a);
        proc.body.push(b);
        assert_eq!(proc.body, vec![a, b]);
    }
}
