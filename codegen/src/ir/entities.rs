//! Opaque entity references used throughout the code generator.
//!
//! Nodes, symbols, and automatics are not represented as Rust references:
//! the IR tree a front end hands us is read-only and its lifetime does not
//! nest neatly inside a single `compile` call, so every cross-reference is a
//! small `u32`-backed handle into a table owned by the [`Procedure`]. This
//! mirrors the entity-reference discipline of `cranelift_entity`, whose
//! `entity_impl!` macro we reuse directly instead of writing our own
//! `Display`/`Hash`/`PartialEq` boilerplate for each handle type.
//!
//! [`Procedure`]: crate::ir::function::Procedure

use cranelift_entity::entity_impl;

/// A reference to a [`Node`](crate::ir::node::Node) in a procedure's
/// operator tree.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "node");

/// A reference to a symbol: a global, function, or automatic variable name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolRef(u32);
entity_impl!(SymbolRef, "sym");

/// A reference to a resolved [`Type`](crate::ir::types::Type).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(u32);
entity_impl!(TypeRef, "ty");

/// A reference to an automatic (stack-local) variable declared in a
/// procedure's preamble.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AutoRef(u32);
entity_impl!(AutoRef, "auto");

/// A reference to an emitted [`Prog`](crate::binemit::prog::Prog) in the
/// per-procedure instruction arena.
///
/// This replaces raw `Prog*` linked-list pointers: the arena is a
/// `Vec<Prog>` and this is
/// a stable index into it, so `link` fields become `Option<ProgRef>`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgRef(u32);
entity_impl!(ProgRef, "p");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_cranelift_entities() {
        assert_eq!(NodeRef::from_u32(0).to_string(), "node0");
        assert_eq!(ProgRef::from_u32(3).to_string(), "p3");
    }
}
