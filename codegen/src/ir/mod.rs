//! The typed intermediate representation the front end hands this crate.
//!
//! This module only models data: the node tree, resolved types, and the
//! procedure-level declarations. Everything that turns this data into
//! machine instructions lives in [`crate::lower`], dispatched through
//! [`crate::context::CodeGen`].

pub mod entities;
pub mod function;
pub mod node;
pub mod types;

pub use entities::{AutoRef, NodeRef, ProgRef, SymbolRef, TypeRef};
pub use function::{Auto, ProcSignature, Procedure};
pub use node::{Class, Node, Op, SliceForm, Ullman};
pub use types::{Bank, Field, Kind, StructLayout, Type, TypePool};
