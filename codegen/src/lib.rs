//! Machine-dependent code generator: instruction selection, register
//! allocation, and stack-frame layout for a 64-bit (`isa::amd64`) and a
//! 32-bit (`isa::x86`) register target.
//!
//! This crate consumes a typed intermediate representation of a
//! procedure — a tree of operator nodes, the [`ir`] module — and lowers it
//! to a linear stream of target-machine instructions, the [`binemit`]
//! module. [`context::CodeGen`] is the single entry point that sequences a
//! whole procedure's compilation: the body walk (`lower::statement`),
//! stack-frame finalisation (`lower::frame`), and the register-discipline
//! check `SPEC_FULL.md` testable property 1 describes.
//!
//! `SPEC_FULL.md` is this crate's specification; `DESIGN.md` at the
//! workspace root records where each part of the implementation is
//! grounded and the decisions behind its open questions.

pub mod binemit;
pub mod config;
pub mod context;
pub mod diag;
pub mod divconst_magic;
pub mod ir;
pub mod isa;
pub mod lower;
pub mod regalloc;
pub mod result;

pub use config::Options;
pub use context::CodeGen;
pub use result::{CodegenError, CodegenResult};
