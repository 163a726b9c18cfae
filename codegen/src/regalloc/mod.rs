//! Register allocation: a reference-counted register file plus the
//! `regalloc`/`regfree` operations and the special-register save/restore
//! protocol built on top of it.

pub mod alloc;
pub mod regfile;
pub mod savex;

pub use alloc::{regalloc, regfree};
pub use regfile::RegFile;
pub use savex::{restx, savex, Displaced};
