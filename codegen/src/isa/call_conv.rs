//! Calling convention identifiers.

use core::fmt;

/// The calling convention a [`TargetIsa`](super::TargetIsa) uses for
/// procedure entry. Both targets this crate supports use a single,
/// stack-based convention; this type exists mainly so `crate::lower::call`
/// doesn't have to hard-code the convention's name in diagnostics, and so a
/// future target can add another variant without touching every call site
/// that only cares about "the default convention."
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CallConv {
    /// All arguments and results pass through the outgoing argument area on
    /// the stack; this is the only convention the runtime's `newproc` and
    /// `deferproc` entry points understand, so it is also what
    /// [`Op::Call`](crate::ir::Op::Call) lowers to regardless of what a
    /// future register-passing convention might add.
    StackSystemV,
}

impl fmt::Display for CallConv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CallConv::StackSystemV => "stack_system_v",
        })
    }
}
