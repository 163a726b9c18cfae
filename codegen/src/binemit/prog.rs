//! The instruction buffer.
//!
//! `SPEC_FULL.md` §3 describes `Prog` as a linked-list record with a link
//! field and a register-allocator back-pointer; §9 asks for the arena
//! redesign explicitly: "model the section as ... a stable integer handle
//! instead of raw pointers". Here the arena is a plain `Vec<Prog>` inside
//! [`InstBuffer`] and the link field becomes `Option<ProgRef>` — in
//! practice unused for traversal, since `Vec` order already is program
//! order, but kept because the frame-fixup passes address instructions by
//! `ProgRef` rather than by position.

use crate::ir::entities::{NodeRef, ProgRef};
use crate::binemit::addr::Addr;
use std::vec::Vec;

/// One emitted machine instruction.
#[derive(Debug, Clone)]
pub struct Prog {
    /// Opcode mnemonic. Kept as a static string rather than a numeric
    /// opcode table because the two targets this crate supports don't
    /// share an encoding, and nothing downstream of `binemit` needs to
    /// compare opcodes numerically.
    pub opcode: &'static str,
    /// Byte offset of this instruction from the start of its procedure.
    /// Filled in by `crate::lower::frame` once the buffer is closed.
    pub pc: u32,
    /// Source line, for `.debug_line` correlation.
    pub line: u32,
    /// First operand.
    pub from: Addr,
    /// Second operand.
    pub to: Addr,
    /// The node this instruction was generated for, if any — lets
    /// `markautoused` attribute a `used` bit back to an automatic without
    /// re-deriving it from the operand.
    pub node: Option<NodeRef>,
    /// Forward link, retained for parity with the source's list structure;
    /// always `Some` except for the last instruction once closed.
    pub link: Option<ProgRef>,
}

impl Prog {
    /// True iff this instruction is a still-unpatched branch.
    pub fn is_unpatched_branch(&self) -> bool {
        matches!(self.to, Addr::Branch { target: None })
            || matches!(self.from, Addr::Branch { target: None })
    }
}

/// A handle to a branch instruction returned by [`InstBuffer::gbranch`],
/// to be resolved later by [`InstBuffer::patch`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BranchHandle(pub(crate) ProgRef);

/// The append-only instruction list for one procedure, plus the
/// program-counter cursor the spec's §2 overview names.
#[derive(Debug, Default)]
pub struct InstBuffer {
    progs: Vec<Prog>,
    cursor: u32,
    closed: bool,
}

impl InstBuffer {
    /// Start an empty buffer.
    pub fn new() -> Self {
        InstBuffer { progs: Vec::new(), cursor: 0, closed: false }
    }

    /// Append one instruction, returning its reference.
    pub fn emit(&mut self, opcode: &'static str, from: Addr, to: Addr, line: u32, node: Option<NodeRef>) -> ProgRef {
        let r = ProgRef::from_u32(self.progs.len() as u32);
        self.progs.push(Prog { opcode, pc: self.cursor, line, from, to, node, link: None });
        if let Some(prev) = r.as_u32().checked_sub(1) {
            self.progs[prev as usize].link = Some(r);
        }
        self.cursor += 1;
        r
    }

    /// Emit a conditional or unconditional branch whose target is not yet
    /// known, returning a handle `patch` must later resolve.
    pub fn gbranch(&mut self, opcode: &'static str, line: u32) -> BranchHandle {
        let r = self.emit(opcode, Addr::None, Addr::Branch { target: None }, line, None);
        BranchHandle(r)
    }

    /// Resolve a branch handle to its destination instruction.
    pub fn patch(&mut self, handle: BranchHandle, target: ProgRef) {
        self.progs[handle.0.as_u32() as usize].to = Addr::Branch { target: Some(target) };
    }

    /// Number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.progs.len()
    }

    /// True iff nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.progs.is_empty()
    }

    /// Look up an instruction by reference.
    pub fn prog(&self, r: ProgRef) -> &Prog {
        &self.progs[r.as_u32() as usize]
    }

    /// Mutable lookup, used by the frame-fixup passes to rewrite operand
    /// offsets in place.
    pub fn prog_mut(&mut self, r: ProgRef) -> &mut Prog {
        &mut self.progs[r.as_u32() as usize]
    }

    /// Iterate instructions in program order.
    pub fn iter(&self) -> impl Iterator<Item = &Prog> {
        self.progs.iter()
    }

    /// Iterate instructions in program order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Prog> {
        self.progs.iter_mut()
    }

    /// Close the buffer. Fails if any branch instruction was never
    /// patched, per `SPEC_FULL.md` §3's invariant.
    pub fn close(&mut self) -> Result<(), crate::result::CodegenError> {
        self.closed = true;
        if let Some(p) = self.progs.iter().find(|p| p.is_unpatched_branch()) {
            return Err(crate::result::CodegenError::UnpatchedBranch(
                std::format!("{}@{}", p.opcode, p.pc),
            ));
        }
        Ok(())
    }

    /// True once [`Self::close`] has run successfully.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binemit::addr::Addr;

    #[test]
    fn unpatched_branch_is_fatal_on_close() {
        let mut buf = InstBuffer::new();
        buf.gbranch("JMP", 1);
        assert!(buf.close().is_err());
    }

    #[test]
    fn patched_branch_closes_cleanly() {
        let mut buf = InstBuffer::new();
        let h = buf.gbranch("JMP", 1);
        let target = buf.emit("NOP", Addr::None, Addr::None, 2, None);
        buf.patch(h, target);
        assert!(buf.close().is_ok());
    }

    #[test]
    fn cursor_advances_with_each_emit() {
        let mut buf = InstBuffer::new();
        buf.emit("NOP", Addr::None, Addr::None, 1, None);
        buf.emit("NOP", Addr::None, Addr::None, 2, None);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.prog(ProgRef::from_u32(1)).pc, 1);
    }
}
