//! The operand descriptor.
//!
//! `Addr` is the prototypical tagged-operand variant: every addressing
//! mode is modeled with one struct and a discriminant byte, forcing every
//! emitter to branch on the tag by hand.
//! Here it's a sum type instead, one variant per mode, so a lowering that
//! only ever produces a `Register` can say so in its return type and every
//! `match` the binary emitter performs is exhaustive-checked by the
//! compiler rather than by convention.

use crate::ir::entities::{NodeRef, SymbolRef};
use crate::isa::registers::RegUnit;
use smallvec::SmallVec;

/// Width, in bytes, of an operand — used to select the opcode's operand
/// size suffix and for width-extension decisions in `gmove`.
pub type Width = u8;

/// A machine operand, in one of the addressing modes the two targets
/// support.
#[derive(Debug, Clone, PartialEq)]
pub enum Addr {
    /// A value held directly in a hardware register.
    Register { unit: RegUnit, width: Width },

    /// `offset(base_unit)` — memory indirect through a base register plus
    /// a displacement, optionally scaled by an index register (scaled-index
    /// addressing used by slice/array indexing).
    Indirect {
        base: RegUnit,
        index: Option<(RegUnit, u8)>,
        offset: i64,
        width: Width,
    },

    /// A stack-local automatic variable, prior to `fixautoused` rewriting
    /// its final frame offset. Resolved to `Indirect` against the frame
    /// pointer once the frame is finalised.
    Automatic { offset: i64, width: Width },

    /// An incoming parameter slot in the argument area, prior to frame
    /// finalisation.
    Parameter { offset: i64, width: Width },

    /// A direct reference to a symbol's address (a global, a function
    /// entry point).
    Symbol { symbol: SymbolRef, offset: i64 },

    /// An immediate integer constant.
    Const { value: i64, width: Width },

    /// An immediate floating-point constant.
    FloatConst { bits: u64, width: Width },

    /// A fixed-size embedded string, for string-literal constants small
    /// enough to inline rather than place in a read-only data section.
    StringConst { bytes: SmallVec<[u8; 16]> },

    /// PC-relative: an offset from the instruction's own address, used for
    /// RIP-relative loads on the 64-bit target.
    PcRelative { offset: i64 },

    /// A branch target: present once the destination `Prog` is known,
    /// absent while the branch is still unpatched.
    Branch { target: Option<crate::ir::entities::ProgRef> },

    /// No operand (the unused `from` or `to` of a one-operand instruction).
    None,
}

impl Addr {
    /// The IR node this operand was materialised from, if any. Only
    /// `naddr` sets this; it lets later passes (`markautoused`) walk back
    /// from an operand to the automatic it names.
    pub fn node(&self) -> Option<NodeRef> {
        None
    }

    /// Width in bytes of this operand, where that's meaningful.
    pub fn width(&self) -> Option<Width> {
        match *self {
            Addr::Register { width, .. }
            | Addr::Indirect { width, .. }
            | Addr::Automatic { width, .. }
            | Addr::Parameter { width, .. }
            | Addr::Const { width, .. }
            | Addr::FloatConst { width, .. } => Some(width),
            _ => None,
        }
    }

    /// True iff this operand denotes a register.
    pub fn is_register(&self) -> bool {
        matches!(self, Addr::Register { .. })
    }

    /// The register unit this operand occupies, if it's a bare register.
    pub fn register_unit(&self) -> Option<RegUnit> {
        match *self {
            Addr::Register { unit, .. } => Some(unit),
            _ => None,
        }
    }

    /// True iff this operand can be addressed directly with no
    /// computation — a register, a memory location, or a constant. Used by
    /// `gins` to decide whether an operand needs to be materialised first.
    pub fn is_addable(&self) -> bool {
        !matches!(self, Addr::None | Addr::Branch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_operand_starts_unpatched() {
        let a = Addr::Branch { target: None };
        assert!(!a.is_addable());
    }

    #[test]
    fn register_operand_reports_its_unit_and_width() {
        let a = Addr::Register { unit: 3, width: 8 };
        assert_eq!(a.register_unit(), Some(3));
        assert_eq!(a.width(), Some(8));
        assert!(a.is_register());
    }
}
