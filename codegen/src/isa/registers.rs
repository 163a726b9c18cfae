//! Data structures describing the registers in a target ISA.
//!
//! Modeled closely on Cranelift's `isa::registers` module: a register
//! *bank* is a contiguous range of register units, and a register *class*
//! is a named subset of a bank's units available to a given operand.
//! Unlike Cranelift, this crate's register allocator tracks *reference
//! counts* rather than a borrowed/free bitset — a register is considered
//! allocated iff its reference count is >= 1 — so
//! this module only has to describe the static shape of a target's
//! registers; `crate::regalloc::RegFile` is what tracks liveness.

use core::fmt;

/// The smallest unit of register allocation. Every register in the two
/// targets this crate supports covers exactly one unit (neither target
/// models sub-register aliasing), but the type is kept distinct from a bare
/// index for the same reason Cranelift keeps `RegUnit` distinct: so a
/// future target with aliasing registers doesn't require renaming every
/// call site.
pub type RegUnit = u16;

/// A named, contiguous range of register units sharing a purpose (general
/// purpose integer, floating point, ...).
pub struct RegBank {
    /// The bank's name, used in diagnostics.
    pub name: &'static str,
    /// The first register unit in this bank.
    pub first_unit: RegUnit,
    /// The number of register units in this bank.
    pub units: RegUnit,
    /// Specially named units, indexed from `first_unit`. Units beyond the
    /// end of this array are named `{prefix}{offset}`.
    pub names: &'static [&'static str],
    /// Prefix for units not covered by `names`.
    pub prefix: &'static str,
}

impl RegBank {
    /// Does this bank contain `regunit`?
    pub fn contains(&self, regunit: RegUnit) -> bool {
        regunit >= self.first_unit && regunit - self.first_unit < self.units
    }

    /// Render `regunit`'s display name, assuming it belongs to this bank.
    fn write_regunit(&self, f: &mut fmt::Formatter, regunit: RegUnit) -> fmt::Result {
        let offset = (regunit - self.first_unit) as usize;
        match self.names.get(offset) {
            Some(name) => write!(f, "%{}", name),
            None => write!(f, "%{}{}", self.prefix, offset),
        }
    }
}

/// A register class: the set of registers an operand of a given shape may
/// be assigned to. All classes in a bank are disjoint in this crate (there
/// is no sub-classing, unlike Cranelift, because neither target models
/// partial-width aliasing).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegClass {
    /// The class's name.
    pub name: &'static str,
    /// Index of the owning bank in `RegInfo::banks`.
    pub bank: usize,
    /// Register units belonging to this class, as offsets from the bank's
    /// `first_unit`.
    pub units: &'static [RegUnit],
}

/// Static description of all registers in a target.
pub struct RegInfo {
    /// Register banks.
    pub banks: &'static [RegBank],
    /// Register classes drawn from those banks.
    pub classes: &'static [RegClass],
}

impl RegInfo {
    /// Find the bank containing `regunit`.
    pub fn bank_containing(&self, regunit: RegUnit) -> Option<&'static RegBank> {
        self.banks.iter().find(|b| b.contains(regunit))
    }

    /// Total number of register units across all banks (the size to
    /// allocate for a `RegFile`'s reference-count array).
    pub fn num_units(&self) -> usize {
        self.banks
            .iter()
            .map(|b| usize::from(b.first_unit + b.units))
            .max()
            .unwrap_or(0)
    }

    /// Display helper for a register unit.
    pub fn display_regunit(&self, regunit: RegUnit) -> DisplayRegUnit<'_> {
        DisplayRegUnit { regunit, info: self }
    }
}

/// Displays a register unit using its target's naming scheme.
pub struct DisplayRegUnit<'a> {
    regunit: RegUnit,
    info: &'a RegInfo,
}

impl<'a> fmt::Display for DisplayRegUnit<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.info.bank_containing(self.regunit) {
            Some(bank) => bank.write_regunit(f, self.regunit),
            None => write!(f, "%INVALID{}", self.regunit),
        }
    }
}
