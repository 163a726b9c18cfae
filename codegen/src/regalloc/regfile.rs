//! The register file: one reference count per hardware register unit.
//!
//! `SPEC_FULL.md` §3 states the invariant this module exists to hold: "a
//! register is considered allocated iff its reference count is ≥ 1. Counts
//! are monotonic within a region between `regalloc` and the matching
//! `regfree`." Cranelift's own allocator (`crate::regalloc::register_set` in
//! the teacher) tracks a borrowed/free bitset instead, because Cranelift's
//! allocator runs after the fact over an already-built SSA form; this
//! crate's allocator runs *during* lowering, where the same register can
//! legitimately be referenced by more than one live operand at once (the
//! base and index of a scaled-index `Addr`, for instance), so a count
//! replaces the bit.

use crate::isa::registers::{RegClass, RegUnit};
use std::vec::Vec;

/// A per-procedure register file: one reference count per unit in the
/// target's combined register banks.
#[derive(Debug, Clone)]
pub struct RegFile {
    counts: Vec<u8>,
}

impl RegFile {
    /// Start a register file with every unit free, sized for `num_units`
    /// hardware register units.
    pub fn new(num_units: usize) -> Self {
        RegFile { counts: std::vec![0; num_units] }
    }

    /// The reference count of `unit`.
    pub fn count(&self, unit: RegUnit) -> u8 {
        self.counts[usize::from(unit)]
    }

    /// True iff `unit`'s reference count is zero.
    pub fn is_free(&self, unit: RegUnit) -> bool {
        self.count(unit) == 0
    }

    /// Snapshot of every unit's count, used by testable property 1
    /// (register discipline: the count vector at procedure end must equal
    /// the vector at entry).
    pub fn snapshot(&self) -> Vec<u8> {
        self.counts.clone()
    }

    /// Increment `unit`'s reference count, marking it busy if it wasn't
    /// already.
    pub fn take(&mut self, unit: RegUnit) {
        self.counts[usize::from(unit)] += 1;
    }

    /// Decrement `unit`'s reference count. Fatal (debug-asserted) to call
    /// on an already-free unit: the spec's allocation discipline is
    /// strictly LIFO within an expression, so a double-free indicates a
    /// lowering bug.
    pub fn free(&mut self, unit: RegUnit) {
        debug_assert!(self.counts[usize::from(unit)] > 0, "double-free of register unit {}", unit);
        self.counts[usize::from(unit)] -= 1;
    }

    /// Find the first free unit in `class`, preferring `hint` if it names a
    /// unit in `class` that's currently free (`SPEC_FULL.md` §4.1: "If
    /// *hint* is a register node and that register is currently free and of
    /// a compatible bank, the same register is reused").
    pub fn pick(&self, class: RegClass, hint: Option<RegUnit>) -> Option<RegUnit> {
        if let Some(h) = hint {
            if class.units.contains(&h) && self.is_free(h) {
                return Some(h);
            }
        }
        class.units.iter().copied().find(|&u| self.is_free(u))
    }

    /// Force-allocate a single named unit regardless of `pick`'s
    /// first-free policy — used by the special-register save/restore
    /// protocol, which must target one exact unit (the accumulator, the
    /// shift-count register, ...).
    pub fn take_exact(&mut self, unit: RegUnit) {
        self.take(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::amd64::registers as amd64;

    #[test]
    fn pick_prefers_a_free_hint() {
        let rf = RegFile::new(amd64::INFO.num_units());
        let picked = rf.pick(amd64::GPR, Some(amd64::RCX));
        assert_eq!(picked, Some(amd64::RCX));
    }

    #[test]
    fn pick_skips_a_busy_hint() {
        let mut rf = RegFile::new(amd64::INFO.num_units());
        rf.take(amd64::RAX);
        let picked = rf.pick(amd64::GPR, Some(amd64::RAX));
        assert_ne!(picked, Some(amd64::RAX));
        assert!(picked.is_some());
    }

    #[test]
    fn take_free_round_trip_restores_zero_counts() {
        let mut rf = RegFile::new(amd64::INFO.num_units());
        let before = rf.snapshot();
        let u = rf.pick(amd64::GPR, None).unwrap();
        rf.take(u);
        rf.free(u);
        assert_eq!(rf.snapshot(), before);
    }

    #[test]
    #[should_panic(expected = "double-free")]
    fn double_free_is_fatal() {
        let mut rf = RegFile::new(amd64::INFO.num_units());
        rf.free(amd64::RAX);
    }
}
