//! `regalloc`/`regfree`: the two operations every lowering in `crate::lower`
//! calls to materialise and release a register operand.

use crate::binemit::Addr;
use crate::ir::types::Bank;
use crate::isa::registers::RegClass;
use crate::regalloc::regfile::RegFile;
use crate::result::{CodegenError, CodegenResult};

/// Pick a hardware register appropriate for `bank` and bind it into an
/// `Addr::Register` operand of `width` bytes (`SPEC_FULL.md` §4.1).
///
/// `hint`, if given, is reused when it names a free register of the right
/// bank. The caller must later call [`regfree`] on the returned operand;
/// allocations must be released in reverse order of acquisition within a
/// single expression (`SPEC_FULL.md` §3's stack-discipline invariant) —
/// this function does not itself enforce that order, since it has no
/// visibility into sibling calls, but `crate::lower` always nests its
/// `regalloc`/`regfree` pairs lexically.
pub fn regalloc(
    file: &mut RegFile,
    gpr: RegClass,
    fpr: RegClass,
    bank: Bank,
    width: u8,
    hint: Option<&Addr>,
) -> CodegenResult<Addr> {
    let class = match bank {
        Bank::Int => gpr,
        Bank::Float => fpr,
    };
    let hint_unit = hint.and_then(Addr::register_unit);
    match file.pick(class, hint_unit) {
        Some(unit) => {
            file.take(unit);
            Ok(Addr::Register { unit, width })
        }
        None => Err(CodegenError::OutOfRegisters(class.name)),
    }
}

/// Release a register operand previously returned by [`regalloc`] or
/// [`crate::regalloc::savex::savex`].
pub fn regfree(file: &mut RegFile, addr: &Addr) {
    if let Some(unit) = addr.register_unit() {
        file.free(unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::amd64::registers as amd64;

    #[test]
    fn alloc_then_free_is_a_no_op_on_the_count_vector() {
        let mut file = RegFile::new(amd64::INFO.num_units());
        let before = file.snapshot();
        let a = regalloc(&mut file, amd64::GPR, amd64::FPR, Bank::Int, 8, None).unwrap();
        regfree(&mut file, &a);
        assert_eq!(file.snapshot(), before);
    }

    #[test]
    fn exhausting_a_bank_is_a_fatal_error() {
        let mut file = RegFile::new(amd64::INFO.num_units());
        let mut held = std::vec::Vec::new();
        for _ in 0..amd64::GPR.units.len() {
            held.push(regalloc(&mut file, amd64::GPR, amd64::FPR, Bank::Int, 8, None).unwrap());
        }
        assert!(regalloc(&mut file, amd64::GPR, amd64::FPR, Bank::Int, 8, None).is_err());
        for a in held {
            regfree(&mut file, &a);
        }
    }
}
