//! Fat-object clear: zeroing a stack-allocated aggregate wider than one
//! machine word (a "fat object").

use crate::binemit::Addr;
use crate::context::CodeGen;
use crate::isa::SpecialReg;
use crate::regalloc::savex::{restx, savex};

/// Zero `width` bytes starting at `dest`, a stack-local fat object.
///
/// Small objects (up to four pointer-widths) are cleared with a run of
/// plain zero-stores, which is both shorter to encode and faster to
/// retire than the `REP STOS` setup below for such sizes. Anything larger
/// pins the destination to the string-destination register, the
/// accumulator to zero, and the count register to the word count, then
/// emits a single `REP STOSQ` the way the teacher source's `clearfat`
/// does for its largest aggregates.
pub fn lower_clearfat(cg: &mut CodeGen<'_>, dest: Addr, width: u64, line: u32) {
    let pointer_width = cg.isa.pointer_width();
    let words = width / pointer_width;
    let remainder = width % pointer_width;

    if words <= 4 {
        let Addr::Indirect { base, index, offset, width: _ } = dest.clone() else {
            cg.buf.emit("MOVQ", Addr::Const { value: 0, width: width as u8 }, dest, line, None);
            return;
        };
        for i in 0..words {
            cg.buf.emit(
                "MOVQ",
                Addr::Const { value: 0, width: pointer_width as u8 },
                Addr::Indirect { base, index, offset: offset + (i * pointer_width) as i64, width: pointer_width as u8 },
                line,
                None,
            );
        }
        if remainder > 0 {
            cg.buf.emit(
                "MOVQ",
                Addr::Const { value: 0, width: remainder as u8 },
                Addr::Indirect { base, index, offset: offset + (words * pointer_width) as i64, width: remainder as u8 },
                line,
                None,
            );
        }
        return;
    }

    let dst_reg = cg.isa.special(SpecialReg::StringDst);
    let acc = cg.isa.special(SpecialReg::Accumulator);
    let count_reg = cg.isa.special(SpecialReg::Count);
    let class = cg.isa.gpr_class();

    let stack_temps = &mut cg.stack_temps;
    let dst_displaced = savex(&mut cg.regs, class, dst_reg, false, |w| *stack_temps += i64::from(w));
    let acc_displaced = savex(&mut cg.regs, class, acc, false, |w| *stack_temps += i64::from(w));
    let count_displaced = savex(&mut cg.regs, class, count_reg, false, |w| *stack_temps += i64::from(w));

    cg.buf.emit("LEAQ", dest, Addr::Register { unit: dst_reg, width: pointer_width as u8 }, line, None);
    cg.buf.emit("MOVQ", Addr::Const { value: 0, width: pointer_width as u8 }, Addr::Register { unit: acc, width: pointer_width as u8 }, line, None);
    cg.buf.emit(
        "MOVQ",
        Addr::Const { value: words as i64, width: pointer_width as u8 },
        Addr::Register { unit: count_reg, width: pointer_width as u8 },
        line,
        None,
    );
    cg.buf.emit("REP", Addr::None, Addr::None, line, None);
    cg.buf.emit("STOSQ", Addr::None, Addr::None, line, None);
    if remainder > 0 {
        cg.buf.emit(
            "MOVQ",
            Addr::Const { value: 0, width: remainder as u8 },
            Addr::Indirect { base: dst_reg, index: None, offset: 0, width: remainder as u8 },
            line,
            None,
        );
    }

    restx(&mut cg.regs, count_reg, count_displaced);
    restx(&mut cg.regs, acc, acc_displaced);
    restx(&mut cg.regs, dst_reg, dst_displaced);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::diag::NullSink;
    use crate::isa::amd64::{registers as amd64, Isa64};

    #[test]
    fn small_fat_object_uses_plain_stores() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let dest = Addr::Indirect { base: amd64::RBP, index: None, offset: -32, width: 8 };
        lower_clearfat(&mut cg, dest, 24, 1);
        assert_eq!(cg.buf.len(), 3);
        assert!(cg.buf.iter().all(|p| p.opcode == "MOVQ"));
    }

    #[test]
    fn large_fat_object_uses_rep_stos_and_restores_registers() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut cg = CodeGen::new(&isa, Options::default(), &mut sink);
        let before = cg.regs.snapshot();
        let dest = Addr::Indirect { base: amd64::RBP, index: None, offset: -256, width: 8 };
        lower_clearfat(&mut cg, dest, 256, 1);
        assert!(cg.buf.iter().any(|p| p.opcode == "STOSQ"));
        assert_eq!(cg.regs.snapshot(), before);
    }
}
