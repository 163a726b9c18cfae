//! The per-compilation context object.
//!
//! A traditional compiler of this shape keeps the instruction cursor,
//! register counts, and current procedure as module-wide variables; here
//! a `CodeGen` context object holds them instead, and all lowerings take
//! it as an explicit argument. This is that object. Every function in
//! `crate::lower` takes `&mut CodeGen` instead of reaching for a global,
//! so two independent `CodeGen`s (one per test, or one per thread) never
//! interfere — single-threaded, single-`CodeGen`-at-a-time use is one
//! instance of this, not a language rule.

use crate::binemit::InstBuffer;
use crate::config::Options;
use crate::diag::{DiagLocation, ErrorSink, NullSink};
use crate::ir::entities::ProgRef;
use crate::ir::function::Procedure;
use crate::isa::TargetIsa;
use crate::regalloc::RegFile;
use crate::result::{CodegenError, CodegenResult};

/// The shared-throw-target cache for slice bounds checks: the first
/// bounds-check failure in a procedure emits the call to `panicslice`;
/// every later check in the same procedure branches to that same target
/// with the condition reversed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThrowTarget(Option<ProgRef>);

impl ThrowTarget {
    /// Take the cached target if one exists, otherwise hand back `None` so
    /// the caller knows it must emit a fresh throw site and record it via
    /// [`Self::set`].
    pub fn get(&self) -> Option<ProgRef> {
        self.0
    }

    /// Record the throw site emitted for the first bounds-check failure in
    /// a procedure.
    pub fn set(&mut self, target: ProgRef) {
        self.0 = target;
    }

    /// Reset at the start of each procedure — a throw target never
    /// survives past the procedure that created it.
    pub fn reset(&mut self) {
        self.0 = None;
    }
}

/// All per-procedure mutable compilation state, replacing the source's
/// module-wide globals.
pub struct CodeGen<'a> {
    /// The target machine this context compiles for.
    pub isa: &'a dyn TargetIsa,
    /// Tunable knobs.
    pub options: Options,
    /// The register file: one reference count per hardware unit.
    pub regs: RegFile,
    /// The instruction buffer for the procedure currently being compiled.
    pub buf: InstBuffer,
    /// The shared slice-bounds-check throw target for the current
    /// procedure.
    pub throw: ThrowTarget,
    /// Receiver for non-fatal user-source diagnostics.
    pub diag: &'a mut dyn ErrorSink,
    /// Stack temporaries allocated so far in the current procedure, used
    /// to size the locals area before `compactframe` runs.
    pub stack_temps: i64,
}

impl<'a> CodeGen<'a> {
    /// Start a context for `isa`, reporting non-fatal diagnostics to
    /// `diag`.
    pub fn new(isa: &'a dyn TargetIsa, options: Options, diag: &'a mut dyn ErrorSink) -> Self {
        CodeGen {
            isa,
            options,
            regs: RegFile::new(isa.reg_info().num_units()),
            buf: InstBuffer::new(),
            throw: ThrowTarget::default(),
            diag,
            stack_temps: 0,
        }
    }

    /// Reset per-procedure state before compiling the next procedure. The
    /// register file is *not* reset here if its count vector isn't all
    /// zero — that would mask a register-discipline bug (testable property
    /// 1) rather than report it.
    pub fn begin_procedure(&mut self) -> CodegenResult<()> {
        self.buf = InstBuffer::new();
        self.throw.reset();
        self.stack_temps = 0;
        Ok(())
    }

    /// Allocate a fresh stack temporary of `width` bytes, returning its
    /// frame-relative offset. Temporaries grow the locals area
    /// monotonically within a procedure; `crate::lower::frame::compactframe`
    /// is what assigns their final offsets.
    pub fn alloc_stack_temp(&mut self, width: u8) -> i64 {
        self.stack_temps += i64::from(width);
        -self.stack_temps
    }

    /// Report a non-fatal diagnostic at the given source line.
    pub fn error_at(&mut self, line: Option<u32>, args: core::fmt::Arguments<'_>) {
        self.diag.report(DiagLocation { line }, args);
    }

    /// Close the instruction buffer, failing if any branch remains
    /// unpatched.
    pub fn close_procedure(&mut self) -> CodegenResult<()> {
        self.buf.close()
    }

    /// Compile one procedure end to end: reset state, walk its body,
    /// finalize the frame, and close the buffer. The statement walk itself
    /// lives in `crate::lower`; this just sequences the phases the spec's
    /// §4.8 stack-frame finalisation depends on running in order.
    pub fn compile(&mut self, proc: &mut Procedure) -> CodegenResult<()> {
        self.begin_procedure()?;
        crate::lower::statement::compile_body(self, proc)?;
        crate::lower::frame::markautoused(&self.buf, proc);
        let deltas = crate::lower::frame::compactframe(proc);
        crate::lower::frame::fixautoused(&mut self.buf, proc, &deltas);
        self.close_procedure()?;
        let snapshot = self.regs.snapshot();
        if snapshot.iter().any(|&c| c != 0) {
            return Err(CodegenError::Invalid(std::format!(
                "register leaked across procedure {}",
                proc_name(proc)
            )));
        }
        Ok(())
    }
}

fn proc_name(proc: &Procedure) -> &str {
    let _ = proc;
    "<procedure>"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::amd64::Isa64;

    #[test]
    fn fresh_context_has_an_all_zero_register_file() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let ctx = CodeGen::new(&isa, Options::default(), &mut sink);
        assert!(ctx.regs.snapshot().iter().all(|&c| c == 0));
    }

    #[test]
    fn stack_temps_grow_downward_and_distinctly() {
        let isa = Isa64::new();
        let mut sink = NullSink;
        let mut ctx = CodeGen::new(&isa, Options::default(), &mut sink);
        let a = ctx.alloc_stack_temp(8);
        let b = ctx.alloc_stack_temp(4);
        assert_eq!(a, -8);
        assert_eq!(b, -12);
    }
}
