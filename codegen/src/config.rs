//! Compile-time configuration.
//!
//! Resolves two host-tunable knobs: the `unmappedzero` threshold and the
//! DWARF fake return-address column. Both become fields here, with
//! conventional defaults, rather than per-target constants, so a host
//! that maps its zero page differently (or an embedder linking against
//! an older debugger with its own reserved column) can override them
//! without forking the crate.

use crate::ir::entities::SymbolRef;

/// Well-known runtime entry points the deferred- and asynchronous-call
/// lowerings in `crate::lower::call` emit a `CALL` to (`SPEC_FULL.md`
/// §4.3, §6 "Known symbol names"). The front end interns these symbol
/// names once per compilation, the same way it interns every other
/// `SymbolRef` before handing a procedure to this crate, and supplies the
/// resolved references here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSymbols {
    /// `deferproc`: called for `defer f(...)` after pushing `(callee,
    /// argsize)`.
    pub deferproc: SymbolRef,
    /// `newproc`: the same calling protocol, for `go f(...)`.
    pub newproc: SymbolRef,
}

impl Default for RuntimeSymbols {
    /// Unresolved (symbol 0). A caller that never compiles a `defer`/`go`
    /// statement need not override this; one that does must, or the
    /// deferred/asynchronous call lowering will emit a `CALL` to whichever
    /// symbol happens to be interned as 0.
    fn default() -> Self {
        RuntimeSymbols { deferproc: SymbolRef::from_u32(0), newproc: SymbolRef::from_u32(0) }
    }
}

/// Tunable knobs threaded through [`crate::context::CodeGen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Threshold, in bytes, above which a slice element's width triggers
    /// an explicit nil-dereference probe during slice inline expansion.
    /// Defaults to 4096, the conventional size of the lowest unmapped
    /// guard page.
    pub unmapped_zero_page: u64,

    /// The DWARF frame section's fake return-address column. Must not
    /// collide with a real register column in the target's `RegInfo`.
    /// Defaults to 16.
    pub fake_return_column: u8,

    /// Enable the constant-divisor and magic-multiplier fast paths in
    /// `crate::lower::divmod`. Disabling always falls back to hardware
    /// DIV/IDIV; useful for differential testing against the
    /// magic-multiplier path.
    pub optimize_div: bool,

    /// Enable the literal-count shift-doubling fast path in
    /// `crate::lower::shift`. Disabling always takes the variable-count
    /// path even for a literal count.
    pub optimize_shift: bool,

    /// Whether to emit DWARF debug sections for compiled output at all.
    pub emit_dwarf: bool,

    /// Resolved `deferproc`/`newproc` symbols for deferred and
    /// asynchronous call lowering.
    pub runtime: RuntimeSymbols,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            unmapped_zero_page: 4096,
            fake_return_column: 16,
            optimize_div: true,
            optimize_shift: true,
            emit_dwarf: true,
            runtime: RuntimeSymbols::default(),
        }
    }
}

impl Options {
    /// Validate cross-field constraints that a bare `Default` can't
    /// encode: the fake return column must not alias a real DWARF
    /// register-number column on the target the caller intends to
    /// compile for.
    pub fn validate(&self, num_dwarf_registers: u8) -> Result<(), &'static str> {
        if self.fake_return_column < num_dwarf_registers {
            return Err("fake_return_column collides with a real register column");
        }
        if self.unmapped_zero_page == 0 {
            return Err("unmapped_zero_page must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_historical_constants() {
        let opts = Options::default();
        assert_eq!(opts.unmapped_zero_page, 4096);
        assert_eq!(opts.fake_return_column, 16);
    }

    #[test]
    fn fake_column_must_exceed_real_register_count() {
        let opts = Options::default();
        assert!(opts.validate(16).is_ok());
        assert!(opts.validate(17).is_err());
    }
}
