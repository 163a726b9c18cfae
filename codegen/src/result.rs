//! Error type returned by this crate's fallible entry points.
//!
//! Per `SPEC_FULL.md` §7, only two of the four error kinds ever reach a
//! caller as a `Result`: an internal invariant violation, and an unresolved
//! forward reference (the latter belongs to `nativegen-dwarf`, which
//! defines its own error enum against the same `failure` stack). User
//! source errors go through [`crate::diag::ErrorSink`] instead and never
//! abort compilation of the rest of the procedure; sink I/O failures
//! propagate as an opaque wrapped cause.

use failure_derive::Fail;

/// Short-hand for a `Result` whose error is [`CodegenError`].
pub type CodegenResult<T> = Result<T, CodegenError>;

/// A fatal failure of the code generator.
///
/// Every variant here is, per the spec's error-handling design, terminal:
/// there is no local recovery path once one of these is produced. The
/// front end is expected to have rejected ill-typed input before the back
/// end runs, so an `Invalid` here always indicates a bug in the IR
/// producer or in this crate, not a user mistake.
#[derive(Fail, Debug)]
pub enum CodegenError {
    /// An internal invariant was violated: a bad register state, an
    /// unexpected operator reaching a lowering that doesn't handle it, a
    /// stack-delta mismatch, or similar.
    #[fail(display = "compilation aborted: {}", _0)]
    Invalid(String),

    /// A branch returned by `gbranch` was never `patch`ed before the
    /// instruction buffer closed (`SPEC_FULL.md` §3, §5).
    #[fail(display = "unpatched branch target in procedure {}", _0)]
    UnpatchedBranch(String),

    /// No free register of the requested bank existed. The spec treats
    /// this as fatal because the front end is expected to guarantee
    /// expression depths stay below the pressure threshold.
    #[fail(display = "register allocation failed: no free {} register", _0)]
    OutOfRegisters(&'static str),

    /// The object/byte sink reported an I/O failure.
    #[fail(display = "sink I/O error: {}", _0)]
    Sink(String),
}
