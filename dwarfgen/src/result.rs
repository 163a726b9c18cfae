//! Error type returned by this crate's fallible entry points.
//!
//! Mirrors `nativegen_codegen::result::CodegenError`'s shape (same
//! `failure`-based stack, same "fatal, no local recovery" posture) but
//! names the two failure modes specific to DWARF emission: an unresolved
//! forward reference surviving two `.debug_info` passes, and an
//! object-sink I/O failure.

use failure_derive::Fail;

/// Short-hand for a `Result` whose error is [`DwarfError`].
pub type DwarfResult<T> = Result<T, DwarfError>;

/// A fatal failure of the DWARF builder.
#[derive(Fail, Debug)]
pub enum DwarfError {
    /// A reference attribute pointed at a DIE whose offset was still
    /// unresolved after gimli's internal fixed-point resolution converged.
    /// Two passes is a hard external contract this crate enforces even
    /// though `gimli::write::Dwarf` hides its own internal pass count.
    #[fail(display = "unresolved forward reference in .debug_info after two passes")]
    UnresolvedForwardReference,

    /// A runtime `type.*` symbol's `commonType` header didn't decode to a
    /// kind this builder recognises, or a generic composite's substituted
    /// field was absent from the borrowed internal layout.
    #[fail(display = "malformed runtime type descriptor: {}", _0)]
    MalformedRuntimeType(String),

    /// The configured fake return-address column collides with a real
    /// register column of the target ISA.
    #[fail(display = "fake return column {} collides with a real register column", _0)]
    FakeColumnCollision(u8),

    /// The object/byte sink reported an I/O failure while writing a debug
    /// section or backfilling a length field.
    #[fail(display = "DWARF sink I/O error: {}", _0)]
    Sink(String),

    /// A gimli write-side failure not covered by one of the above (a
    /// malformed `Expression`, an out-of-range `Data1`/`Data2` value,
    /// ...). Wrapped rather than matched on, since these indicate a bug in
    /// this crate's DIE construction rather than a condition callers can
    /// act on.
    #[fail(display = "DWARF encoding error: {}", _0)]
    Encoding(String),
}

impl From<gimli::write::Error> for DwarfError {
    fn from(e: gimli::write::Error) -> Self {
        DwarfError::Encoding(e.to_string())
    }
}

impl From<std::io::Error> for DwarfError {
    fn from(e: std::io::Error) -> Self {
        DwarfError::Sink(e.to_string())
    }
}
