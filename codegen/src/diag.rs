//! Non-fatal diagnostic reporting.
//!
//! This crate draws a sharp line between internal invariant
//! violations (fatal, returned as [`crate::result::CodegenError`]) and user
//! source errors surfaced during lowering — a "local used" collision is the
//! example the spec names. The latter are reported through an `ErrorSink`
//! and do not halt code generation of the rest of the procedure; this
//! mirrors how the front end's own error reporter is described as an
//! external collaborator in §1.

use core::fmt;

/// A location a diagnostic can be attributed to.
///
/// Kept deliberately thin — just enough to let a front end map it back to
/// a source span — because this crate has no source-position type of its
/// own; it only ever receives a symbol name and an optional line number
/// from the IR it's handed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagLocation {
    /// Source line recorded on the offending node, if any.
    pub line: Option<u32>,
}

/// Receiver for diagnostics that do not abort compilation.
///
/// Implemented by the front end in production; `NullSink` discards
/// everything and `Vec<String>`'s impl (below, test-only) is what the test
/// suite inspects.
pub trait ErrorSink {
    /// Record a non-fatal error at `loc`.
    fn report(&mut self, loc: DiagLocation, message: fmt::Arguments<'_>);
}

/// An `ErrorSink` that discards every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ErrorSink for NullSink {
    fn report(&mut self, _loc: DiagLocation, _message: fmt::Arguments<'_>) {}
}

#[cfg(any(test, feature = "std"))]
impl ErrorSink for std::vec::Vec<std::string::String> {
    fn report(&mut self, loc: DiagLocation, message: fmt::Arguments<'_>) {
        use std::string::ToString;
        match loc.line {
            Some(line) => self.push(std::format!("line {}: {}", line, message)),
            None => self.push(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_and_drops() {
        let mut sink = NullSink;
        sink.report(DiagLocation { line: Some(12) }, format_args!("local used: {}", "x"));
    }

    #[test]
    fn vec_sink_records_messages_without_aborting() {
        let mut sink: std::vec::Vec<std::string::String> = std::vec::Vec::new();
        sink.report(DiagLocation { line: Some(3) }, format_args!("local used: {}", "x"));
        sink.report(DiagLocation::default(), format_args!("local used: {}", "y"));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0], "line 3: local used: x");
        assert_eq!(sink[1], "local used: y");
    }
}
