//! `.debug_gdb_scripts`: a single null-terminated, one-byte-prefixed
//! string naming a `.py` pretty-printer script GDB auto-loads, emitted
//! once per link.

use std::io;

use crate::sink::Sink;

/// The sub-section kind byte GDB's auto-load protocol assigns to an
/// inline Python script path.
const GDB_SCRIPT_KIND_PYTHON_FILE_NAME: u8 = 1;

/// Write the section's entire (tiny) content: the kind byte followed by
/// `script_path` and a terminating NUL.
pub fn write_gdb_scripts<S: Sink>(sink: &mut S, script_path: &str) -> io::Result<()> {
    sink.write_u8(GDB_SCRIPT_KIND_PYTHON_FILE_NAME)?;
    sink.write_cstr(script_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;

    #[test]
    fn kind_byte_then_path_then_nul() {
        let mut sink = VecSink::new();
        write_gdb_scripts(&mut sink, "runtime-gdb.py").unwrap();
        let bytes = sink.into_bytes();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..], b"runtime-gdb.py\0");
    }
}
