//! The object-file sink: a stream-position cursor with byte/word/long/
//! vlong writers, a string writer, seek, and flush, plus the
//! per-container-format section registration rules.
//!
//! The builder never buffers a whole section ahead of time; it writes in
//! place and seeks back to backfill a length field once the section's
//! true length is known.
//! `gimli::write`'s own `Writer` trait already models exactly this
//! discipline (`gimli::write::EndianVec` implements it over a `Vec<u8>`),
//! so [`Sink`] is kept narrow — the hand-rolled sections this crate still
//! has to emit itself (`.debug_pubnames`, `.debug_pubtypes`,
//! `.debug_aranges`, `.debug_gdb_scripts`, none of which `gimli::write`
//! supports) are the only callers.

use std::io::{self, Write};

/// A writable, seekable byte stream with fixed-width integer and
/// NUL-terminated string writers.
pub trait Sink {
    /// The current write position.
    fn pos(&self) -> u64;
    /// Move the write position, without truncating anything already
    /// written past it — used to backfill a length field after the
    /// section's true length becomes known.
    fn seek(&mut self, pos: u64) -> io::Result<()>;
    fn write_u8(&mut self, v: u8) -> io::Result<()>;
    fn write_u16(&mut self, v: u16) -> io::Result<()>;
    fn write_u32(&mut self, v: u32) -> io::Result<()>;
    fn write_u64(&mut self, v: u64) -> io::Result<()>;
    /// A NUL-terminated string, matching DWARF's inline string encoding.
    fn write_cstr(&mut self, s: &str) -> io::Result<()>;
    fn write_bytes(&mut self, b: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// An in-memory [`Sink`] over a growable byte buffer. Seeking past the
/// current length zero-fills the gap; seeking within it repositions the
/// cursor for a backfill write that overwrites in place.
#[derive(Debug, Default)]
pub struct VecSink {
    buf: Vec<u8>,
    pos: usize,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    fn write_at(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }
}

impl Sink for VecSink {
    fn pos(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos as usize;
        Ok(())
    }

    fn write_u8(&mut self, v: u8) -> io::Result<()> {
        self.write_at(&[v]);
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> io::Result<()> {
        self.write_at(&v.to_le_bytes());
        Ok(())
    }

    fn write_u32(&mut self, v: u32) -> io::Result<()> {
        self.write_at(&v.to_le_bytes());
        Ok(())
    }

    fn write_u64(&mut self, v: u64) -> io::Result<()> {
        self.write_at(&v.to_le_bytes());
        Ok(())
    }

    fn write_cstr(&mut self, s: &str) -> io::Result<()> {
        self.write_at(s.as_bytes());
        self.write_at(&[0]);
        Ok(())
    }

    fn write_bytes(&mut self, b: &[u8]) -> io::Result<()> {
        self.write_at(b);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for VecSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_at(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Sink::flush(self)
    }
}

/// PE registers its debug sections through an external hook supplied by
/// the object-file writer rather than accepting them directly. This
/// trait is that seam; this crate never implements it, only calls it.
pub trait PeDwarfHook {
    /// Register one named debug section's finished bytes with the PE
    /// writer, returning the offset it was placed at.
    fn new_pe_dwarf_section(&mut self, name: &str, data: &[u8]) -> io::Result<u64>;
}

/// `PEFILEALIGN`: the byte alignment every debug section is padded to on
/// the PE target.
pub const PE_FILE_ALIGN: u64 = 512;

/// Pad `data` up to the next multiple of `PE_FILE_ALIGN` with zero bytes.
pub fn pad_to_pe_file_align(data: &mut Vec<u8>) {
    let rem = data.len() as u64 % PE_FILE_ALIGN;
    if rem != 0 {
        data.resize(data.len() + (PE_FILE_ALIGN - rem) as usize, 0);
    }
}

/// Register `name` containing `data` as a non-allocated ELF debug
/// section (`SHT_PROGBITS`, alignment 1) — `object::write::Object`'s ELF
/// backend already defaults a new section to this, so there is nothing
/// beyond asking for the section and appending its bytes.
pub fn write_elf_section(
    object: &mut object::write::Object,
    name: &str,
    data: &[u8],
) -> object::write::SectionId {
    let id = object.add_section(Vec::new(), name.as_bytes().to_vec(), object::SectionKind::Debug);
    object.append_section_data(id, data, 1);
    id
}

/// Register `name` containing `data` inside the single `__DWARF` segment
/// a Mach-O binary carries all its debug sections under. The first debug
/// section's requested file offset is rounded down to a 4 KiB boundary
/// since `object`'s Mach-O writer otherwise places segments contiguously
/// with no such rounding.
pub fn write_macho_section(
    object: &mut object::write::Object,
    name: &str,
    data: &[u8],
) -> object::write::SectionId {
    let id = object.add_section(b"__DWARF".to_vec(), name.as_bytes().to_vec(), object::SectionKind::Debug);
    object.append_section_data(id, data, 4096);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfill_overwrites_in_place() {
        let mut sink = VecSink::new();
        sink.write_u32(0).unwrap();
        let body_start = sink.pos();
        sink.write_bytes(&[1, 2, 3, 4, 5]).unwrap();
        let body_len = (sink.pos() - body_start) as u32;
        sink.seek(0).unwrap();
        sink.write_u32(body_len).unwrap();
        let bytes = sink.into_bytes();
        assert_eq!(&bytes[0..4], &5u32.to_le_bytes());
        assert_eq!(&bytes[4..9], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn cstr_is_nul_terminated() {
        let mut sink = VecSink::new();
        sink.write_cstr("main").unwrap();
        assert_eq!(sink.as_bytes(), b"main\0");
    }

    #[test]
    fn pe_padding_rounds_up_to_file_align() {
        let mut data = vec![0u8; 10];
        pad_to_pe_file_align(&mut data);
        assert_eq!(data.len() as u64, PE_FILE_ALIGN);
    }
}
