//! `.debug_pubnames` and `.debug_pubtypes`.
//!
//! Neither section is supported by `gimli::write`, so this crate writes
//! them by hand over the [`crate::sink::Sink`] abstraction, following the
//! wire format DWARF §6.1.1 defines for both (they share one layout: a
//! header naming the `.debug_info` offset/length this index covers,
//! followed by `(die_offset, name)` pairs terminated by a zero offset).
//!
//! `.debug_pubnames` lists every subprogram and global variable DIE that
//! carries the external flag; `.debug_pubtypes` lists every type DIE
//! whose abbreviation index falls in the "public" range. Both indices are
//! built from [`crate::roots::Roots`]'s bookkeeping lists rather than by
//! walking the serialized `.debug_info` bytes back apart.

use std::io;

use crate::sink::Sink;

/// One entry: a DIE's offset within `.debug_info` and its name.
pub struct PubEntry {
    pub die_offset: u64,
    pub name: String,
}

/// Write a `.debug_pubnames`- or `.debug_pubtypes`-shaped section: the
/// DWARF §6.1.1 header (unit length backfilled once the body is known,
/// version 2, the covered `.debug_info` unit's offset and length) then
/// one `(offset, name)` pair per entry, terminated by a zero offset.
pub fn write_pub_section<S: Sink>(
    sink: &mut S,
    debug_info_offset: u64,
    debug_info_length: u64,
    entries: &[PubEntry],
) -> io::Result<()> {
    let length_field = sink.pos();
    sink.write_u32(0)?; // backfilled below
    let body_start = sink.pos();

    sink.write_u16(2)?; // DWARF pubnames/pubtypes format version
    sink.write_u32(debug_info_offset as u32)?;
    sink.write_u32(debug_info_length as u32)?;

    for entry in entries {
        sink.write_u32(entry.die_offset as u32)?;
        sink.write_cstr(&entry.name)?;
    }
    sink.write_u32(0)?;

    let body_len = (sink.pos() - body_start) as u32;
    let end = sink.pos();
    sink.seek(length_field)?;
    sink.write_u32(body_len)?;
    sink.seek(end)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;

    #[test]
    fn terminator_is_a_zero_offset() {
        let mut sink = VecSink::new();
        write_pub_section(
            &mut sink,
            0,
            0x100,
            &[PubEntry { die_offset: 0x20, name: "main".into() }],
        )
        .unwrap();
        let bytes = sink.into_bytes();
        assert_eq!(&bytes[bytes.len() - 4..], &0u32.to_le_bytes());
    }

    #[test]
    fn length_field_covers_the_body_not_itself() {
        let mut sink = VecSink::new();
        write_pub_section(
            &mut sink,
            0,
            0x10,
            &[PubEntry { die_offset: 4, name: "x".into() }],
        )
        .unwrap();
        let bytes = sink.into_bytes();
        let recorded_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        assert_eq!(recorded_len, bytes.len() - 4);
    }
}
