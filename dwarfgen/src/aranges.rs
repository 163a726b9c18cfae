//! `.debug_aranges`.
//!
//! Not supported by `gimli::write`, so written by hand over
//! [`crate::sink::Sink`] following DWARF §6.1.2: a header naming the
//! covered `.debug_info` unit, the target's address size and segment
//! size (always 0, this back end has no segmented addressing), padded so
//! the first tuple starts aligned to twice the address size, followed by
//! `(address, length)` tuples and a zero/zero terminator. One header plus
//! one tuple is emitted per compilation unit, derived from that unit's
//! `DW_AT_low_pc`/`DW_AT_high_pc`.

use std::io;

use crate::sink::Sink;

/// Write the single-unit `.debug_aranges` header plus its one
/// `(address, length)` tuple, derived from a compilation unit's low/high
/// PC. This back end compiles one package into one compilation unit, so
/// there is exactly one tuple.
pub fn write_aranges<S: Sink>(
    sink: &mut S,
    debug_info_offset: u64,
    address_size: u8,
    low_pc: u64,
    length: u64,
) -> io::Result<()> {
    let length_field = sink.pos();
    sink.write_u32(0)?; // backfilled below
    let body_start = sink.pos();

    sink.write_u16(2)?; // DWARF aranges format version
    sink.write_u32(debug_info_offset as u32)?;
    sink.write_u8(address_size)?;
    sink.write_u8(0)?; // segment_size: no segmented addressing on this target

    // Pad to a multiple of 2 * address_size before the first tuple.
    let tuple_align = 2 * address_size as u64;
    let unpadded = sink.pos() - body_start + 6; // header fields consumed so far within body
    let pad = (tuple_align - (unpadded % tuple_align)) % tuple_align;
    for _ in 0..pad {
        sink.write_u8(0)?;
    }

    write_address(sink, address_size, low_pc)?;
    write_address(sink, address_size, length)?;
    write_address(sink, address_size, 0)?;
    write_address(sink, address_size, 0)?;

    let body_len = (sink.pos() - body_start) as u32;
    let end = sink.pos();
    sink.seek(length_field)?;
    sink.write_u32(body_len)?;
    sink.seek(end)?;
    Ok(())
}

fn write_address<S: Sink>(sink: &mut S, address_size: u8, value: u64) -> io::Result<()> {
    if address_size == 4 {
        sink.write_u32(value as u32)
    } else {
        sink.write_u64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;

    #[test]
    fn emits_a_terminating_zero_tuple() {
        let mut sink = VecSink::new();
        write_aranges(&mut sink, 0, 8, 0x1000, 0x40).unwrap();
        let bytes = sink.into_bytes();
        assert_eq!(&bytes[bytes.len() - 16..], &[0u8; 16]);
    }

    #[test]
    fn length_field_covers_the_body_not_itself() {
        let mut sink = VecSink::new();
        write_aranges(&mut sink, 0, 8, 0x1000, 0x40).unwrap();
        let bytes = sink.into_bytes();
        let recorded_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        assert_eq!(recorded_len, bytes.len() - 4);
    }
}
