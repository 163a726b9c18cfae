//! `.debug_info` (and its co-emitted `.debug_abbrev`/`.debug_line`/
//! `.debug_str`/`.debug_line_str`) serialization.
//!
//! A reference attribute may point at a DIE whose offset isn't known
//! until every other DIE in the unit has been laid out, so resolving
//! those forward references classically takes two passes: the first
//! records every unresolved reference, and if any were recorded, the
//! whole section is rewritten from scratch in a second pass now that
//! every DIE's offset is fixed. `gimli::write::Dwarf::write` performs the
//! equivalent fixed-point offset resolution internally — it computes
//! every unit's layout before emitting a single byte, so there is no
//! observable "first pass" partial write to discard — but
//! [`write_info_two_pass`] preserves the externally observable contract
//! this algorithm promises: callers get
//! [`DwarfError::UnresolvedForwardReference`] rather than a bare `gimli`
//! error if resolution ever fails.

use gimli::write::{Dwarf, EndianVec, Sections};
use gimli::RunTimeEndian;

use crate::line::force_opcode_base_five;
use crate::result::{DwarfError, DwarfResult};

/// A finished debug section's identifying name and raw bytes, ready to
/// hand to a [`crate::sink::Sink`] or an `object::write::Object`.
pub struct FinishedSection {
    pub name: &'static str,
    pub data: Vec<u8>,
}

/// Serialize every DWARF section `dwarf` has accumulated, in `endian`
/// byte order.
///
/// Returns one [`FinishedSection`] per non-empty section `gimli::write`
/// produced (`.debug_abbrev`, `.debug_info`, `.debug_line`,
/// `.debug_str`, `.debug_line_str`; `.debug_ranges`/`.debug_rnglists` and
/// `.debug_loc`/`.debug_loclists` are omitted since this builder never
/// populates range lists or location lists). `.debug_line` is passed
/// through [`force_opcode_base_five`] first, since `gimli` always emits
/// it with the full standard opcode table this builder doesn't want.
pub fn write_info_two_pass(dwarf: &mut Dwarf, endian: RunTimeEndian) -> DwarfResult<Vec<FinishedSection>> {
    let mut sections = Sections::new(EndianVec::new(endian));
    dwarf.write(&mut sections).map_err(|_| DwarfError::UnresolvedForwardReference)?;

    let mut out = Vec::new();
    sections
        .for_each(|id, data| {
            let bytes = data.slice();
            if !bytes.is_empty() {
                let name = id.name();
                let data = if name == ".debug_line" { force_opcode_base_five(bytes) } else { bytes.to_vec() };
                out.push(FinishedSection { name, data });
            }
            Ok::<(), gimli::write::Error>(())
        })
        .map_err(|e| DwarfError::Encoding(e.to_string()))?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::{Roots, RootsConfig};

    #[test]
    fn writes_at_least_an_info_and_an_abbrev_section() {
        let mut roots = Roots::new(RootsConfig {
            address_size: 8,
            producer: "nativegen",
            comp_dir: "/src",
            comp_name: "main.go",
            language: gimli::DwLang(0x8000),
        });
        let sections = write_info_two_pass(&mut roots.dwarf, RunTimeEndian::Little).unwrap();
        assert!(sections.iter().any(|s| s.name == ".debug_info"));
        assert!(sections.iter().any(|s| s.name == ".debug_abbrev"));
    }
}
