//! Line-number history and the per-compilation-unit line program.
//!
//! The IR attaches two kinds of directive to a procedure's instruction
//! stream: a `z` entry pushes (or, carrying a negative sentinel offset,
//! pops) a source file onto a per-procedure file stack, and a `Z` entry
//! updates the logical line number at the top of that stack. Entering a
//! procedure whose `z`-chain starts at offset 1 resets this history and
//! replays the chain from scratch. [`LineHistory`] owns that stack and a
//! sorted-by-construction list of landmarks — "at this absolute program
//! line, the source position was (file, line)" — so that per-instruction
//! emission can find the enclosing landmark for any absolute line with a
//! descending search.
//!
//! Turning a resolved `(file, line)` pair plus an instruction's address
//! into the DWARF special-opcode encoding is `gimli::write::LineProgram`'s
//! job (`LineProgram::row` / `generate_row` compute the special opcode,
//! or fall back to `advance_pc`/`advance_line`/`copy`, from the parameters
//! `crate::roots::LINE_ENCODING` already fixed); this module only has to
//! feed it the right `(address, file, line)` triples. `gimli::write`
//! always emits that program against the full twelve-entry standard
//! opcode table (`opcode_base = 13`), which it has no public knob to
//! override; [`force_opcode_base_five`] rewrites the finished section down
//! to the `opcode_base = 5` `SPEC_FULL.md` §4.11 fixes.

use gimli::write::FileId;

use crate::roots::Roots;

/// One directive from the IR's compressed file/line history stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZEntry {
    /// Push a source file onto the stack.
    PushFile(String),
    /// Pop the top of the file stack (the negative-sentinel-offset `z`).
    PopFile,
    /// Set the logical line number at the top of the stack.
    SetLine(u64),
}

/// An absolute program line mapped to a resolved source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Landmark {
    abs_line: u64,
    file: FileId,
    line: u64,
}

/// File/line history reconstructed from a procedure's `z`/`Z` chain.
///
/// Scoped to one compilation unit: [`reset`](Self::reset) is called whenever a
/// procedure's `z`-chain starts at offset 1, and [`apply`](Self::apply)
/// replays the rest of the chain, appending one [`Landmark`] per
/// distinct absolute line.
pub struct LineHistory {
    file_stack: Vec<FileId>,
    landmarks: Vec<Landmark>,
}

impl LineHistory {
    pub fn new() -> Self {
        LineHistory {
            file_stack: Vec::new(),
            landmarks: Vec::new(),
        }
    }

    /// Reset the file stack and landmark list for a new procedure whose
    /// `z`-chain starts at offset 1.
    pub fn reset(&mut self) {
        self.file_stack.clear();
        self.landmarks.clear();
    }

    /// Replay one `z`/`Z` directive at absolute program line `abs_line`,
    /// recording a landmark whenever a `Z` entry resolves a (file, line)
    /// pair against the current top of the file stack.
    pub fn apply(&mut self, roots: &mut Roots, abs_line: u64, entry: &ZEntry) {
        match entry {
            ZEntry::PushFile(path) => {
                let id = roots.add_file(path);
                self.file_stack.push(id);
            }
            ZEntry::PopFile => {
                self.file_stack.pop();
            }
            ZEntry::SetLine(line) => {
                if let Some(&file) = self.file_stack.last() {
                    self.landmarks.push(Landmark {
                        abs_line,
                        file,
                        line: *line,
                    });
                }
            }
        }
    }

    /// The file currently on top of the stack, if any.
    pub fn current_file(&self) -> Option<FileId> {
        self.file_stack.last().copied()
    }

    /// Find the landmark enclosing `abs_line`: the greatest recorded
    /// landmark whose `abs_line` is `<= abs_line`. Landmarks are appended
    /// in non-decreasing `abs_line` order by [`apply`](Self::apply), so a
    /// descending linear scan from the most recent entry finds it in
    /// constant time for the common case of emitting rows in program order.
    pub fn lookup(&self, abs_line: u64) -> Option<(FileId, u64)> {
        self.landmarks
            .iter()
            .rev()
            .find(|lm| lm.abs_line <= abs_line)
            .map(|lm| (lm.file, lm.line))
    }

    /// Append one row to this unit's line program for the instruction at
    /// `address_offset` whose absolute program line is `abs_line`.
    /// Returns `false` (and emits nothing) if no landmark covers this line
    /// yet — an instruction preceding the procedure's first `Z`.
    pub fn emit_row(&self, roots: &mut Roots, address_offset: u64, abs_line: u64) -> bool {
        let Some((file, line)) = self.lookup(abs_line) else {
            return false;
        };
        let line_program = roots.line_program_mut();
        let row = line_program.row();
        row.address_offset = address_offset;
        row.file = file;
        row.line = line;
        row.is_stmt = true;
        line_program.generate_row();
        true
    }
}

impl Default for LineHistory {
    fn default() -> Self {
        Self::new()
    }
}

// DWARF v3 §6.2.4 line-number program header layout for the DWARF32,
// version-3 encoding `crate::roots::Roots::new` always constructs (no
// `maximum_operations_per_instruction` field; that's a DWARF4 addition):
// unit_length(4) version(2) header_length(4) minimum_instruction_length(1)
// default_is_stmt(1) line_base(1) line_range(1) opcode_base(1)
// standard_opcode_lengths(opcode_base - 1) include_directories file_names.
const OPCODE_BASE_OFFSET: usize = 14;
const STANDARD_OPCODE_LENGTHS_OFFSET: usize = 15;

/// The four standard opcodes this builder's line program ever emits
/// (`DW_LNS_copy`, `advance_pc`, `advance_line`, `set_file`) and the
/// operand count DWARF §6.2.5.2 assigns each.
const FIXED_STANDARD_OPCODE_LENGTHS: [u8; 4] = [0, 1, 1, 1];
const FIXED_OPCODE_BASE: u8 = 5;

/// Rewrite a `gimli`-produced `.debug_line` section down to the
/// `opcode_base = 5` `SPEC_FULL.md` §4.11 fixes.
///
/// `gimli::write::LineProgram` has no public knob for `opcode_base`; it
/// always emits the full DWARF standard opcode table (`opcode_base =
/// 13`). This shrinks `standard_opcode_lengths` to the four entries this
/// builder's rows actually use and shifts every special-opcode byte in
/// the program down by the same amount the base moved, so each one still
/// decodes to the identical `(line, address)` advance under the
/// `line_base`/`line_range` `crate::roots::LINE_ENCODING` fixes on both
/// sides of the rewrite. A no-op if the section already carries
/// `opcode_base = 5`.
pub fn force_opcode_base_five(section: &[u8]) -> Vec<u8> {
    let old_opcode_base = section[OPCODE_BASE_OFFSET];
    if old_opcode_base == FIXED_OPCODE_BASE {
        return section.to_vec();
    }
    debug_assert!(old_opcode_base > FIXED_OPCODE_BASE);

    let old_std_len = (old_opcode_base - 1) as usize;
    let std_lengths_end = STANDARD_OPCODE_LENGTHS_OFFSET + old_std_len;
    let std_lengths = &section[STANDARD_OPCODE_LENGTHS_OFFSET..std_lengths_end];
    let program_start = skip_file_tables(section, std_lengths_end);

    let mut out = Vec::with_capacity(section.len());
    out.extend_from_slice(&section[..OPCODE_BASE_OFFSET]);
    out.push(FIXED_OPCODE_BASE);
    out.extend_from_slice(&FIXED_STANDARD_OPCODE_LENGTHS);
    out.extend_from_slice(&section[std_lengths_end..program_start]);
    rewrite_program(&section[program_start..], old_opcode_base, std_lengths, &mut out);

    let shrink = (old_std_len - FIXED_STANDARD_OPCODE_LENGTHS.len()) as u32;
    let unit_length = read_u32(&out, 0) - shrink;
    let header_length = read_u32(&out, 6) - shrink;
    patch_u32(&mut out, 0, unit_length);
    patch_u32(&mut out, 6, header_length);
    out
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(data[at..at + 4].try_into().unwrap())
}

fn patch_u32(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Consume one (U)LEB128-encoded value starting at `*pos`, advancing past
/// it and returning its value. Used both to skip an operand whose sign
/// doesn't matter for re-encoding and to decode an extended opcode's
/// length prefix.
fn read_leb128(data: &[u8], pos: &mut usize) -> u64 {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        let byte = data[*pos];
        *pos += 1;
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    result
}

fn skip_cstr(data: &[u8], pos: &mut usize) {
    while data[*pos] != 0 {
        *pos += 1;
    }
    *pos += 1;
}

/// Walk past `include_directories` and `file_names` (neither depends on
/// `opcode_base`), returning the section-relative offset where the
/// line-number program's instruction stream begins.
fn skip_file_tables(section: &[u8], mut pos: usize) -> usize {
    while section[pos] != 0 {
        skip_cstr(section, &mut pos);
    }
    pos += 1; // include_directories terminator

    while section[pos] != 0 {
        skip_cstr(section, &mut pos); // name
        read_leb128(section, &mut pos); // directory index
        read_leb128(section, &mut pos); // last modification time
        read_leb128(section, &mut pos); // file length
    }
    pos += 1; // file_names terminator

    pos
}

/// Copy the instruction stream to `out`, remapping every special opcode
/// byte (`>= old_opcode_base`) down by `old_opcode_base -
/// FIXED_OPCODE_BASE` and leaving standard (`crate::line` only ever
/// emits 1-4, but this decodes any of 1-12 correctly per
/// `old_std_lengths`) and extended opcodes (the `0`-prefixed,
/// ULEB128-length-delimited escape) untouched.
fn rewrite_program(program: &[u8], old_opcode_base: u8, old_std_lengths: &[u8], out: &mut Vec<u8>) {
    let mut pos = 0;
    while pos < program.len() {
        let start = pos;
        let opcode = program[pos];
        if opcode == 0 {
            pos += 1;
            let len = read_leb128(program, &mut pos) as usize;
            pos += len;
        } else if opcode < old_opcode_base {
            pos += 1;
            if opcode == gimli::DW_LNS_fixed_advance_pc.0 {
                pos += 2; // a uhalf, not a ULEB128 operand
            } else {
                let operands = old_std_lengths.get((opcode - 1) as usize).copied().unwrap_or(0);
                for _ in 0..operands {
                    read_leb128(program, &mut pos);
                }
            }
        } else {
            pos += 1;
        }
        if opcode >= old_opcode_base {
            out.push(opcode - (old_opcode_base - FIXED_OPCODE_BASE));
        } else {
            out.extend_from_slice(&program[start..pos]);
        }
    }
}

#[cfg(test)]
mod force_opcode_base_tests {
    use super::*;

    /// A synthetic DWARF v3 `.debug_line` section with `opcode_base = 13`
    /// (the full standard table, as `gimli::write` always emits), one
    /// registered file, and a program consisting of one special opcode
    /// followed by a `DW_LNE_end_sequence`.
    fn gimli_shaped_section() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&100u32.to_le_bytes()); // unit_length (placeholder)
        b.extend_from_slice(&3u16.to_le_bytes()); // version
        b.extend_from_slice(&50u32.to_le_bytes()); // header_length (placeholder)
        b.push(1); // minimum_instruction_length
        b.push(1); // default_is_stmt
        b.push(0xff); // line_base = -1
        b.push(4); // line_range
        b.push(13); // opcode_base
        b.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]); // standard_opcode_lengths[12]
        b.push(0); // include_directories terminator
        b.extend_from_slice(b"a.go\0");
        b.extend_from_slice(&[0, 0, 0]); // dir index, mtime, length
        b.push(0); // file_names terminator
        b.push(20); // a special opcode under opcode_base = 13
        b.extend_from_slice(&[0x00, 0x01, 0x01]); // DW_LNE_end_sequence
        b
    }

    #[test]
    fn shrinks_opcode_base_and_the_standard_opcode_table() {
        let out = force_opcode_base_five(&gimli_shaped_section());
        assert_eq!(out[OPCODE_BASE_OFFSET], 5);
        assert_eq!(&out[STANDARD_OPCODE_LENGTHS_OFFSET..STANDARD_OPCODE_LENGTHS_OFFSET + 4], &[0, 1, 1, 1]);
    }

    #[test]
    fn remaps_the_special_opcode_and_preserves_the_extended_opcode() {
        let out = force_opcode_base_five(&gimli_shaped_section());
        let program_start = out.len() - 4; // one remapped special opcode + 3-byte end-sequence
        assert_eq!(out[program_start], 20 - 8); // 13 - 5 == 8
        assert_eq!(&out[program_start + 1..], &[0x00, 0x01, 0x01]);
    }

    #[test]
    fn preserves_the_file_table_and_shrinks_the_length_fields() {
        let input = gimli_shaped_section();
        let out = force_opcode_base_five(&input);
        assert_eq!(out.len(), input.len() - 8);
        assert_eq!(read_u32(&out, 0), read_u32(&input, 0) - 8);
        assert_eq!(read_u32(&out, 6), read_u32(&input, 6) - 8);
        assert!(out.windows(5).any(|w| w == b"a.go\0"));
    }

    #[test]
    fn is_idempotent_once_opcode_base_is_already_five() {
        let out = force_opcode_base_five(&gimli_shaped_section());
        assert_eq!(force_opcode_base_five(&out), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::RootsConfig;

    fn test_roots() -> Roots {
        Roots::new(RootsConfig {
            address_size: 8,
            producer: "nativegen",
            comp_dir: "/src",
            comp_name: "main.go",
            language: gimli::DwLang(0x8000),
        })
    }

    #[test]
    fn push_and_set_line_records_a_landmark() {
        let mut roots = test_roots();
        let mut hist = LineHistory::new();
        hist.reset();
        hist.apply(&mut roots, 0, &ZEntry::PushFile("main.go".into()));
        hist.apply(&mut roots, 1, &ZEntry::SetLine(10));
        assert_eq!(hist.lookup(5), Some((hist.current_file().unwrap(), 10)));
    }

    #[test]
    fn lookup_finds_the_nearest_preceding_landmark() {
        let mut roots = test_roots();
        let mut hist = LineHistory::new();
        hist.reset();
        hist.apply(&mut roots, 0, &ZEntry::PushFile("a.go".into()));
        hist.apply(&mut roots, 1, &ZEntry::SetLine(3));
        hist.apply(&mut roots, 10, &ZEntry::SetLine(4));
        assert_eq!(hist.lookup(5).map(|(_, l)| l), Some(3));
        assert_eq!(hist.lookup(20).map(|(_, l)| l), Some(4));
        assert_eq!(hist.lookup(0).map(|(_, l)| l), Some(3));
    }

    #[test]
    fn pop_file_clears_the_current_file() {
        let mut roots = test_roots();
        let mut hist = LineHistory::new();
        hist.reset();
        hist.apply(&mut roots, 0, &ZEntry::PushFile("a.go".into()));
        hist.apply(&mut roots, 1, &ZEntry::PopFile);
        assert_eq!(hist.current_file(), None);
    }

    #[test]
    fn reset_clears_landmarks_between_procedures() {
        let mut roots = test_roots();
        let mut hist = LineHistory::new();
        hist.reset();
        hist.apply(&mut roots, 0, &ZEntry::PushFile("a.go".into()));
        hist.apply(&mut roots, 1, &ZEntry::SetLine(3));
        hist.reset();
        assert_eq!(hist.lookup(1), None);
    }
}
