//! The three process-wide DIE roots and the single physical DWARF tree
//! they index into.
//!
//! There are conceptually three roots: a root of compilation units, a root
//! of types, a root of globals. This back end compiles one package per
//! invocation into one compilation unit — linking multiple packages'
//! object files together is the external linker's job, not this crate's —
//! so "the root of compilation units" is `gimli::write::Dwarf::units`
//! (a `UnitTable`) holding exactly the one `Unit` this crate ever
//! populates; the type and global roots are modeled as two indices into
//! that unit's single DIE tree: [`Roots::type_cache`] (a name-keyed dedup
//! map — types are deduplicated by name within the types root) and
//! [`Roots::globals`] (the list of top-level `DW_TAG_variable` DIEs).
//! `Roots::subprograms` is the equivalent list for functions, needed
//! wherever `.debug_pubnames` indexes the same way.

use gimli::write::{
    Address, AttributeValue, Dwarf, FileId, LineProgram, LineString, StringId, Unit, UnitEntryId,
    UnitId,
};
use gimli::{DwTag, Encoding, Format, LineEncoding};
use rustc_hash::FxHashMap;

use crate::abbrev;

/// Everything this crate needs to thread through a single compile: the
/// physical `gimli::write::Dwarf` tree plus the bookkeeping for the three
/// logical roots layered on top of it.
pub struct Roots {
    pub dwarf: Dwarf,
    pub unit_id: UnitId,
    pub cu_die: UnitEntryId,
    type_cache: FxHashMap<String, UnitEntryId>,
    file_cache: FxHashMap<String, FileId>,
    pub subprograms: Vec<UnitEntryId>,
    pub globals: Vec<UnitEntryId>,
}

/// Parameters fixed at the start of a compile: the target's address size,
/// the producer string, and the compile-time working directory and main
/// source file recorded on the compilation-unit DIE.
pub struct RootsConfig<'a> {
    pub address_size: u8,
    pub producer: &'a str,
    pub comp_dir: &'a str,
    pub comp_name: &'a str,
    /// Vendor-defined language code (DWARF's 0x8000-0xffff range is
    /// reserved for this); no standard DWARF language constant is
    /// assigned to this back end's source language.
    pub language: gimli::DwLang,
}

/// The line-number program parameters this builder fixes exactly: minimum
/// instruction length 1, default-is-statement true, line base -1, line
/// range 4. `opcode_base` isn't one of [`LineEncoding`]'s fields — `gimli`
/// always derives it from the full DWARF standard opcode table — so this
/// crate's own `opcode_base = 5` (`SPEC_FULL.md` §4.11) is enforced
/// separately, by [`crate::line::force_opcode_base_five`] rewriting the
/// finished section.
pub(crate) const LINE_ENCODING: LineEncoding = LineEncoding {
    minimum_instruction_length: 1,
    maximum_operations_per_instruction: 1,
    default_is_stmt: true,
    line_base: -1,
    line_range: 4,
};

impl Roots {
    /// Start a fresh DWARF v3 tree with one compilation unit.
    pub fn new(cfg: RootsConfig<'_>) -> Self {
        let encoding = Encoding {
            format: Format::Dwarf32,
            version: 3,
            address_size: cfg.address_size,
        };

        let mut dwarf = Dwarf::default();

        let comp_dir = LineString::new(cfg.comp_dir.as_bytes(), encoding, &mut dwarf.line_strings);
        let comp_name = LineString::new(cfg.comp_name.as_bytes(), encoding, &mut dwarf.line_strings);
        let line_program = LineProgram::new(encoding, LINE_ENCODING, comp_dir, comp_name, None);

        let mut unit = Unit::new(encoding, line_program);
        let cu_die = unit.root();
        {
            let producer = dwarf.strings.add(cfg.producer);
            let comp_name_str = dwarf.strings.add(cfg.comp_name);
            let comp_dir_str = dwarf.strings.add(cfg.comp_dir);
            let die = unit.get_mut(cu_die);
            die.set(gimli::DW_AT_producer, AttributeValue::StringRef(producer));
            die.set(gimli::DW_AT_name, AttributeValue::StringRef(comp_name_str));
            die.set(gimli::DW_AT_comp_dir, AttributeValue::StringRef(comp_dir_str));
            die.set(gimli::DW_AT_language, AttributeValue::Language(cfg.language));
            die.set(gimli::DW_AT_low_pc, AttributeValue::Address(Address::Constant(0)));
        }

        let unit_id = dwarf.units.add(unit);

        Roots {
            dwarf,
            unit_id,
            cu_die,
            type_cache: FxHashMap::default(),
            file_cache: FxHashMap::default(),
            subprograms: Vec::new(),
            globals: Vec::new(),
        }
    }

    /// Borrow the single unit this crate populates.
    pub fn unit(&self) -> &Unit {
        self.dwarf.units.get(self.unit_id)
    }

    /// Mutably borrow the single unit this crate populates.
    pub fn unit_mut(&mut self) -> &mut Unit {
        self.dwarf.units.get_mut(self.unit_id)
    }

    /// Intern a string in this unit's string table.
    pub fn string(&mut self, s: &str) -> StringId {
        self.dwarf.strings.add(s)
    }

    /// Create a new DIE of `tag` as a child of `parent`, asserting `tag` is
    /// one this builder's abbreviation table supports.
    pub fn add_die(&mut self, parent: UnitEntryId, tag: DwTag) -> UnitEntryId {
        abbrev::assert_supported(tag);
        self.unit_mut().add(parent, tag)
    }

    /// Look up a previously-built type DIE by its source-level name.
    /// Types are deduplicated by name within the types root.
    pub fn lookup_type(&self, name: &str) -> Option<UnitEntryId> {
        self.type_cache.get(name).copied()
    }

    /// Record a newly-built type DIE under its name so later lookups hit
    /// the cache instead of re-synthesizing it.
    pub fn insert_type(&mut self, name: String, id: UnitEntryId) {
        self.type_cache.insert(name, id);
    }

    /// Record a function DIE for later `.debug_pubnames`/`.debug_aranges`
    /// indexing.
    pub fn push_subprogram(&mut self, id: UnitEntryId) {
        self.subprograms.push(id);
    }

    /// Record a package-level global variable DIE for later
    /// `.debug_pubnames` indexing.
    pub fn push_global(&mut self, id: UnitEntryId) {
        self.globals.push(id);
    }

    /// Borrow this unit's line-number program.
    pub fn line_program_mut(&mut self) -> &mut LineProgram {
        &mut self.dwarf.units.get_mut(self.unit_id).line_program
    }

    /// Register `path` as a source file in this unit's line program,
    /// reusing the existing entry if `path` has already been registered.
    ///
    /// `LineString::new` needs this `Dwarf`'s shared `line_strings` table
    /// while `LineProgram::add_file` needs the unit's own line program —
    /// two different fields of two different structs, so this method
    /// destructures `self.dwarf` to borrow both independently rather than
    /// going through `unit_mut()`, which would borrow the whole `Dwarf`.
    pub fn add_file(&mut self, path: &str) -> FileId {
        if let Some(id) = self.file_cache.get(path) {
            return *id;
        }
        let Dwarf { units, line_strings, .. } = &mut self.dwarf;
        let unit = units.get_mut(self.unit_id);
        let name = LineString::new(path.as_bytes(), unit.encoding(), line_strings);
        let dir = unit.line_program.default_directory();
        let id = unit.line_program.add_file(name, dir, None);
        self.file_cache.insert(path.to_string(), id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_roots() -> Roots {
        Roots::new(RootsConfig {
            address_size: 8,
            producer: "nativegen",
            comp_dir: "/src",
            comp_name: "main.ng",
            language: gimli::DwLang(0x8000),
        })
    }

    #[test]
    fn cu_die_carries_a_name() {
        let roots = test_roots();
        let die = roots.unit().get(roots.cu_die);
        assert!(die.get(gimli::DW_AT_name).is_some());
    }

    #[test]
    fn type_cache_round_trips() {
        let mut roots = test_roots();
        assert!(roots.lookup_type("int32").is_none());
        let id = roots.add_die(roots.cu_die, gimli::DW_TAG_base_type);
        roots.insert_type("int32".to_string(), id);
        assert_eq!(roots.lookup_type("int32"), Some(id));
    }

    #[test]
    #[should_panic]
    fn add_die_rejects_unsupported_tags() {
        let mut roots = test_roots();
        roots.add_die(roots.cu_die, gimli::DW_TAG_lexical_block);
    }
}
