//! The abbreviation table.
//!
//! `.debug_abbrev` is a table enumerating every TAG a DWARF producer can
//! emit, each with a terminated list of `(attribute, form)` pairs.
//! `gimli::write::Dwarf::write` performs the equivalent mechanism
//! internally — it derives each DIE's abbreviation from the attributes
//! actually `set` on it and deduplicates identical shapes into one
//! `.debug_abbrev` entry, so an attribute this crate never calls `set`
//! with simply never appears in the emitted output.
//!
//! What this module keeps under our own control is the *closed set* of
//! TAGs the rest of this crate is allowed to construct: [`die_kind`]
//! classifies a tag into one of the categories this builder recognizes (a
//! compilation unit, a subprogram, a variable, a parameter, a member, or a
//! type), and [`assert_supported`] is called by every DIE constructor in
//! [`crate::types`] and [`crate::roots`] so a future kind added to
//! `nativegen_codegen::ir::types::Kind` without a matching DWARF tag fails
//! loudly instead of silently emitting an untagged DIE.

use gimli::DwTag;

/// The category a supported tag belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DieKind {
    CompilationUnit,
    Subprogram,
    Variable,
    FormalParameter,
    UnspecifiedParameters,
    Member,
    Type,
}

/// Every tag this builder is permitted to emit, paired with its category.
///
/// The type-kind tags cover every variant this builder's `Kind` decoder
/// (`crate::types`) produces: primitives map to `base_type`, the
/// generic-composite synthesis in `crate::types::composite` produces
/// `structure_type` and `pointer_type`, arrays get `array_type` plus a
/// `subrange_type` child, and named aliases get `typedef`.
const SUPPORTED: &[(DwTag, DieKind)] = &[
    (gimli::DW_TAG_compile_unit, DieKind::CompilationUnit),
    (gimli::DW_TAG_subprogram, DieKind::Subprogram),
    (gimli::DW_TAG_variable, DieKind::Variable),
    (gimli::DW_TAG_formal_parameter, DieKind::FormalParameter),
    (gimli::DW_TAG_unspecified_parameters, DieKind::UnspecifiedParameters),
    (gimli::DW_TAG_member, DieKind::Member),
    (gimli::DW_TAG_base_type, DieKind::Type),
    (gimli::DW_TAG_pointer_type, DieKind::Type),
    (gimli::DW_TAG_structure_type, DieKind::Type),
    (gimli::DW_TAG_array_type, DieKind::Type),
    (gimli::DW_TAG_subrange_type, DieKind::Type),
    (gimli::DW_TAG_typedef, DieKind::Type),
    (gimli::DW_TAG_const_type, DieKind::Type),
    (gimli::DW_TAG_subroutine_type, DieKind::Type),
    (gimli::DW_TAG_enumeration_type, DieKind::Type),
    (gimli::DW_TAG_enumerator, DieKind::Type),
];

/// Look up the category of `tag`, if this builder is permitted to emit it.
pub fn die_kind(tag: DwTag) -> Option<DieKind> {
    SUPPORTED.iter().find(|(t, _)| *t == tag).map(|(_, k)| *k)
}

/// Panics (an internal invariant violation) if `tag` is not in the closed
/// set this builder supports.
pub fn assert_supported(tag: DwTag) {
    assert!(
        die_kind(tag).is_some(),
        "DWARF tag {} has no abbreviation entry in this builder",
        tag
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_category_is_represented() {
        for kind in [
            DieKind::CompilationUnit,
            DieKind::Subprogram,
            DieKind::Variable,
            DieKind::FormalParameter,
            DieKind::UnspecifiedParameters,
            DieKind::Member,
            DieKind::Type,
        ] {
            assert!(SUPPORTED.iter().any(|(_, k)| *k == kind), "missing {:?}", kind);
        }
    }

    #[test]
    fn unsupported_tag_is_rejected() {
        assert_eq!(die_kind(gimli::DW_TAG_lexical_block), None);
    }

    #[test]
    #[should_panic]
    fn assert_supported_panics_on_unknown_tag() {
        assert_supported(gimli::DW_TAG_lexical_block);
    }
}
