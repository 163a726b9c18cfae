//! DWARF v3 debug-info builder.
//!
//! Consumes the resolved type and procedure descriptors the front end and
//! [`nativegen_codegen`] produce and emits the debug sections a linker
//! embeds alongside the generated code: `.debug_info`/`.debug_abbrev`
//! (built atop `gimli::write`, see [`roots`] and [`types`]),
//! `.debug_line` (see [`line`]), `.debug_frame` (see [`frame`]), and the
//! three sections `gimli::write` has no support for and this crate writes
//! by hand over its own [`sink::Sink`] abstraction: `.debug_pubnames`/
//! `.debug_pubtypes` ([`pubnames`]), `.debug_aranges` ([`aranges`]), and
//! `.debug_gdb_scripts` ([`gdbscripts`]).
//!
//! [`roots::Roots`] is the single piece of state threaded through a
//! compile: the physical `gimli::write::Dwarf` tree plus the bookkeeping
//! for the three logical roots (compilation units, types, globals) laid
//! on top of it.

pub mod abbrev;
pub mod aranges;
pub mod frame;
pub mod gdbscripts;
pub mod info;
pub mod line;
pub mod pubnames;
pub mod result;
pub mod roots;
pub mod sink;
pub mod types;

pub use result::{DwarfError, DwarfResult};
pub use roots::{Roots, RootsConfig};
