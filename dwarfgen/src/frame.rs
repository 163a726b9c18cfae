//! `.debug_frame` builder.
//!
//! One CIE is shared by every function in the compilation unit; the CIE
//! fixes the call-frame-information parameters this back end never
//! varies per function (code alignment, data alignment, the
//! return-address column). Each function then contributes exactly one
//! FDE recording how its canonical frame address moves as the
//! instruction pointer advances through the function, derived from the
//! per-instruction stack-pointer-adjustment deltas `lower::frame`
//! (`nativegen_codegen`) computes while finalising a procedure's frame.

use gimli::write::{
    Address, CallFrameInstruction, CommonInformationEntry, FrameDescriptionEntry, FrameTable,
};
use gimli::{Encoding, Register};

use crate::result::{DwarfError, DwarfResult};

/// The default fake DWARF register column used as the return-address
/// register, since this target's actual return address lives on the
/// stack rather than in a register. Overridable via
/// [`FrameConfig::fake_return_column`] as long as it avoids every real
/// register column of the target ISA.
pub const DEFAULT_FAKE_RETURN_COLUMN: u8 = 16;

/// Call-frame-information parameters fixed once per compile.
pub struct FrameConfig<'a> {
    pub encoding: Encoding,
    /// The DWARF register number of the target's stack pointer, used for
    /// the CIE's default CFA rule (`sp + pointer_width`).
    pub stack_pointer: Register,
    pub pointer_width: u8,
    /// The fake return-address column (`config::Options::fake_return_column`
    /// on the code-generator side). Defaults to
    /// [`DEFAULT_FAKE_RETURN_COLUMN`].
    pub fake_return_column: u8,
    /// Every DWARF register column the target ISA assigns to a real
    /// register, so [`FrameBuilder::new`] can reject a `fake_return_column`
    /// that collides with one.
    pub real_register_columns: &'a [u8],
}

/// A change in the canonical frame address's offset from the stack
/// pointer at a given code offset within a function, e.g. a `sub $N, sp`
/// prologue instruction or a matching epilogue restore.
#[derive(Debug, Clone, Copy)]
pub struct CfaDelta {
    /// Byte offset from the function's entry address.
    pub code_offset: u32,
    /// The CFA's new offset from the stack pointer.
    pub cfa_offset: i64,
}

/// Accumulates the one CIE and per-function FDEs that make up
/// `.debug_frame`.
pub struct FrameBuilder {
    table: FrameTable,
    cie_id: gimli::write::CieId,
}

impl FrameBuilder {
    /// Start a new `.debug_frame` with a single shared CIE: code
    /// alignment 1, data alignment -4, return-address register =
    /// `cfg.fake_return_column`, default CFA = `sp + pointer_width`.
    /// Fails if `cfg.fake_return_column` collides with one of
    /// `cfg.real_register_columns`.
    pub fn new(cfg: &FrameConfig<'_>) -> DwarfResult<Self> {
        if cfg.real_register_columns.contains(&cfg.fake_return_column) {
            return Err(DwarfError::FakeColumnCollision(cfg.fake_return_column));
        }

        let mut cie = CommonInformationEntry::new(
            cfg.encoding,
            1,
            -4,
            Register(cfg.fake_return_column as u16),
        );
        cie.add_instruction(CallFrameInstruction::Cfa(cfg.stack_pointer, cfg.pointer_width as i64));

        let mut table = FrameTable::default();
        let cie_id = table.add_cie(cie);
        Ok(FrameBuilder { table, cie_id })
    }

    /// Add the FDE for one function, encoding `deltas` as a sequence of
    /// `DW_CFA_def_cfa_offset` instructions advanced to their code
    /// offsets. `deltas` must be sorted by `code_offset`; the first delta
    /// is typically the prologue's stack-allocation instruction.
    pub fn add_function(&mut self, address: Address, length: u32, deltas: &[CfaDelta]) {
        let mut fde = FrameDescriptionEntry::new(address, length);
        for delta in deltas {
            fde.add_instruction(
                delta.code_offset,
                CallFrameInstruction::CfaOffset(delta.cfa_offset),
            );
        }
        self.table.add_fde(self.cie_id, fde);
    }

    pub fn into_table(self) -> FrameTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimli::Format;

    const REAL_COLUMNS: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];

    fn test_config() -> FrameConfig<'static> {
        FrameConfig {
            encoding: Encoding {
                format: Format::Dwarf32,
                version: 3,
                address_size: 8,
            },
            stack_pointer: Register(7),
            pointer_width: 8,
            fake_return_column: DEFAULT_FAKE_RETURN_COLUMN,
            real_register_columns: REAL_COLUMNS,
        }
    }

    #[test]
    fn builds_one_cie_and_accepts_an_fde_per_function() {
        let mut builder = FrameBuilder::new(&test_config()).unwrap();
        builder.add_function(
            Address::Constant(0),
            64,
            &[CfaDelta { code_offset: 4, cfa_offset: 32 }],
        );
        builder.add_function(
            Address::Constant(64),
            32,
            &[CfaDelta { code_offset: 4, cfa_offset: 16 }],
        );
        let _table = builder.into_table();
    }

    #[test]
    fn fake_return_column_colliding_with_a_real_register_is_rejected() {
        let mut cfg = test_config();
        cfg.fake_return_column = 3;
        assert!(FrameBuilder::new(&cfg).is_err());
    }
}
