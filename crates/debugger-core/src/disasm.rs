//! Disassembler collaborator surface.
//!
//! The disassembly algorithm lives outside this core; the debugger hands it
//! a memory window and preserves the returned rows verbatim, including
//! their order and current-instruction highlight flags.

use crate::cpu::Word;

/// One disassembled row as produced by the external disassembler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DisasmLine {
    /// Rendered mnemonic and operands.
    pub text: String,
    /// `true` when this row holds the instruction at the program counter.
    pub is_current: bool,
}

/// Turns a raw memory window into ordered disassembly rows.
pub trait Disassembler {
    /// Disassembles `window`, which starts at memory address `base`, marking
    /// the row containing `pc` as current.
    fn disassemble(&self, window: &[Word], pc: Word, base: Word) -> Vec<DisasmLine>;
}
