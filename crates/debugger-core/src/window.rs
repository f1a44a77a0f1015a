//! Memory-window computation: raw dump rows, printable-character
//! projection and the disassembly input window.

use crate::cpu::{Cpu, Word, MEMORY_WORDS};
use crate::disasm::{DisasmLine, Disassembler};
use crate::error::DebugError;

/// Total words in the raw dump window.
pub const DUMP_WORDS: usize = 256;
/// Words per dump row.
pub const DUMP_ROW_WORDS: usize = 8;
/// Number of dump rows (`DUMP_WORDS / DUMP_ROW_WORDS`).
pub const DUMP_ROWS: usize = DUMP_WORDS / DUMP_ROW_WORDS;
/// Words handed to the disassembler.
pub const DISASM_WINDOW_WORDS: usize = 32;
/// Words of context placed before the requested address in the disassembly
/// window, when the address is far enough from 0.
pub const DISASM_BACKTRACK_WORDS: Word = 16;

/// One 8-word dump row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DumpRow {
    /// Address of the first word in this row.
    pub base: Word,
    /// The row's raw words.
    pub words: [Word; DUMP_ROW_WORDS],
    /// `true` when the live program counter falls inside this row.
    pub contains_pc: bool,
}

/// Display-ready view of memory around an inspection address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryWindow {
    /// Requested (row-aligned) base address.
    pub base: Word,
    /// Program counter captured when the window was computed.
    pub pc: Word,
    /// Raw dump organized as [`DUMP_ROWS`] rows of [`DUMP_ROW_WORDS`] words.
    pub rows: Vec<DumpRow>,
    /// One glyph per dumped word: printable ASCII (`0x20..=0x7F`) rendered
    /// literally, everything else as `.`.
    pub glyphs: String,
    /// Start address of the disassembly input window.
    pub disasm_base: Word,
    /// Raw words handed to the disassembler.
    pub disasm_words: [Word; DISASM_WINDOW_WORDS],
}

impl MemoryWindow {
    /// Computes the window starting at `base`.
    ///
    /// The disassembly input window centers the requested address when
    /// possible: it starts [`DISASM_BACKTRACK_WORDS`] words earlier when
    /// `base` is above that margin, else at address 0.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::OutOfRangeWindow`] before any CPU read when
    /// `base + 256` would cross the top of the address space; the window
    /// never wraps.
    pub fn compute<C: Cpu + ?Sized>(base: Word, cpu: &C) -> Result<Self, DebugError> {
        if usize::from(base) + DUMP_WORDS > MEMORY_WORDS {
            return Err(DebugError::OutOfRangeWindow { base });
        }

        let pc = cpu.current_instruction();

        let mut rows = Vec::with_capacity(DUMP_ROWS);
        let mut glyphs = String::with_capacity(DUMP_WORDS);
        let mut row_base = base;
        for _ in 0..DUMP_ROWS {
            let mut words = [0; DUMP_ROW_WORDS];
            for (offset, slot) in words.iter_mut().enumerate() {
                let addr = row_base + Word::try_from(offset).unwrap_or(0);
                let word = cpu.get(u32::from(addr));
                *slot = word;
                glyphs.push(glyph_for(word));
            }
            rows.push(DumpRow {
                base: row_base,
                words,
                contains_pc: row_contains(row_base, pc),
            });
            // Wraps only after the final row; the guard above keeps every
            // read in bounds.
            row_base = row_base.wrapping_add(Word::try_from(DUMP_ROW_WORDS).unwrap_or(0));
        }

        let disasm_base = if base > DISASM_BACKTRACK_WORDS {
            base - DISASM_BACKTRACK_WORDS
        } else {
            0
        };
        let mut disasm_words = [0; DISASM_WINDOW_WORDS];
        for (offset, slot) in disasm_words.iter_mut().enumerate() {
            let addr = disasm_base + Word::try_from(offset).unwrap_or(0);
            *slot = cpu.get(u32::from(addr));
        }

        Ok(Self {
            base,
            pc,
            rows,
            glyphs,
            disasm_base,
            disasm_words,
        })
    }

    /// Hands the disassembly input window to `disassembler`, preserving the
    /// returned row order and highlight flags verbatim.
    #[must_use]
    pub fn disassemble<D: Disassembler + ?Sized>(&self, disassembler: &D) -> Vec<DisasmLine> {
        disassembler.disassemble(&self.disasm_words, self.pc, self.disasm_base)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn row_contains(row_base: Word, pc: Word) -> bool {
    pc.wrapping_sub(row_base) < DUMP_ROW_WORDS as Word
}

#[allow(clippy::cast_possible_truncation)]
const fn glyph_for(word: Word) -> char {
    if matches!(word, 0x20..=0x7F) {
        (word as u8) as char
    } else {
        '.'
    }
}

#[cfg(test)]
mod tests {
    use super::{
        MemoryWindow, DISASM_WINDOW_WORDS, DUMP_ROWS, DUMP_ROW_WORDS, DUMP_WORDS,
    };
    use crate::cpu::{Cpu, Word};
    use crate::disasm::{DisasmLine, Disassembler};
    use crate::error::DebugError;

    struct PatternCpu {
        pc: Word,
    }

    impl Cpu for PatternCpu {
        fn get(&self, addr: u32) -> Word {
            assert!(addr < 0x10000, "window reads must stay in real memory");
            Word::try_from(addr).expect("in range")
        }

        fn step(&mut self) {}

        fn run_pause(&mut self) {}

        fn is_pausing(&self) -> bool {
            true
        }

        fn current_instruction(&self) -> Word {
            self.pc
        }
    }

    struct EchoDisassembler;

    impl Disassembler for EchoDisassembler {
        fn disassemble(&self, window: &[Word], pc: Word, base: Word) -> Vec<DisasmLine> {
            window
                .iter()
                .enumerate()
                .map(|(offset, word)| DisasmLine {
                    text: format!("{word:#06x}"),
                    is_current: base + Word::try_from(offset).expect("small offset") == pc,
                })
                .collect()
        }
    }

    #[test]
    fn dump_covers_256_words_in_rows_of_8() {
        let cpu = PatternCpu { pc: 0x0000 };
        let window = MemoryWindow::compute(0x0100, &cpu).expect("in range");

        assert_eq!(window.rows.len(), DUMP_ROWS);
        assert_eq!(window.glyphs.chars().count(), DUMP_WORDS);
        assert_eq!(window.rows[0].base, 0x0100);
        assert_eq!(window.rows[0].words, [0x0100, 0x0101, 0x0102, 0x0103, 0x0104, 0x0105, 0x0106, 0x0107]);
        assert_eq!(window.rows[31].base, 0x01F8);
        assert_eq!(window.rows[31].words[7], 0x01FF);
    }

    #[test]
    fn pc_highlight_marks_exactly_the_covering_row() {
        let cpu = PatternCpu { pc: 0x0123 };
        let window = MemoryWindow::compute(0x0100, &cpu).expect("in range");

        let marked: Vec<usize> = window
            .rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| row.contains_pc.then_some(index))
            .collect();
        assert_eq!(marked, vec![4]); // 0x0120..=0x0127
    }

    #[test]
    fn glyphs_render_printable_ascii_and_dots() {
        let cpu = PatternCpu { pc: 0 };
        let window = MemoryWindow::compute(0x0000, &cpu).expect("in range");

        let glyphs: Vec<char> = window.glyphs.chars().collect();
        assert_eq!(glyphs[0x00], '.');
        assert_eq!(glyphs[0x1F], '.');
        assert_eq!(glyphs[0x20], ' ');
        assert_eq!(glyphs[0x41], 'A');
        assert_eq!(glyphs[0x7F], '\u{7f}');
        assert_eq!(glyphs[0x80], '.');
    }

    #[test]
    fn disasm_window_starts_at_zero_near_the_bottom() {
        let cpu = PatternCpu { pc: 0 };

        let window = MemoryWindow::compute(0x0000, &cpu).expect("in range");
        assert_eq!(window.disasm_base, 0);
        assert_eq!(window.disasm_words.len(), DISASM_WINDOW_WORDS);
        assert_eq!(window.disasm_words[0], 0x0000);

        // base == 16 is not "greater than 16", so no backtrack either.
        let window = MemoryWindow::compute(0x0010, &cpu).expect("in range");
        assert_eq!(window.disasm_base, 0);
    }

    #[test]
    fn disasm_window_centers_the_base_when_possible() {
        let cpu = PatternCpu { pc: 0 };
        let window = MemoryWindow::compute(0x0100, &cpu).expect("in range");

        assert_eq!(window.disasm_base, 0x00F0);
        assert_eq!(window.disasm_words[0], 0x00F0);
        assert_eq!(window.disasm_words[31], 0x010F);
    }

    #[test]
    fn window_past_the_top_is_rejected_before_any_read() {
        let cpu = PatternCpu { pc: 0 };

        assert_eq!(
            MemoryWindow::compute(0xFF08, &cpu).expect_err("must be rejected"),
            DebugError::OutOfRangeWindow { base: 0xFF08 }
        );

        // The highest admissible base touches 0xFFFF exactly.
        let window = MemoryWindow::compute(0xFF00, &cpu).expect("in range");
        assert_eq!(window.rows[31].words[DUMP_ROW_WORDS - 1], 0xFFFF);
    }

    #[test]
    fn disassembly_rows_pass_through_verbatim() {
        let cpu = PatternCpu { pc: 0x00F2 };
        let window = MemoryWindow::compute(0x0100, &cpu).expect("in range");

        let rows = window.disassemble(&EchoDisassembler);
        assert_eq!(rows.len(), DISASM_WINDOW_WORDS);
        assert_eq!(rows[0].text, "0x00f0");
        assert!(rows[2].is_current);
        assert_eq!(rows.iter().filter(|row| row.is_current).count(), 1);
    }
}
