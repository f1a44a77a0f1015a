//! Address-token resolution and row alignment for the inspection cursor.

use crate::cpu::{Cpu, Register, Word};
use crate::error::DebugError;

/// Width of one memory-dump row; resolved addresses are floored to this.
pub const ROW_WORDS: Word = 8;

/// Floors an address to the nearest 8-word row boundary.
///
/// Purely a display-row concept, not a CPU one. Alignment is idempotent and
/// clamps naturally at address 0.
#[must_use]
pub const fn align_to_row(addr: Word) -> Word {
    addr - addr % ROW_WORDS
}

/// The address currently selected for inspection.
///
/// While `tracks_pc` is set the address is recomputed from the program
/// counter after every single-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cursor {
    /// Row-aligned address under inspection.
    pub address: Word,
    /// Whether the cursor follows the program counter across steps.
    pub tracks_pc: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            address: 0,
            tracks_pc: true,
        }
    }
}

/// Resolves an address token against the live CPU state.
///
/// Token grammar:
/// - a register mnemonic (ASCII case-insensitive) resolves through the
///   **value** of that register, read via its mapped address; `PC` reads the
///   current-instruction pointer and marks the cursor as PC-tracking;
/// - `0x`/`0X` followed by at least one digit parses as base 16;
/// - anything else parses as base 10.
///
/// The resolved address is floored to the 8-word row. Values that do not
/// fit a [`Word`] are rejected rather than truncated.
///
/// # Errors
///
/// Returns [`DebugError::AddressParse`] for an unparseable token; the
/// caller's previous cursor is left untouched.
pub fn resolve_token<C: Cpu + ?Sized>(token: &str, cpu: &C) -> Result<Cursor, DebugError> {
    if let Some(reg) = Register::from_mnemonic(token) {
        if reg == Register::Pc {
            return Ok(Cursor {
                address: align_to_row(cpu.current_instruction()),
                tracks_pc: true,
            });
        }
        return Ok(Cursor {
            address: align_to_row(cpu.get(reg.mapped_address())),
            tracks_pc: false,
        });
    }

    let hex_digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"));
    let parsed = match hex_digits {
        Some(digits) if !digits.is_empty() => Word::from_str_radix(digits, 16),
        _ => token.parse::<Word>(),
    };

    parsed.map_or_else(
        |_| {
            Err(DebugError::AddressParse {
                token: token.to_owned(),
            })
        },
        |addr| {
            Ok(Cursor {
                address: align_to_row(addr),
                tracks_pc: false,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{align_to_row, resolve_token, Cursor, ROW_WORDS};
    use crate::cpu::{Cpu, Register, Word};
    use crate::error::DebugError;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use rstest::rstest;

    struct FixedCpu {
        registers: [Word; 12],
        pc: Word,
    }

    impl Cpu for FixedCpu {
        fn get(&self, addr: u32) -> Word {
            assert!(addr >= 0x10000, "resolution must read mapped registers");
            self.registers[usize::try_from(addr - 0x10000).expect("small index")]
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

    fn cpu_with(reg: Register, value: Word) -> FixedCpu {
        let mut registers = [0; 12];
        registers[reg as usize] = value;
        FixedCpu { registers, pc: 0 }
    }

    #[test]
    fn default_cursor_tracks_pc_from_zero() {
        let cursor = Cursor::default();
        assert_eq!(cursor.address, 0);
        assert!(cursor.tracks_pc);
    }

    #[test]
    fn pc_token_resolves_through_the_current_instruction_and_tracks() {
        let cpu = FixedCpu {
            registers: [0; 12],
            pc: 0x0105,
        };
        let cursor = resolve_token("pc", &cpu).expect("pc resolves");
        assert_eq!(cursor.address, 0x0100);
        assert!(cursor.tracks_pc);
    }

    #[test]
    fn sp_token_resolves_through_the_live_stack_pointer_value() {
        let cpu = cpu_with(Register::Sp, 0x1234);
        let cursor = resolve_token("SP", &cpu).expect("sp resolves");
        assert_eq!(cursor.address, 0x1230);
        assert!(!cursor.tracks_pc);
    }

    #[rstest]
    #[case("A", Register::A)]
    #[case("b", Register::B)]
    #[case("C", Register::C)]
    #[case("x", Register::X)]
    #[case("Y", Register::Y)]
    #[case("z", Register::Z)]
    #[case("I", Register::I)]
    #[case("j", Register::J)]
    #[case("sp", Register::Sp)]
    #[case("Ex", Register::Ex)]
    #[case("ia", Register::Ia)]
    fn register_tokens_resolve_case_insensitively(#[case] token: &str, #[case] reg: Register) {
        let cpu = cpu_with(reg, 0x4447);
        let cursor = resolve_token(token, &cpu).expect("register resolves");
        assert_eq!(cursor.address, 0x4440);
        assert!(!cursor.tracks_pc);
    }

    #[rstest]
    #[case("0", 0x0000)]
    #[case("4096", 0x1000)]
    #[case("0x1000", 0x1000)]
    #[case("0X00fF", 0x00F8)]
    #[case("65535", 0xFFF8)]
    fn numeric_tokens_parse_and_align(#[case] token: &str, #[case] aligned: Word) {
        let cpu = FixedCpu {
            registers: [0; 12],
            pc: 0,
        };
        let cursor = resolve_token(token, &cpu).expect("numeric token resolves");
        assert_eq!(cursor.address, aligned);
        assert!(!cursor.tracks_pc);
    }

    #[rstest]
    #[case("")]
    #[case("0x")]
    #[case("0xG1")]
    #[case("banana")]
    #[case("-5")]
    #[case("65536")]
    #[case("0x10000")]
    fn unparseable_tokens_are_rejected(#[case] token: &str) {
        let cpu = FixedCpu {
            registers: [0; 12],
            pc: 0,
        };
        let err = resolve_token(token, &cpu).expect_err("token must be rejected");
        assert_eq!(
            err,
            DebugError::AddressParse {
                token: token.to_owned(),
            }
        );
    }

    proptest! {
        #[test]
        fn alignment_floors_to_the_row(addr: Word) {
            let aligned = align_to_row(addr);
            prop_assert_eq!(aligned % ROW_WORDS, 0);
            prop_assert!(aligned <= addr);
            prop_assert!(addr - aligned < ROW_WORDS);
        }

        #[test]
        fn alignment_is_idempotent(addr: Word) {
            prop_assert_eq!(align_to_row(align_to_row(addr)), align_to_row(addr));
        }

        #[test]
        fn hex_and_decimal_spellings_resolve_identically(value: Word) {
            let cpu = FixedCpu { registers: [0; 12], pc: 0 };
            let hex = resolve_token(&format!("{value:#x}"), &cpu).expect("hex resolves");
            let dec = resolve_token(&value.to_string(), &cpu).expect("decimal resolves");
            prop_assert_eq!(hex, dec);
        }
    }
}
