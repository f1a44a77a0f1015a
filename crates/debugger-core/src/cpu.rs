//! CPU collaborator surface and the mapped-register address table.
//!
//! The debugger never interprets instructions itself; it drives a CPU
//! through this narrow trait. Registers are additionally exposed as a
//! fixed block of pseudo-addresses directly above the 64 Ki-word memory
//! so register and memory reads share one accessor.

/// Native storage unit of the target machine: registers, memory cells and
/// addresses are all 16-bit words.
pub type Word = u16;

/// Number of real memory words (`0x0000..=0xFFFF`).
pub const MEMORY_WORDS: usize = 0x10000;

/// First mapped-register pseudo-address (the `A` register).
pub const MAPPED_REGISTER_BASE: u32 = 0x10000;

/// Number of mapped registers (`A..=IA`).
pub const MAPPED_REGISTER_COUNT: usize = 12;

/// Number of stack words captured by [`stack_preview`].
pub const STACK_PREVIEW_WORDS: usize = 10;

/// Execution surface of the CPU being debugged.
///
/// `get` accepts both real memory addresses and the mapped-register block;
/// reads through either space observe the same underlying register value.
/// `run_pause` toggles the CPU's own pausing flag, which the background
/// loop keeps synchronized with the controller's execution state.
pub trait Cpu {
    /// Reads one word from memory or from a mapped register.
    fn get(&self, addr: u32) -> Word;

    /// Executes exactly one instruction.
    fn step(&mut self);

    /// Toggles the CPU's internal pausing flag.
    fn run_pause(&mut self);

    /// Returns `true` when the CPU's internal pausing flag is set.
    fn is_pausing(&self) -> bool;

    /// Returns the address of the current instruction (the program counter).
    fn current_instruction(&self) -> Word;
}

/// Register identifier, in mapped-address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    A = 0,
    B = 1,
    C = 2,
    X = 3,
    Y = 4,
    Z = 5,
    I = 6,
    J = 7,
    Sp = 8,
    Pc = 9,
    Ex = 10,
    Ia = 11,
}

impl Register {
    /// All registers in mapped-address order.
    pub const ALL: [Self; MAPPED_REGISTER_COUNT] = [
        Self::A,
        Self::B,
        Self::C,
        Self::X,
        Self::Y,
        Self::Z,
        Self::I,
        Self::J,
        Self::Sp,
        Self::Pc,
        Self::Ex,
        Self::Ia,
    ];

    /// Returns the fixed mapped pseudo-address for this register.
    ///
    /// The map is bit-exact: `A=0x10000` through `IA=0x1000B`.
    #[must_use]
    pub const fn mapped_address(self) -> u32 {
        MAPPED_REGISTER_BASE + self as u32
    }

    /// Returns the canonical upper-case mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::I => "I",
            Self::J => "J",
            Self::Sp => "SP",
            Self::Pc => "PC",
            Self::Ex => "EX",
            Self::Ia => "IA",
        }
    }

    /// Parses a register mnemonic, ignoring ASCII case.
    #[must_use]
    pub fn from_mnemonic(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|reg| token.eq_ignore_ascii_case(reg.mnemonic()))
    }
}

/// Point-in-time copy of the full register file, read through the mapped
/// addresses.
///
/// Consistent only while execution is paused; while running this is a
/// best-effort snapshot and individual fields may be torn relative to each
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub struct RegisterSnapshot {
    pub a: Word,
    pub b: Word,
    pub c: Word,
    pub x: Word,
    pub y: Word,
    pub z: Word,
    pub i: Word,
    pub j: Word,
    pub sp: Word,
    pub pc: Word,
    pub ex: Word,
    pub ia: Word,
}

impl RegisterSnapshot {
    /// Captures every register through its mapped address.
    #[must_use]
    pub fn capture<C: Cpu + ?Sized>(cpu: &C) -> Self {
        let read = |reg: Register| cpu.get(reg.mapped_address());
        Self {
            a: read(Register::A),
            b: read(Register::B),
            c: read(Register::C),
            x: read(Register::X),
            y: read(Register::Y),
            z: read(Register::Z),
            i: read(Register::I),
            j: read(Register::J),
            sp: read(Register::Sp),
            pc: read(Register::Pc),
            ex: read(Register::Ex),
            ia: read(Register::Ia),
        }
    }

    /// Returns the captured value for a register.
    #[must_use]
    pub const fn read(&self, reg: Register) -> Word {
        match reg {
            Register::A => self.a,
            Register::B => self.b,
            Register::C => self.c,
            Register::X => self.x,
            Register::Y => self.y,
            Register::Z => self.z,
            Register::I => self.i,
            Register::J => self.j,
            Register::Sp => self.sp,
            Register::Pc => self.pc,
            Register::Ex => self.ex,
            Register::Ia => self.ia,
        }
    }
}

/// Reads up to [`STACK_PREVIEW_WORDS`] `(address, word)` pairs upward from
/// the live stack pointer, stopping before address `0xFFFF`.
#[must_use]
pub fn stack_preview<C: Cpu + ?Sized>(cpu: &C) -> Vec<(Word, Word)> {
    let sp = cpu.get(Register::Sp.mapped_address());
    let mut entries = Vec::with_capacity(STACK_PREVIEW_WORDS);
    let mut addr = sp;
    while entries.len() < STACK_PREVIEW_WORDS && addr != 0xFFFF {
        entries.push((addr, cpu.get(u32::from(addr))));
        addr += 1;
    }
    entries
}
