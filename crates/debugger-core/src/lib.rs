//! Execution-control and state-synchronization core for an interactive
//! debugger driving a tick-driven 16-bit CPU with memory-mapped devices.
//!
//! The CPU, its devices and the disassembler are external collaborators
//! consumed through traits; this crate owns the run/pause/step protocol,
//! the per-device per-mode ticking records, the break/trap event path and
//! the address-resolution plus memory-window arithmetic.

/// Error taxonomy for control and inspection operations.
pub mod error;
pub use error::DebugError;

/// CPU collaborator trait, word/address types and the mapped-register map.
pub mod cpu;
pub use cpu::{
    stack_preview, Cpu, Register, RegisterSnapshot, Word, MAPPED_REGISTER_BASE,
    MAPPED_REGISTER_COUNT, MEMORY_WORDS, STACK_PREVIEW_WORDS,
};

/// Device collaborator trait and telemetry capability model.
pub mod device;
pub use device::{Device, DeviceFault, DeviceKind, DeviceTelemetry, StorageStatus};

/// Disassembler collaborator surface.
pub mod disasm;
pub use disasm::{DisasmLine, Disassembler};

/// Address-token resolution, row alignment and the inspection cursor.
pub mod resolve;
pub use resolve::{align_to_row, resolve_token, Cursor, ROW_WORDS};

/// Memory-window computation for display.
pub mod window;
pub use window::{
    DumpRow, MemoryWindow, DISASM_BACKTRACK_WORDS, DISASM_WINDOW_WORDS, DUMP_ROWS, DUMP_ROW_WORDS,
    DUMP_WORDS,
};

/// Per-device, per-mode ticking-enablement records.
pub mod ticking;
pub use ticking::{DeviceBank, DeviceId, TickingRecord};

/// Run/pause/step coordination and the background execution loop.
pub mod control;
pub use control::{ControlEvent, ExecutionController, ExecutionState};

/// CPU trap routing into forced pauses and break events.
pub mod router;
pub use router::{BreakEvent, BreakEventRouter, BreakKind, TrapHook};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
