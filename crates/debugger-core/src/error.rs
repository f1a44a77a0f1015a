use thiserror::Error;

use crate::control::ExecutionState;
use crate::device::DeviceFault;
use crate::ticking::DeviceId;

/// Error taxonomy for the debugger control core.
///
/// None of these are process-fatal: each is reported to the caller and
/// leaves execution state and the previously displayed cursor untouched.
/// CPU-originated traps (invalid instruction, interrupt stack overflow) are
/// domain events, not errors, and are routed through
/// [`crate::router::BreakEventRouter`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    /// An address token could not be resolved to a memory address.
    #[error("cannot resolve address token `{token}`")]
    AddressParse {
        /// The token exactly as entered.
        token: String,
    },
    /// A control operation was issued in an execution state that forbids it.
    #[error("`{operation}` is not valid while execution is {state}")]
    InvalidOperation {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Execution state at the time of the call.
        state: ExecutionState,
    },
    /// A memory window would read past the top of the address space.
    #[error("memory window at {base:#06x} would read past the top of the address space")]
    OutOfRangeWindow {
        /// Requested window base address.
        base: u16,
    },
    /// A device telemetry callback failed.
    #[error(transparent)]
    Device(#[from] DeviceFault),
    /// A device id does not name an attached device.
    #[error("no attached device with id {id:?}")]
    UnknownDevice {
        /// The unrecognized device id.
        id: DeviceId,
    },
}

impl DebugError {
    /// Returns `true` when the error only reports a rejected request and no
    /// shared state was modified.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AddressParse { .. }
                | Self::InvalidOperation { .. }
                | Self::OutOfRangeWindow { .. }
                | Self::UnknownDevice { .. }
        )
    }
}
