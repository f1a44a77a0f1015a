//! Per-device, per-mode ticking-enablement state.
//!
//! Each attached device remembers an independent ticking preference for
//! each execution state, so e.g. a clock can tick only while running while
//! a keyboard stays quiet during single-stepping. Switching execution
//! state re-applies the selected slot without disturbing the other.

use crate::control::ExecutionState;
use crate::device::{Device, DeviceKind, DeviceTelemetry};
use crate::error::DebugError;

/// Remembered ticking preference for one device, one slot per execution
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TickingRecord {
    /// Ticking enabled while execution is running.
    pub while_running: bool,
    /// Ticking enabled while execution is paused.
    pub while_paused: bool,
}

impl Default for TickingRecord {
    fn default() -> Self {
        Self {
            while_running: true,
            while_paused: false,
        }
    }
}

impl TickingRecord {
    /// Returns the slot selected by `state`.
    #[must_use]
    pub const fn for_state(self, state: ExecutionState) -> bool {
        match state {
            ExecutionState::Running => self.while_running,
            ExecutionState::Paused => self.while_paused,
        }
    }

    /// Overwrites only the slot selected by `state`.
    pub const fn set_for_state(&mut self, state: ExecutionState, enabled: bool) {
        match state {
            ExecutionState::Running => self.while_running = enabled,
            ExecutionState::Paused => self.while_paused = enabled,
        }
    }
}

/// Opaque handle to a device attached to the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeviceId(usize);

struct Slot {
    device: Box<dyn Device>,
    record: TickingRecord,
    live: bool,
}

/// Owns the attached devices together with their ticking records and the
/// flag value most recently applied to each device.
#[derive(Default)]
pub struct DeviceBank {
    slots: Vec<Slot>,
}

impl DeviceBank {
    /// Creates an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a device with the default record (ticking while running,
    /// quiet while paused). The applied flag is pushed by the next
    /// [`Self::apply_mode`] call.
    pub fn attach(&mut self, device: Box<dyn Device>) -> DeviceId {
        let id = DeviceId(self.slots.len());
        self.slots.push(Slot {
            device,
            record: TickingRecord::default(),
            live: false,
        });
        id
    }

    /// Number of attached devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no devices are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ids of all attached devices, in attach order.
    #[must_use]
    pub fn ids(&self) -> Vec<DeviceId> {
        (0..self.slots.len()).map(DeviceId).collect()
    }

    fn slot(&self, id: DeviceId) -> Result<&Slot, DebugError> {
        self.slots.get(id.0).ok_or(DebugError::UnknownDevice { id })
    }

    fn slot_mut(&mut self, id: DeviceId) -> Result<&mut Slot, DebugError> {
        self.slots
            .get_mut(id.0)
            .ok_or(DebugError::UnknownDevice { id })
    }

    /// Returns a device's category tag.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an id not in the bank.
    pub fn kind(&self, id: DeviceId) -> Result<DeviceKind, DebugError> {
        Ok(self.slot(id)?.device.kind())
    }

    /// Returns a device's remembered record.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an id not in the bank.
    pub fn record(&self, id: DeviceId) -> Result<TickingRecord, DebugError> {
        Ok(self.slot(id)?.record)
    }

    /// Replaces a device's record without applying it; the next
    /// [`Self::apply_mode`] pushes the relevant slot.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an id not in the bank.
    pub fn set_record(&mut self, id: DeviceId, record: TickingRecord) -> Result<(), DebugError> {
        self.slot_mut(id)?.record = record;
        Ok(())
    }

    /// Returns the flag value most recently applied to a device.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an id not in the bank.
    pub fn applied(&self, id: DeviceId) -> Result<bool, DebugError> {
        Ok(self.slot(id)?.live)
    }

    /// Fetches a device's telemetry snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an id not in the bank, or
    /// [`DebugError::Device`] when the device's telemetry probe fails.
    pub fn telemetry(&self, id: DeviceId) -> Result<Option<DeviceTelemetry>, DebugError> {
        Ok(self.slot(id)?.device.telemetry()?)
    }

    /// Pushes the slot selected by `state` into every device.
    ///
    /// Called once at attach time and once per execution-state transition;
    /// the other mode's remembered slot is untouched.
    pub fn apply_mode(&mut self, state: ExecutionState) {
        for slot in &mut self.slots {
            slot.live = slot.record.for_state(state);
            slot.device.set_ticking(slot.live);
        }
    }

    /// Overwrites the record slot selected by `state` and applies `enabled`
    /// to the device immediately.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an id not in the bank.
    pub fn toggle(
        &mut self,
        id: DeviceId,
        state: ExecutionState,
        enabled: bool,
    ) -> Result<(), DebugError> {
        let slot = self.slot_mut(id)?;
        slot.record.set_for_state(state, enabled);
        slot.live = enabled;
        slot.device.set_ticking(enabled);
        Ok(())
    }

    /// Gives every currently enabled device one update opportunity and
    /// returns how many devices were ticked.
    pub fn tick_enabled(&mut self) -> usize {
        let mut ticked = 0;
        for slot in &mut self.slots {
            if slot.live {
                slot.device.tick();
                ticked += 1;
            }
        }
        ticked
    }
}
