//! Run/pause/step coordination between the foreground controller and the
//! background execution loop.
//!
//! Exactly two threads of control touch the shared state: a background
//! loop driving [`ExecutionController::run_loop`] and a foreground caller
//! issuing commands. All cross-thread state lives behind a single
//! `Mutex<ControlFlags>` with a condvar for wakeup, so a `Paused -> Running`
//! transition is always visible to the loop's next flag check. `pause` is
//! deliberately CPU-lock-free: trap hooks call it from inside `Cpu::step`
//! while the loop holds the CPU mutex.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cpu::{stack_preview, Cpu, RegisterSnapshot, Word};
use crate::device::DeviceKind;
use crate::error::DebugError;
use crate::resolve::{align_to_row, resolve_token, Cursor};
use crate::ticking::{DeviceBank, DeviceId, TickingRecord};
use crate::window::MemoryWindow;

/// How long the background loop parks while paused with no paused-mode
/// device to service.
const PARK_INTERVAL: Duration = Duration::from_millis(1);

/// Execution state of the debugged machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecutionState {
    /// The background loop is ticking the CPU.
    Running,
    /// The CPU is idle; the foreground may step and inspect it.
    #[default]
    Paused,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Paused => "paused",
        })
    }
}

/// Notification delivered to controller subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Execution state flipped; device ticking flags were re-applied before
    /// this event fired.
    StateChanged(ExecutionState),
    /// Displayed machine state is stale and should be recomputed.
    Refresh,
}

type Listener = Box<dyn Fn(&ControlEvent) + Send + Sync>;

struct ControlFlags {
    state: ExecutionState,
    shutdown: bool,
}

/// Owns run/pause/step commands and mediates between the inspection
/// surface, the device ticking records and the background execution loop.
///
/// Construct one per debug session, wrap it in an [`Arc`], and hand a clone
/// to a thread running [`Self::run_loop`].
pub struct ExecutionController<C> {
    cpu: Arc<Mutex<C>>,
    flags: Mutex<ControlFlags>,
    wake: Condvar,
    devices: Mutex<DeviceBank>,
    listeners: Mutex<Vec<Listener>>,
    cursor: Mutex<Cursor>,
}

impl<C: Cpu> ExecutionController<C> {
    /// Attaches the debugger to a CPU and its devices.
    ///
    /// The session starts paused: the CPU's own pausing flag is set and
    /// every device receives its `while_paused` ticking slot.
    pub fn new(mut cpu: C, mut devices: DeviceBank) -> Self {
        if !cpu.is_pausing() {
            cpu.run_pause();
        }
        devices.apply_mode(ExecutionState::Paused);
        Self {
            cpu: Arc::new(Mutex::new(cpu)),
            flags: Mutex::new(ControlFlags {
                state: ExecutionState::Paused,
                shutdown: false,
            }),
            wake: Condvar::new(),
            devices: Mutex::new(devices),
            listeners: Mutex::new(Vec::new()),
            cursor: Mutex::new(Cursor::default()),
        }
    }

    fn lock_flags(&self) -> MutexGuard<'_, ControlFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cpu(&self) -> MutexGuard<'_, C> {
        self.cpu.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_devices(&self) -> MutexGuard<'_, DeviceBank> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cursor(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: &ControlEvent) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(event);
        }
    }

    /// Registers a listener for state-change and refresh notifications.
    ///
    /// Listeners observe the *new* execution state, and device ticking
    /// flags have already been re-applied when a
    /// [`ControlEvent::StateChanged`] fires.
    pub fn subscribe(&self, listener: impl Fn(&ControlEvent) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Current execution state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.lock_flags().state
    }

    /// Current inspection cursor.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        *self.lock_cursor()
    }

    /// Resumes background execution.
    ///
    /// Re-applies every device's `while_running` ticking slot before
    /// notifying subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::InvalidOperation`] when already running; no
    /// state changes.
    pub fn run(&self) -> Result<(), DebugError> {
        {
            let mut flags = self.lock_flags();
            if flags.state == ExecutionState::Running {
                return Err(DebugError::InvalidOperation {
                    operation: "run",
                    state: ExecutionState::Running,
                });
            }
            flags.state = ExecutionState::Running;
            // Applied under the flags guard: the live device flags always
            // match the slot selected by the state any other caller can
            // observe. Lock order is flags then devices throughout.
            self.lock_devices().apply_mode(ExecutionState::Running);
            self.wake.notify_all();
        }
        log::info!("execution resumed");
        self.emit(&ControlEvent::StateChanged(ExecutionState::Running));
        Ok(())
    }

    /// Pauses background execution; a no-op when already paused.
    ///
    /// Never acquires the CPU mutex, so trap hooks may call this from
    /// inside `Cpu::step`. The background loop observes the flag at its
    /// next iteration boundary; no instruction is interrupted mid-flight.
    pub fn pause(&self) {
        {
            let mut flags = self.lock_flags();
            if flags.state == ExecutionState::Paused {
                return;
            }
            flags.state = ExecutionState::Paused;
            self.lock_devices().apply_mode(ExecutionState::Paused);
        }
        log::info!("execution paused");
        self.emit(&ControlEvent::StateChanged(ExecutionState::Paused));
        self.emit(&ControlEvent::Refresh);
    }

    /// Executes exactly one instruction while paused.
    ///
    /// When the cursor tracks the program counter it is recomputed from
    /// the new PC and re-aligned to its row. Execution stays paused.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::InvalidOperation`] while running; the CPU is
    /// not touched.
    pub fn step(&self) -> Result<(), DebugError> {
        {
            let flags = self.lock_flags();
            if flags.state == ExecutionState::Running {
                return Err(DebugError::InvalidOperation {
                    operation: "step",
                    state: ExecutionState::Running,
                });
            }
        }
        let pc = {
            let mut cpu = self.lock_cpu();
            cpu.step();
            cpu.current_instruction()
        };
        {
            let mut cursor = self.lock_cursor();
            if cursor.tracks_pc {
                cursor.address = align_to_row(pc);
            }
        }
        log::debug!("stepped one instruction, pc={pc:#06x}");
        self.emit(&ControlEvent::Refresh);
        Ok(())
    }

    /// Updates a device's ticking slot for the *current* execution state
    /// only, and applies `enabled` to the device immediately. The other
    /// mode's remembered slot is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an id not attached to
    /// this session.
    pub fn toggle_device_ticking(&self, id: DeviceId, enabled: bool) -> Result<(), DebugError> {
        let (state, kind) = {
            // Sampled and applied under one flags hold so the toggle can
            // never land in the slot of a state already left behind.
            let flags = self.lock_flags();
            let mut devices = self.lock_devices();
            let kind = devices.kind(id)?;
            devices.toggle(id, flags.state, enabled)?;
            (flags.state, kind)
        };
        log::debug!("{} {id:?} ticking set to {enabled} while {state}", kind.label());
        // A newly enabled paused-mode device may need loop service.
        self.wake.notify_all();
        Ok(())
    }

    /// Returns a device's remembered per-mode record.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an unattached id.
    pub fn device_record(&self, id: DeviceId) -> Result<TickingRecord, DebugError> {
        self.lock_devices().record(id)
    }

    /// Replaces a device's remembered record without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an unattached id.
    pub fn set_device_record(&self, id: DeviceId, record: TickingRecord) -> Result<(), DebugError> {
        self.lock_devices().set_record(id, record)
    }

    /// Returns the ticking flag most recently applied to a device.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an unattached id.
    pub fn device_ticking(&self, id: DeviceId) -> Result<bool, DebugError> {
        self.lock_devices().applied(id)
    }

    /// Returns a device's category tag.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an unattached id.
    pub fn device_kind(&self, id: DeviceId) -> Result<DeviceKind, DebugError> {
        self.lock_devices().kind(id)
    }

    /// Ids of all attached devices.
    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.lock_devices().ids()
    }

    /// Fetches a device's telemetry snapshot.
    ///
    /// A telemetry fault is logged and reported; it never changes
    /// execution state.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::UnknownDevice`] for an unattached id or
    /// [`DebugError::Device`] when the probe fails.
    pub fn device_telemetry(
        &self,
        id: DeviceId,
    ) -> Result<Option<crate::device::DeviceTelemetry>, DebugError> {
        let result = self.lock_devices().telemetry(id);
        if let Err(error) = &result {
            log::warn!("telemetry probe for device {id:?} failed: {error}");
        }
        result
    }

    /// Resolves an address token and moves the cursor to it.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::AddressParse`] for an unparseable token; the
    /// previous cursor is retained.
    pub fn go_to_address(&self, token: &str) -> Result<Cursor, DebugError> {
        let resolved = {
            let cpu = self.lock_cpu();
            resolve_token(token, &*cpu)?
        };
        *self.lock_cursor() = resolved;
        log::debug!("cursor moved to {:#06x}", resolved.address);
        self.emit(&ControlEvent::Refresh);
        Ok(resolved)
    }

    /// Computes the memory window at the current cursor.
    ///
    /// Consistent while paused; a best-effort snapshot while running.
    ///
    /// # Errors
    ///
    /// Returns [`DebugError::OutOfRangeWindow`] when the cursor sits too
    /// close to the top of the address space.
    pub fn memory_window(&self) -> Result<MemoryWindow, DebugError> {
        let base = self.cursor().address;
        let cpu = self.lock_cpu();
        MemoryWindow::compute(base, &*cpu)
    }

    /// Captures the register file through the mapped addresses.
    #[must_use]
    pub fn registers(&self) -> RegisterSnapshot {
        let cpu = self.lock_cpu();
        RegisterSnapshot::capture(&*cpu)
    }

    /// Reads a short stack preview from the live stack pointer.
    #[must_use]
    pub fn stack(&self) -> Vec<(Word, Word)> {
        let cpu = self.lock_cpu();
        stack_preview(&*cpu)
    }

    /// Requests background-loop termination and wakes it if parked.
    ///
    /// Used by hosts tearing the session down so the loop thread can be
    /// joined; it does not alter the execution state observed by other
    /// callers.
    pub fn shutdown(&self) {
        let mut flags = self.lock_flags();
        flags.shutdown = true;
        self.wake.notify_all();
    }

    /// Body of the background execution loop; run this on its own thread.
    ///
    /// Per iteration: one CPU instruction while running, then one update
    /// opportunity for every ticking-enabled device (devices keep being
    /// serviced while paused when their paused-mode slot says so). The
    /// CPU's own pausing flag is synchronized here, from the loop's side,
    /// whenever a state transition is observed. Returns once
    /// [`Self::shutdown`] has been called.
    pub fn run_loop(&self) {
        // The attach-time sync in `new` covers `Paused`; any transition
        // since then is observed on the first iteration.
        let mut last_state = ExecutionState::Paused;
        loop {
            let state = {
                let flags = self.lock_flags();
                if flags.shutdown {
                    return;
                }
                flags.state
            };

            if state != last_state {
                self.sync_cpu_pause_flag(state);
                last_state = state;
            }

            if state == ExecutionState::Running {
                {
                    let mut cpu = self.lock_cpu();
                    cpu.step();
                }
                // A trap hook may have paused us inside step; the next
                // iteration observes the flag before stepping again.
                self.lock_devices().tick_enabled();
            } else {
                let ticked = self.lock_devices().tick_enabled();
                if ticked == 0 {
                    let flags = self.lock_flags();
                    if flags.shutdown {
                        return;
                    }
                    if flags.state == ExecutionState::Paused {
                        let (guard, _timed_out) = self
                            .wake
                            .wait_timeout(flags, PARK_INTERVAL)
                            .unwrap_or_else(PoisonError::into_inner);
                        drop(guard);
                    }
                }
            }
        }
    }

    fn sync_cpu_pause_flag(&self, state: ExecutionState) {
        let mut cpu = self.lock_cpu();
        let should_pause = state == ExecutionState::Paused;
        if cpu.is_pausing() != should_pause {
            cpu.run_pause();
        }
    }
}
