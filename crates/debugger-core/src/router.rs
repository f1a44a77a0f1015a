//! Break/trap event routing from the CPU into forced pauses.
//!
//! The CPU delivers traps synchronously from its own execution context,
//! possibly from inside `Cpu::step` while the background loop holds the
//! CPU mutex. The router therefore only touches the controller's
//! CPU-lock-free surface, processes events strictly in arrival order, and
//! never drops one.

use std::sync::{Arc, Mutex, PoisonError};

use crate::control::{ExecutionController, ExecutionState};
use crate::cpu::{Cpu, Word};

/// Classification of an asynchronous CPU-originated break signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BreakKind {
    /// The CPU decoded an instruction it cannot execute.
    InvalidInstruction,
    /// The interrupt queue overflowed; the machine is on fire.
    InterruptStackOverflow,
    /// A breakpoint was reached.
    Breakpoint,
}

/// One break signal, consumed synchronously by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BreakEvent {
    /// What kind of signal forced the pause.
    pub kind: BreakKind,
    /// Program counter at the time of the signal.
    pub pc: Word,
    /// Human-readable reason, also surfaced as the status line.
    pub reason: String,
}

/// Trap callback surface the host installs into the CPU.
///
/// Every variant carries the program counter observed by the CPU at trap
/// time; the router must not read the CPU re-entrantly from trap context.
pub trait TrapHook: Send + Sync {
    /// A breakpoint was hit.
    fn broke(&self, pc: Word);

    /// An invalid instruction was decoded.
    fn invalid_instruction(&self, pc: Word);

    /// The interrupt stack overflowed.
    fn on_fire(&self, pc: Word);

    /// The CPU emitted a log word.
    fn log(&self, value: Word);
}

type BreakListener = Box<dyn Fn(&BreakEvent) + Send + Sync>;

/// Translates CPU trap signals into forced pauses, a status line, break
/// events and an append-only log sequence.
pub struct BreakEventRouter<C> {
    controller: Arc<ExecutionController<C>>,
    listeners: Mutex<Vec<BreakListener>>,
    status: Mutex<Option<String>>,
    log: Mutex<Vec<Word>>,
}

impl<C: Cpu> BreakEventRouter<C> {
    /// Creates a router bound to a controller.
    #[must_use]
    pub fn new(controller: Arc<ExecutionController<C>>) -> Self {
        Self {
            controller,
            listeners: Mutex::new(Vec::new()),
            status: Mutex::new(None),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Registers a listener for break events, invoked synchronously in
    /// arrival order.
    pub fn on_break(&self, listener: impl Fn(&BreakEvent) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Most recent status line, if a break has set one.
    #[must_use]
    pub fn status(&self) -> Option<String> {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy of the append-only log sequence, in emission order.
    #[must_use]
    pub fn log_entries(&self) -> Vec<Word> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pauses the controller when it is running; returns whether this call
    /// performed the transition.
    fn force_pause(&self) -> bool {
        if self.controller.state() == ExecutionState::Running {
            self.controller.pause();
            true
        } else {
            false
        }
    }

    fn set_status(&self, message: String) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    fn emit(&self, event: &BreakEvent) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(event);
        }
    }
}

impl<C: Cpu + Send> TrapHook for BreakEventRouter<C> {
    fn broke(&self, pc: Word) {
        // Idempotent: a breakpoint reported while already paused is a
        // no-op, not an error.
        if self.force_pause() {
            log::warn!("breakpoint hit at {pc:#06x}");
            self.emit(&BreakEvent {
                kind: BreakKind::Breakpoint,
                pc,
                reason: format!("Breakpoint hit at {pc:#06x}"),
            });
        }
    }

    fn invalid_instruction(&self, pc: Word) {
        self.force_pause();
        let reason = format!("Invalid instruction at {pc:#06x}");
        log::warn!("{reason}");
        self.set_status(reason.clone());
        self.emit(&BreakEvent {
            kind: BreakKind::InvalidInstruction,
            pc,
            reason,
        });
    }

    fn on_fire(&self, pc: Word) {
        self.force_pause();
        let reason = "CPU is on fire (interrupt stack overflow!)".to_owned();
        log::warn!("{reason}");
        self.set_status(reason.clone());
        self.emit(&BreakEvent {
            kind: BreakKind::InterruptStackOverflow,
            pc,
            reason,
        });
    }

    fn log(&self, value: Word) {
        log::debug!("cpu log word {value:#06x}");
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
    }
}
