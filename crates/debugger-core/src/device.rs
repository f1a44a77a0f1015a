//! Peripheral device collaborator surface.
//!
//! Devices expose a common ticking interface plus an optional telemetry
//! snapshot keyed by device kind, replacing open-ended type inspection
//! with a tagged-variant capability model.

use thiserror::Error;

use crate::cpu::Word;

/// Failure reported by a device telemetry probe.
///
/// Telemetry faults are logged and surfaced to the caller; they never
/// change execution state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("device fault: {reason}")]
pub struct DeviceFault {
    /// Human-readable failure description from the device.
    pub reason: String,
}

/// Category tag for an attached device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DeviceKind {
    /// Programmable interval clock.
    Clock,
    /// Keyboard input device.
    Keyboard,
    /// Memory-mapped character display.
    Display,
    /// Removable floppy drive.
    FloppyDrive,
    /// Fixed hard drive.
    HardDrive,
    /// CPU control/power-management device.
    CpuControl,
    /// Error-detection-and-correction device; no telemetry surface.
    Edc,
}

impl DeviceKind {
    /// Short display label for this device category.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::Keyboard => "keyboard",
            Self::Display => "display",
            Self::FloppyDrive => "floppy drive",
            Self::HardDrive => "hard drive",
            Self::CpuControl => "cpu control",
            Self::Edc => "edc",
        }
    }
}

/// Media/head status reported by storage devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StorageStatus {
    /// Media present, ready for commands.
    Ready,
    /// Media present but write-protected.
    ReadyWriteProtected,
    /// A command is in progress.
    Busy,
    /// No media inserted.
    NoMedia,
    /// Heads parked (hard drives only).
    Parked,
}

/// Device-specific telemetry snapshot, keyed by device kind.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DeviceTelemetry {
    /// Clock tick counter and configured interrupt message.
    Clock {
        /// Ticks elapsed since attach.
        ticks: u32,
        /// Interrupt message word, 0 when interrupts are disabled.
        interrupt_message: Word,
    },
    /// Keyboard input history and pending buffer.
    Keyboard {
        /// Last pressed printable key, if any.
        last_key: Option<char>,
        /// Last pressed raw key code, if any.
        last_key_code: Option<u16>,
        /// Buffered keys not yet consumed by the CPU.
        buffer: Vec<char>,
    },
    /// Display memory-map pointers and border color.
    Display {
        /// Video RAM base address.
        video_ram: Word,
        /// Color RAM base address.
        color_ram: Word,
        /// Font RAM base address.
        font_ram: Word,
        /// Border color value.
        border_color: Word,
    },
    /// Storage device status.
    Storage {
        /// Current media/head status.
        status: StorageStatus,
    },
    /// CPU control device state.
    CpuControl {
        /// Active control mode.
        mode: u16,
        /// Whether interrupt queueing is enabled.
        queueing: bool,
        /// Whether the controlled CPU is sleeping.
        sleeping: bool,
    },
}

/// An attached peripheral device.
///
/// `set_ticking` controls whether the device participates in background
/// ticks; disabling it mostly suppresses interrupts from the device to the
/// CPU, it does not power the device off.
pub trait Device: Send {
    /// Returns the category tag for this device.
    fn kind(&self) -> DeviceKind;

    /// Enables or disables this device's participation in background ticks.
    fn set_ticking(&mut self, enabled: bool);

    /// Gives the device one update opportunity.
    fn tick(&mut self);

    /// Produces a telemetry snapshot, when this device kind has one.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceFault`] when the device cannot report telemetry.
    fn telemetry(&self) -> Result<Option<DeviceTelemetry>, DeviceFault> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::{Device, DeviceFault, DeviceKind, DeviceTelemetry};

    struct BareEdc;

    impl Device for BareEdc {
        fn kind(&self) -> DeviceKind {
            DeviceKind::Edc
        }

        fn set_ticking(&mut self, _enabled: bool) {}

        fn tick(&mut self) {}
    }

    #[test]
    fn default_telemetry_is_absent() {
        let edc = BareEdc;
        assert_eq!(edc.telemetry(), Ok(None));
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(DeviceKind::Clock.label(), "clock");
        assert_eq!(DeviceKind::FloppyDrive.label(), "floppy drive");
        assert_eq!(DeviceKind::CpuControl.label(), "cpu control");
    }

    #[test]
    fn device_fault_display_carries_reason() {
        let fault = DeviceFault {
            reason: "seek timed out".to_owned(),
        };
        assert_eq!(fault.to_string(), "device fault: seek timed out");
    }

    #[test]
    fn telemetry_variants_compare_by_value() {
        let a = DeviceTelemetry::Clock {
            ticks: 3,
            interrupt_message: 0x0040,
        };
        let b = DeviceTelemetry::Clock {
            ticks: 3,
            interrupt_message: 0x0040,
        };
        assert_eq!(a, b);
    }
}
