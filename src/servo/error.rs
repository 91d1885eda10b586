// Error types for the press controller

use std::fmt;

use super::hal::BoxError;
use crate::config::ConfigError;

/// Hardware operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOp {
    SetFrequency { hz: u32 },
    WriteChannel { channel: u8 },
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetFrequency { hz } => write!(f, "setting PWM frequency to {hz} Hz"),
            Self::WriteChannel { channel } => write!(f, "writing channel {channel}"),
        }
    }
}

/// Errors surfaced by press operations
#[derive(Debug, thiserror::Error)]
pub enum PressError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize PWM bus: {0}")]
    BusInit(#[source] BoxError),

    #[error("PWM device error while {op}: {source}")]
    Device {
        op: DeviceOp,
        #[source]
        source: BoxError,
    },
}

impl PressError {
    pub(crate) fn device<E>(op: DeviceOp, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Device {
            op,
            source: Box::new(source),
        }
    }

    /// True when a hardware write failed mid-operation
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::Device { .. })
    }
}

/// Failure during best-effort shutdown (never escalated)
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("Could not return channel {channel} to rest: {source}")]
    ReturnToRest {
        channel: u8,
        #[source]
        source: PressError,
    },

    #[error("Could not release PWM bus: {0}")]
    Release(#[source] BoxError),
}

/// Diagnostic returned by `close()`; safe to ignore
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub errors: Vec<ShutdownError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
