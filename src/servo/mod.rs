// Servo press control for a PCA9685 PWM expander
//
// Provides:
// - Angle -> pulse width -> duty cycle conversion
// - Stepped motion sequencing with per-channel position tracking
// - PCA9685 servo output over Linux I2C
// - High-level press controller (left, right, both)

mod controller;
pub mod conversion;
mod error;
pub mod hal;
#[cfg(test)]
pub(crate) mod mock;
pub mod pca9685;
pub mod sequencer;
mod state;

pub use controller::{PressController, Side};
pub use error::{DeviceOp, PressError, ShutdownError, ShutdownReport};
pub use hal::{PwmBus, PwmOutput};
pub use pca9685::{LinuxPwmBus, Pca9685Error, ServoBoard};
pub use sequencer::{MotionSequencer, SequencerParams};
pub use state::ChannelState;
