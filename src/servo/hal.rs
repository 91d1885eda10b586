// Hardware capability consumed by the motion core
//
// The controller only needs "open the bus", "set the PWM frequency",
// "write a duty value to channel N" and "release the bus". Anything that can do
// those four things can drive the servos (real PCA9685, test double, ...).

use std::error::Error as StdError;

/// Boxed hardware error carried across the capability boundary
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// An opened PWM output device
pub trait PwmOutput {
    type Error: StdError + Send + Sync + 'static;

    /// Set the PWM period shared by all channels
    fn set_pwm_frequency(&mut self, hz: u32) -> Result<(), Self::Error>;

    /// Write a 16-bit duty value to one channel
    fn write_channel_duty(&mut self, channel: u8, duty: u16) -> Result<(), Self::Error>;

    /// Stop driving outputs and give the bus back
    fn release(self) -> Result<(), Self::Error>
    where
        Self: Sized;
}

/// Something that can open a [`PwmOutput`] on demand
pub trait PwmBus {
    type Output: PwmOutput;
    type Error: StdError + Send + Sync + 'static;

    fn open(&mut self) -> Result<Self::Output, Self::Error>;
}
