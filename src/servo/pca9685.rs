// PCA9685 16-channel PWM expander as a servo output
//
// Register access goes through the pwm-pca9685 driver; this layer maps the
// 16-bit duty values and channel numbers the controller works in onto the
// chip's 12-bit counter and channel enum.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use linux_embedded_hal::{Delay, I2cdev};
use pwm_pca9685::{Address, Channel, Pca9685};
use tracing::{debug, info};

use super::hal::{PwmBus, PwmOutput};
use crate::config::CHANNEL_COUNT;

/// Internal oscillator frequency
const OSCILLATOR_HZ: f64 = 25_000_000.0;

/// Counter steps per PWM period
const COUNTER_STEPS: f64 = 4096.0;

/// Valid PRE_SCALE register values (datasheet: minimum 3)
const PRESCALE_MIN: u8 = 3;
const PRESCALE_MAX: u8 = 255;

/// Oscillator start-up time after leaving sleep (datasheet: 500us)
const WAKE_DELAY_MS: u32 = 5;

/// Error types for PCA9685 communication
#[derive(Debug, thiserror::Error)]
pub enum Pca9685Error {
    #[error("Cannot open I2C bus {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("I2C error: {0}")]
    I2c(ErrorKind),

    #[error("PCA9685 driver rejected the request")]
    InvalidInput,

    #[error("Channel {channel} does not exist (0..{})", CHANNEL_COUNT)]
    InvalidChannel { channel: u8 },

    #[error("PWM frequency {hz} Hz is outside the range the prescaler can produce")]
    FrequencyOutOfRange { hz: u32 },
}

impl<E: embedded_hal::i2c::Error> From<pwm_pca9685::Error<E>> for Pca9685Error {
    fn from(e: pwm_pca9685::Error<E>) -> Self {
        match e {
            pwm_pca9685::Error::I2C(e) => Self::I2c(e.kind()),
            pwm_pca9685::Error::InvalidInputData => Self::InvalidInput,
        }
    }
}

pub type Result<T> = std::result::Result<T, Pca9685Error>;

/// PRE_SCALE value for a PWM frequency
pub fn prescale_for(hz: u32) -> Result<u8> {
    if hz == 0 {
        return Err(Pca9685Error::FrequencyOutOfRange { hz });
    }
    let prescale = (OSCILLATOR_HZ / COUNTER_STEPS / f64::from(hz)).round() - 1.0;
    if prescale < f64::from(PRESCALE_MIN) || prescale > f64::from(PRESCALE_MAX) {
        return Err(Pca9685Error::FrequencyOutOfRange { hz });
    }
    Ok(prescale as u8)
}

/// Output level for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Always high (full-on bit)
    FullOn,
    /// High from count 0, low from the given count
    OffAt(u16),
}

/// Map a 16-bit duty value onto the 12-bit counter
pub fn duty_level(duty: u16) -> Level {
    if duty == u16::MAX {
        Level::FullOn
    } else {
        Level::OffAt(((u32::from(duty) + 1) >> 4) as u16)
    }
}

/// Driver channel for a channel index
pub fn channel_for(channel: u8) -> Result<Channel> {
    Ok(match channel {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        _ => return Err(Pca9685Error::InvalidChannel { channel }),
    })
}

/// PCA9685 driving servo channels
pub struct ServoBoard<I2C, D> {
    pca: Pca9685<I2C>,
    delay: D,
}

impl<I2C: I2c, D: DelayNs> ServoBoard<I2C, D> {
    /// Take ownership of the bus and put the chip to sleep
    ///
    /// The sleep write doubles as a presence check: an absent chip fails here.
    pub fn new(i2c: I2C, address: u8, delay: D) -> Result<Self> {
        let mut pca = Pca9685::new(i2c, Address::from(address))?;
        pca.disable()?;
        Ok(Self { pca, delay })
    }

    /// Set the PWM frequency shared by all channels and start the oscillator
    pub fn set_frequency(&mut self, hz: u32) -> Result<()> {
        let prescale = prescale_for(hz)?;
        info!("Setting PCA9685 frequency to {} Hz (prescale {})", hz, prescale);
        self.pca.set_prescale(prescale)?;
        self.pca.enable()?;
        self.delay.delay_ms(WAKE_DELAY_MS);
        Ok(())
    }

    /// Set a channel from a 16-bit duty value
    pub fn set_duty(&mut self, channel: u8, duty: u16) -> Result<()> {
        let target = channel_for(channel)?;
        let level = duty_level(duty);
        debug!("PCA9685 channel {}: {:?}", channel, level);
        match level {
            Level::FullOn => self.pca.set_channel_full_on(target, 0)?,
            Level::OffAt(off) => self.pca.set_channel_on_off(target, 0, off)?,
        }
        Ok(())
    }

    /// Switch every output fully off, stop the oscillator and hand the bus back
    pub fn into_inner(mut self) -> Result<I2C> {
        self.pca.set_channel_full_off(Channel::All)?;
        self.pca.disable()?;
        Ok(self.pca.destroy())
    }
}

impl<I2C: I2c, D: DelayNs> PwmOutput for ServoBoard<I2C, D> {
    type Error = Pca9685Error;

    fn set_pwm_frequency(&mut self, hz: u32) -> Result<()> {
        self.set_frequency(hz)
    }

    fn write_channel_duty(&mut self, channel: u8, duty: u16) -> Result<()> {
        self.set_duty(channel, duty)
    }

    fn release(self) -> Result<()> {
        self.into_inner().map(drop)
    }
}

/// Opens a PCA9685 on a Linux I2C character device
#[derive(Debug, Clone)]
pub struct LinuxPwmBus {
    path: String,
    address: u8,
}

impl LinuxPwmBus {
    pub fn new(path: impl Into<String>, address: u8) -> Self {
        Self {
            path: path.into(),
            address,
        }
    }
}

impl PwmBus for LinuxPwmBus {
    type Output = ServoBoard<I2cdev, Delay>;
    type Error = Pca9685Error;

    fn open(&mut self) -> Result<Self::Output> {
        info!(
            "Opening PCA9685 at 0x{:02X} on {}",
            self.address, self.path
        );
        let i2c = I2cdev::new(&self.path).map_err(|e| Pca9685Error::Open {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        ServoBoard::new(i2c, self.address, Delay)
    }
}
