// Defaults, channel layout and validated configuration for the press controller
use std::time::Duration;

use serde::{Deserialize, Serialize};

// PWM frequency for hobby servos
pub const DEFAULT_FREQ_HZ: u32 = 50;

// Channels on the PCA9685 board
pub const DEFAULT_LEFT_CHANNEL: u8 = 15;
pub const DEFAULT_RIGHT_CHANNEL: u8 = 12;

// Angle pairs (tune per mechanical setup)
pub const DEFAULT_LEFT_REST_DEG: f32 = 90.0;
pub const DEFAULT_LEFT_PRESS_DEG: f32 = 40.0;
pub const DEFAULT_RIGHT_REST_DEG: f32 = 90.0;
pub const DEFAULT_RIGHT_PRESS_DEG: f32 = 45.0;

// Pulse range mapped onto 0..180 degrees
pub const DEFAULT_MIN_US: u32 = 500;
pub const DEFAULT_MAX_US: u32 = 2500;

// Motion tuning
pub const DEFAULT_STEP_DEG: f32 = 2.0;
pub const DEFAULT_STEP_DELAY_SECS: f32 = 0.01;
pub const DEFAULT_PRESS_HOLD_SECS: f32 = 0.20;

// I2C bus the PCA9685 hangs off (Raspberry Pi header pins 3/5)
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_I2C_ADDRESS: u8 = 0x40;

/// Number of PWM outputs on a PCA9685
pub const CHANNEL_COUNT: u8 = 16;

/// Servo travel in degrees
pub const MAX_ANGLE_DEG: f32 = 180.0;

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("PWM frequency must be positive")]
    ZeroFrequency,

    #[error("Minimum pulse width must be positive")]
    ZeroMinPulse,

    #[error("Pulse range {min_us}..{max_us}us is empty or inverted")]
    InvalidPulseRange { min_us: u32, max_us: u32 },

    #[error("Channel {channel} does not exist (PCA9685 has {} channels)", CHANNEL_COUNT)]
    ChannelOutOfRange { channel: u8 },

    #[error("{name} angle {value} is outside 0..=180 degrees")]
    AngleOutOfRange { name: &'static str, value: f32 },

    #[error("Step size must be a positive number of degrees, got {0}")]
    InvalidStep(f32),

    #[error("{name} must be a non-negative number of seconds, got {value}")]
    InvalidDuration { name: &'static str, value: f32 },
}

/// Linear map from angle to pulse width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseRange {
    pub min_us: u32,
    pub max_us: u32,
}

impl PulseRange {
    /// Build a pulse range, rejecting empty or inverted bounds
    pub fn new(min_us: u32, max_us: u32) -> Result<Self, ConfigError> {
        let range = Self { min_us, max_us };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_us == 0 {
            return Err(ConfigError::ZeroMinPulse);
        }
        if self.max_us <= self.min_us {
            return Err(ConfigError::InvalidPulseRange {
                min_us: self.min_us,
                max_us: self.max_us,
            });
        }
        Ok(())
    }

    /// Width of the range in microseconds
    pub fn span_us(&self) -> u32 {
        self.max_us - self.min_us
    }
}

impl Default for PulseRange {
    fn default() -> Self {
        Self {
            min_us: DEFAULT_MIN_US,
            max_us: DEFAULT_MAX_US,
        }
    }
}

/// One servo: output channel plus its two endpoint angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel: u8,
    pub rest_deg: f32,
    pub press_deg: f32,
}

impl ChannelConfig {
    pub fn new(channel: u8, rest_deg: f32, press_deg: f32) -> Self {
        Self {
            channel,
            rest_deg,
            press_deg,
        }
    }

    fn validate(
        &self,
        rest_name: &'static str,
        press_name: &'static str,
    ) -> Result<(), ConfigError> {
        if self.channel >= CHANNEL_COUNT {
            return Err(ConfigError::ChannelOutOfRange {
                channel: self.channel,
            });
        }
        check_angle(rest_name, self.rest_deg)?;
        check_angle(press_name, self.press_deg)
    }
}

fn check_angle(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=MAX_ANGLE_DEG).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::AngleOutOfRange { name, value })
    }
}

// Rounded to whole microseconds so 0.01 (not exact in f32) becomes exactly 10ms
fn secs_to_duration(secs: f32) -> Duration {
    Duration::from_micros((f64::from(secs.max(0.0)) * 1_000_000.0).round() as u64)
}

fn check_duration(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { name, value })
    }
}

/// Rest/press angles for both sides, used when re-tuning a live controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnglePairs {
    pub left_rest: f32,
    pub left_press: f32,
    pub right_rest: f32,
    pub right_press: f32,
}

/// Step size and timing of a ramp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    pub step_deg: f32,
    pub step_delay_secs: f32,
    pub press_hold_secs: f32,
}

impl MotionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_deg.is_finite() && self.step_deg > 0.0) {
            return Err(ConfigError::InvalidStep(self.step_deg));
        }
        check_duration("Step delay", self.step_delay_secs)?;
        check_duration("Press hold", self.press_hold_secs)
    }

    pub fn step_delay(&self) -> Duration {
        secs_to_duration(self.step_delay_secs)
    }

    pub fn press_hold(&self) -> Duration {
        secs_to_duration(self.press_hold_secs)
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            step_deg: DEFAULT_STEP_DEG,
            step_delay_secs: DEFAULT_STEP_DELAY_SECS,
            press_hold_secs: DEFAULT_PRESS_HOLD_SECS,
        }
    }
}

/// Where to find the PCA9685
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    pub i2c_path: String,
    pub address: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            i2c_path: DEFAULT_I2C_BUS.to_string(),
            address: DEFAULT_I2C_ADDRESS,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressConfig {
    pub frequency_hz: u32,
    pub left: ChannelConfig,
    pub right: ChannelConfig,
    pub pulse_range: PulseRange,
    pub motion: MotionParams,
    pub bus: BusConfig,
}

impl PressConfig {
    /// Check every field; called before a config is accepted by a controller
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        self.pulse_range.validate()?;
        self.left.validate("Left rest", "Left press")?;
        self.right.validate("Right rest", "Right press")?;
        self.motion.validate()
    }

    pub fn with_angles(mut self, angles: AnglePairs) -> Self {
        self.left.rest_deg = angles.left_rest;
        self.left.press_deg = angles.left_press;
        self.right.rest_deg = angles.right_rest;
        self.right.press_deg = angles.right_press;
        self
    }
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQ_HZ,
            left: ChannelConfig::new(
                DEFAULT_LEFT_CHANNEL,
                DEFAULT_LEFT_REST_DEG,
                DEFAULT_LEFT_PRESS_DEG,
            ),
            right: ChannelConfig::new(
                DEFAULT_RIGHT_CHANNEL,
                DEFAULT_RIGHT_REST_DEG,
                DEFAULT_RIGHT_PRESS_DEG,
            ),
            pulse_range: PulseRange::default(),
            motion: MotionParams::default(),
            bus: BusConfig::default(),
        }
    }
}
