// Press controller for the two-servo rig
//
// Owns the PWM output and the tracked channel angles. The bus is opened lazily on
// the first press and released by `close()` (or on drop); any configuration change
// closes a live session so the next press starts over with the new settings.

use std::fmt;

use embedded_hal::delay::DelayNs;
use tracing::{info, warn};

use super::error::{DeviceOp, PressError, ShutdownError, ShutdownReport};
use super::hal::{PwmBus, PwmOutput};
use super::sequencer::{MotionSequencer, SequencerParams};
use super::state::ChannelState;
use crate::config::{AnglePairs, ChannelConfig, ConfigError, MotionParams, PressConfig, PulseRange};

/// Which servo to press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Live hardware session: opened output plus what was last written to it
struct Session<O> {
    output: O,
    state: ChannelState,
}

/// High-level controller: press left, press right, press both
pub struct PressController<B: PwmBus, D: DelayNs> {
    bus: B,
    delay: D,
    config: PressConfig,
    session: Option<Session<B::Output>>,
}

impl<B: PwmBus, D: DelayNs> PressController<B, D> {
    /// Create a controller; the bus is not touched until the first press
    pub fn new(bus: B, delay: D, config: PressConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            bus,
            delay,
            config,
            session: None,
        })
    }

    pub fn config(&self) -> &PressConfig {
        &self.config
    }

    /// True while a hardware session is open
    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    fn servo(&self, side: Side) -> ChannelConfig {
        match side {
            Side::Left => self.config.left,
            Side::Right => self.config.right,
        }
    }

    /// Press and release one servo
    pub fn press(&mut self, side: Side) -> Result<(), PressError> {
        let servo = self.servo(side);
        info!("Pressing {} (channel {})", side, servo.channel);
        self.run(move |seq| seq.press_and_release(&servo))
    }

    pub fn press_left(&mut self) -> Result<(), PressError> {
        self.press(Side::Left)
    }

    pub fn press_right(&mut self) -> Result<(), PressError> {
        self.press(Side::Right)
    }

    /// Press both servos near-simultaneously (left ramp first, then right)
    pub fn press_both(&mut self) -> Result<(), PressError> {
        let (left, right) = (self.config.left, self.config.right);
        info!(
            "Pressing both (channels {} and {})",
            left.channel, right.channel
        );
        self.run(move |seq| seq.press_and_release_both(&left, &right))
    }

    /// Run a motion against the live session, opening it first if needed
    ///
    /// A failed write leaves the servo position unknown, so the session is
    /// discarded and the next call reinitializes from rest.
    fn run<F>(&mut self, motion: F) -> Result<(), PressError>
    where
        F: FnOnce(&mut MotionSequencer<'_, B::Output, D>) -> Result<(), PressError>,
    {
        let session = match self.session.take() {
            Some(session) => session,
            None => Self::open_session(&mut self.bus, &mut self.delay, &self.config)?,
        };
        let session = self.session.insert(session);

        let params = SequencerParams::from(&self.config);
        let mut sequencer =
            MotionSequencer::new(&mut session.output, &mut self.delay, &mut session.state, params);
        let result = motion(&mut sequencer);

        match &result {
            Err(e) if e.is_device_error() => {
                warn!("Motion aborted: {}; closing controller", e);
                self.close();
            }
            Err(e) => warn!("Motion failed: {}", e),
            Ok(()) => {}
        }
        result
    }

    /// Open the bus, set the PWM frequency and drive both servos to rest
    fn open_session(
        bus: &mut B,
        delay: &mut D,
        config: &PressConfig,
    ) -> Result<Session<B::Output>, PressError> {
        let mut output = bus.open().map_err(|e| PressError::BusInit(Box::new(e)))?;
        let mut state = ChannelState::new();

        match Self::seed_rest(&mut output, delay, &mut state, config) {
            Ok(()) => {
                info!(
                    "Controller ready: {} Hz, left ch{} at {}°, right ch{} at {}°",
                    config.frequency_hz,
                    config.left.channel,
                    config.left.rest_deg,
                    config.right.channel,
                    config.right.rest_deg
                );
                Ok(Session { output, state })
            }
            Err(e) => {
                // Never keep a half-initialized bus
                if let Err(release_err) = output.release() {
                    warn!("Failed to release PWM bus after init error: {}", release_err);
                }
                Err(e)
            }
        }
    }

    fn seed_rest(
        output: &mut B::Output,
        delay: &mut D,
        state: &mut ChannelState,
        config: &PressConfig,
    ) -> Result<(), PressError> {
        let hz = config.frequency_hz;
        output
            .set_pwm_frequency(hz)
            .map_err(|e| PressError::device(DeviceOp::SetFrequency { hz }, e))?;

        let mut sequencer =
            MotionSequencer::new(output, delay, state, SequencerParams::from(config));
        sequencer.set_angle_immediate(config.left.channel, config.left.rest_deg)?;
        sequencer.set_angle_immediate(config.right.channel, config.right.rest_deg)
    }

    /// Return both servos to rest and release the bus
    ///
    /// Best-effort: failures are logged and collected in the report, never
    /// returned as errors. Closing an idle controller does nothing.
    pub fn close(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let Some(mut session) = self.session.take() else {
            return report;
        };

        info!("Returning servos to rest and releasing PWM bus");
        let params = SequencerParams::from(&self.config);
        let mut sequencer =
            MotionSequencer::new(&mut session.output, &mut self.delay, &mut session.state, params);
        for servo in [self.config.left, self.config.right] {
            if let Err(source) = sequencer.set_angle_immediate(servo.channel, servo.rest_deg) {
                report.errors.push(ShutdownError::ReturnToRest {
                    channel: servo.channel,
                    source,
                });
            }
        }

        if let Err(e) = session.output.release() {
            report.errors.push(ShutdownError::Release(Box::new(e)));
        }

        for error in &report.errors {
            warn!("Shutdown: {}", error);
        }
        report
    }

    /// Replace the whole configuration, closing any live session first
    pub fn reconfigure(&mut self, config: PressConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if self.is_ready() {
            info!("Configuration changed; closing live controller");
            self.close();
        }
        self.config = config;
        Ok(())
    }

    /// Reassign the output channels
    pub fn set_channels(&mut self, left: u8, right: u8) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.left.channel = left;
        config.right.channel = right;
        self.reconfigure(config)
    }

    /// Re-tune the rest/press angles of both servos
    pub fn set_angles(&mut self, angles: AnglePairs) -> Result<(), ConfigError> {
        let config = self.config.clone().with_angles(angles);
        self.reconfigure(config)
    }

    /// Change the pulse range (e.g. 700..2300 if servos hit their stops)
    pub fn set_pulse_range(&mut self, min_us: u32, max_us: u32) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.pulse_range = PulseRange::new(min_us, max_us)?;
        self.reconfigure(config)
    }

    pub fn set_motion(&mut self, motion: MotionParams) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.motion = motion;
        self.reconfigure(config)
    }
}

impl<B: PwmBus, D: DelayNs> Drop for PressController<B, D> {
    fn drop(&mut self) {
        self.close();
    }
}
