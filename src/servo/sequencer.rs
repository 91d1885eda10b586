// Stepped servo motion
//
// A ramp walks from the last commanded angle toward the target in fixed steps,
// pausing after each intermediate write, and always finishes with one write of
// the exact target so float accumulation can never leave the servo short of it.

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use tracing::debug;

use super::conversion::{angle_to_pulse_us, pulse_us_to_duty};
use super::error::{DeviceOp, PressError};
use super::hal::PwmOutput;
use super::state::ChannelState;
use crate::config::{ChannelConfig, MotionParams, PressConfig, PulseRange};

/// Conversion and timing parameters for a sequencer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerParams {
    pub pulse_range: PulseRange,
    pub frequency_hz: u32,
    pub motion: MotionParams,
}

impl From<&PressConfig> for SequencerParams {
    fn from(config: &PressConfig) -> Self {
        Self {
            pulse_range: config.pulse_range,
            frequency_hz: config.frequency_hz,
            motion: config.motion,
        }
    }
}

/// Intermediate angles of a ramp from `start` to `target`
///
/// Yields `start + step`, `start + 2*step`, ... strictly before `target`; neither
/// endpoint is included. Empty when the step is not positive or the points coincide.
pub fn ramp_angles(start: f32, target: f32, step_deg: f32) -> impl Iterator<Item = f32> {
    let distance = (target - start).abs();
    let steps = if step_deg > 0.0 && distance.is_finite() {
        (distance / step_deg).ceil() as u32
    } else {
        0
    };
    let step = if target > start { step_deg } else { -step_deg };

    (1..steps)
        .map(move |i| start + step * i as f32)
        .take_while(move |&angle| {
            if step > 0.0 {
                angle < target
            } else {
                angle > target
            }
        })
}

/// Executes motions against a borrowed output, delay source and channel state
pub struct MotionSequencer<'a, O, D> {
    output: &'a mut O,
    delay: &'a mut D,
    state: &'a mut ChannelState,
    params: SequencerParams,
}

impl<'a, O: PwmOutput, D: DelayNs> MotionSequencer<'a, O, D> {
    pub fn new(
        output: &'a mut O,
        delay: &'a mut D,
        state: &'a mut ChannelState,
        params: SequencerParams,
    ) -> Self {
        Self {
            output,
            delay,
            state,
            params,
        }
    }

    /// Write one angle to a channel and record it
    ///
    /// The state is only updated after the write succeeded.
    pub fn set_angle_immediate(&mut self, channel: u8, angle_deg: f32) -> Result<(), PressError> {
        let pulse_us = angle_to_pulse_us(angle_deg, self.params.pulse_range);
        let duty = pulse_us_to_duty(pulse_us, self.params.frequency_hz);
        debug!(
            "Channel {}: angle={:.1} pulse={}us duty={}",
            channel, angle_deg, pulse_us, duty
        );

        self.output
            .write_channel_duty(channel, duty)
            .map_err(|e| PressError::device(DeviceOp::WriteChannel { channel }, e))?;
        self.state.set(channel, angle_deg);
        Ok(())
    }

    /// Ramp a channel to `target_deg`
    ///
    /// A channel with no recorded angle jumps straight to the target in one write:
    /// an unknown start position cannot be ramped from.
    pub fn move_smooth(&mut self, channel: u8, target_deg: f32) -> Result<(), PressError> {
        let start = self.state.get(channel).unwrap_or(target_deg);
        if start == target_deg {
            return self.set_angle_immediate(channel, target_deg);
        }

        let step_delay = self.params.motion.step_delay();
        for angle in ramp_angles(start, target_deg, self.params.motion.step_deg) {
            self.set_angle_immediate(channel, angle)?;
            self.wait(step_delay);
        }
        self.set_angle_immediate(channel, target_deg)
    }

    /// Press one servo, hold, and return it to rest
    pub fn press_and_release(&mut self, servo: &ChannelConfig) -> Result<(), PressError> {
        self.move_smooth(servo.channel, servo.press_deg)?;
        self.wait(self.params.motion.press_hold());
        self.move_smooth(servo.channel, servo.rest_deg)
    }

    /// Press two servos back to back with one shared hold
    ///
    /// Ramps run in the order given, in both the press and the release phase.
    pub fn press_and_release_both(
        &mut self,
        first: &ChannelConfig,
        second: &ChannelConfig,
    ) -> Result<(), PressError> {
        self.move_smooth(first.channel, first.press_deg)?;
        self.move_smooth(second.channel, second.press_deg)?;
        self.wait(self.params.motion.press_hold());
        self.move_smooth(first.channel, first.rest_deg)?;
        self.move_smooth(second.channel, second.rest_deg)
    }

    /// Block for the whole duration, in `u32` microsecond chunks
    fn wait(&mut self, duration: Duration) {
        let mut remaining = duration.as_micros();
        while remaining > 0 {
            let chunk = u32::try_from(remaining).unwrap_or(u32::MAX);
            self.delay.delay_us(chunk);
            remaining -= u128::from(chunk);
        }
    }
}
