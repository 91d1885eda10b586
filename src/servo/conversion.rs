// Servo unit conversion: angle -> pulse width -> 16-bit duty cycle
// All functions are pure so the same angle always produces the same register value.

use crate::config::{PulseRange, MAX_ANGLE_DEG};

/// Full-scale duty value (16-bit PWM resolution)
pub const DUTY_FULL_SCALE: u16 = 0xFFFF;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Convert an angle to a pulse width in microseconds
///
/// Angles outside 0..=180 are clamped, never rejected. The result is truncated to
/// whole microseconds.
pub fn angle_to_pulse_us(angle_deg: f32, range: PulseRange) -> u32 {
    // NaN falls through clamp and casts to 0, i.e. the minimum pulse
    let angle = angle_deg.clamp(0.0, MAX_ANGLE_DEG);
    let fraction = f64::from(angle) / f64::from(MAX_ANGLE_DEG);
    let offset = (fraction * f64::from(range.span_us())) as u32;
    range.min_us + offset
}

/// Convert a pulse width to a duty value for the given PWM frequency
///
/// The fraction of the period is scaled to [`DUTY_FULL_SCALE`], rounded, and clamped.
pub fn pulse_us_to_duty(pulse_us: u32, freq_hz: u32) -> u16 {
    let period_us = MICROS_PER_SECOND / f64::from(freq_hz.max(1));
    let duty = (f64::from(pulse_us) / period_us * f64::from(DUTY_FULL_SCALE)).round();
    duty.clamp(0.0, f64::from(DUTY_FULL_SCALE)) as u16
}
