// Last commanded angle per channel

use std::collections::HashMap;

/// Tracks the angle most recently written to each channel.
///
/// Only updated after the hardware write succeeded, so a ramp always starts from
/// where the servo was actually told to be.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    angles: HashMap<u8, f32>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last commanded angle, or `None` if the channel was never written
    pub fn get(&self, channel: u8) -> Option<f32> {
        self.angles.get(&channel).copied()
    }

    /// Record a successfully written angle
    pub fn set(&mut self, channel: u8, angle_deg: f32) {
        self.angles.insert(channel, angle_deg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_channel_is_unknown() {
        let state = ChannelState::new();
        assert_eq!(state.get(15), None);
        assert_eq!(state.get(0), None);
    }

    #[test]
    fn test_set_overwrites_previous_angle() {
        let mut state = ChannelState::new();
        state.set(15, 90.0);
        state.set(15, 40.0);
        state.set(12, 45.0);
        assert_eq!(state.get(15), Some(40.0));
        assert_eq!(state.get(12), Some(45.0));
        assert_eq!(state.get(0), None);
    }
}
