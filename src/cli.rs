// Command-line surface: one press, then always close
//
// Every tuning value can come from a flag or from the environment variable the
// rig has always used (PCA_LEFT_CH, PCA_MIN_US, ...).

use clap::{ArgGroup, CommandFactory, Parser};
use linux_embedded_hal::Delay;
use tracing::info;

use crate::config::*;
use crate::servo::{LinuxPwmBus, PressController, Side};

#[derive(Debug, Parser)]
#[command(name = "pca-press", about = "Press PCA9685 servos via I2C.")]
#[command(group(ArgGroup::new("action").args(["both", "left", "right"])))]
pub struct Args {
    /// Press both servos
    #[arg(long)]
    pub both: bool,

    /// Press left servo
    #[arg(long)]
    pub left: bool,

    /// Press right servo
    #[arg(long)]
    pub right: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    #[arg(long, env = "PCA9685_FREQ", default_value_t = DEFAULT_FREQ_HZ)]
    pub freq: u32,

    #[arg(long, env = "PCA_LEFT_CH", default_value_t = DEFAULT_LEFT_CHANNEL)]
    pub left_ch: u8,

    #[arg(long, env = "PCA_RIGHT_CH", default_value_t = DEFAULT_RIGHT_CHANNEL)]
    pub right_ch: u8,

    #[arg(long, env = "PCA_LEFT_REST", default_value_t = DEFAULT_LEFT_REST_DEG)]
    pub left_rest: f32,

    #[arg(long, env = "PCA_LEFT_PRESS", default_value_t = DEFAULT_LEFT_PRESS_DEG)]
    pub left_press: f32,

    #[arg(long, env = "PCA_RIGHT_REST", default_value_t = DEFAULT_RIGHT_REST_DEG)]
    pub right_rest: f32,

    #[arg(long, env = "PCA_RIGHT_PRESS", default_value_t = DEFAULT_RIGHT_PRESS_DEG)]
    pub right_press: f32,

    /// Pulse width at 0 degrees (microseconds)
    #[arg(long, env = "PCA_MIN_US", default_value_t = DEFAULT_MIN_US)]
    pub min_us: u32,

    /// Pulse width at 180 degrees (microseconds)
    #[arg(long, env = "PCA_MAX_US", default_value_t = DEFAULT_MAX_US)]
    pub max_us: u32,

    #[arg(long, env = "PCA_STEP_DEG", default_value_t = DEFAULT_STEP_DEG)]
    pub step_deg: f32,

    /// Pause after each step (seconds)
    #[arg(long, env = "PCA_STEP_DELAY", default_value_t = DEFAULT_STEP_DELAY_SECS)]
    pub step_delay: f32,

    /// Time spent at the press angle (seconds)
    #[arg(long, env = "PCA_PRESS_HOLD", default_value_t = DEFAULT_PRESS_HOLD_SECS)]
    pub press_hold: f32,

    #[arg(long, env = "PCA_I2C_BUS", default_value = DEFAULT_I2C_BUS)]
    pub i2c_bus: String,

    /// 7-bit I2C address, decimal or 0x-prefixed hex
    #[arg(long, env = "PCA_ADDRESS", default_value = "0x40", value_parser = parse_address)]
    pub address: u8,
}

/// What the invocation asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Both,
    Single(Side),
}

impl Args {
    pub fn action(&self) -> Option<Action> {
        if self.both {
            Some(Action::Both)
        } else if self.left {
            Some(Action::Single(Side::Left))
        } else if self.right {
            Some(Action::Single(Side::Right))
        } else {
            None
        }
    }

    /// Assemble the (unvalidated) controller configuration
    pub fn config(&self) -> PressConfig {
        PressConfig {
            frequency_hz: self.freq,
            left: ChannelConfig::new(self.left_ch, self.left_rest, self.left_press),
            right: ChannelConfig::new(self.right_ch, self.right_rest, self.right_press),
            pulse_range: PulseRange {
                min_us: self.min_us,
                max_us: self.max_us,
            },
            motion: MotionParams {
                step_deg: self.step_deg,
                step_delay_secs: self.step_delay,
                press_hold_secs: self.press_hold,
            },
            bus: BusConfig {
                i2c_path: self.i2c_bus.clone(),
                address: self.address,
            },
        }
    }
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid I2C address '{s}': {e}"))?;

    if parsed > 0x7F {
        return Err(format!("I2C address 0x{parsed:02X} is not a 7-bit address"));
    }
    Ok(parsed)
}

pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = args.config();

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(action) = args.action() else {
        Args::command().print_help()?;
        return Ok(());
    };

    let bus = LinuxPwmBus::new(config.bus.i2c_path.clone(), config.bus.address);
    let mut controller = PressController::new(bus, Delay, config)?;

    let result = match action {
        Action::Both => controller.press_both(),
        Action::Single(side) => controller.press(side),
    };
    if result.is_ok() {
        println!("OK");
    }

    let report = controller.close();
    if !report.is_clean() {
        info!("Closed with {} shutdown warning(s)", report.errors.len());
    }

    result.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_args_match_default_config() {
        let args = Args::try_parse_from(["pca-press"]).unwrap();
        assert_eq!(args.action(), None);
        assert_eq!(args.config(), PressConfig::default());
    }

    #[test]
    fn test_action_flags() {
        let args = Args::try_parse_from(["pca-press", "--both"]).unwrap();
        assert_eq!(args.action(), Some(Action::Both));

        let args = Args::try_parse_from(["pca-press", "--right"]).unwrap();
        assert_eq!(args.action(), Some(Action::Single(Side::Right)));
    }

    #[test]
    fn test_action_flags_are_exclusive() {
        assert!(Args::try_parse_from(["pca-press", "--left", "--right"]).is_err());
    }

    #[test]
    fn test_overrides_reach_config() {
        let args = Args::try_parse_from([
            "pca-press",
            "--left",
            "--left-ch",
            "3",
            "--min-us",
            "700",
            "--max-us",
            "2300",
            "--press-hold",
            "0.5",
            "--address",
            "0x41",
        ])
        .unwrap();
        let config = args.config();
        assert_eq!(config.left.channel, 3);
        assert_eq!(config.pulse_range, PulseRange::new(700, 2300).unwrap());
        assert_eq!(config.motion.press_hold_secs, 0.5);
        assert_eq!(config.bus.address, 0x41);
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x40"), Ok(0x40));
        assert_eq!(parse_address("65"), Ok(65));
        assert!(parse_address("0x80").is_err());
        assert!(parse_address("pca").is_err());
    }
}
