// Recording test doubles for the PWM capability and delay source

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;

use super::conversion::{angle_to_pulse_us, pulse_us_to_duty};
use super::hal::{PwmBus, PwmOutput};
use crate::config::{PulseRange, DEFAULT_FREQ_HZ};

/// Duty value for an angle under the given pulse range and frequency
pub fn duty_with(angle_deg: f32, range: PulseRange, freq_hz: u32) -> u16 {
    pulse_us_to_duty(angle_to_pulse_us(angle_deg, range), freq_hz)
}

/// Duty value for an angle under the default pulse range and frequency
pub fn duty(angle_deg: f32) -> u16 {
    duty_with(angle_deg, PulseRange::default(), DEFAULT_FREQ_HZ)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Open,
    Frequency(u32),
    Write { channel: u8, duty: u16 },
    Delay { us: u32 },
    Release,
}

#[derive(Debug, thiserror::Error)]
#[error("mock failure: {0}")]
pub struct MockError(&'static str);

#[derive(Debug, Default)]
struct Shared {
    events: Vec<Event>,
    fail_open: bool,
    fail_frequency: bool,
    fail_writes: bool,
    writes_left: Option<usize>,
    fail_release: bool,
}

/// Shared, ordered log of everything the doubles were asked to do
#[derive(Debug, Clone, Default)]
pub struct Recorder(Rc<RefCell<Shared>>);

impl Recorder {
    pub fn bus(&self) -> MockBus {
        MockBus(self.clone())
    }

    pub fn output(&self) -> MockOutput {
        MockOutput(self.clone())
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay(self.clone())
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn writes(&self) -> Vec<(u8, u16)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write { channel, duty } => Some((channel, duty)),
                _ => None,
            })
            .collect()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Delay { us } => Some(us),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events().into_iter().filter(|&e| e == event).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn fail_open(&self, fail: bool) {
        self.0.borrow_mut().fail_open = fail;
    }

    pub fn fail_frequency(&self, fail: bool) {
        self.0.borrow_mut().fail_frequency = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        let mut shared = self.0.borrow_mut();
        shared.fail_writes = fail;
        shared.writes_left = None;
    }

    /// Let `n` more writes succeed, then fail every write
    pub fn fail_after_writes(&self, n: usize) {
        self.0.borrow_mut().writes_left = Some(n);
    }

    pub fn fail_release(&self, fail: bool) {
        self.0.borrow_mut().fail_release = fail;
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }
}

pub struct MockBus(Recorder);

impl PwmBus for MockBus {
    type Output = MockOutput;
    type Error = MockError;

    fn open(&mut self) -> Result<MockOutput, MockError> {
        if self.0.0.borrow().fail_open {
            return Err(MockError("bus unreachable"));
        }
        self.0.push(Event::Open);
        Ok(self.0.output())
    }
}

pub struct MockOutput(Recorder);

impl PwmOutput for MockOutput {
    type Error = MockError;

    fn set_pwm_frequency(&mut self, hz: u32) -> Result<(), MockError> {
        if self.0.0.borrow().fail_frequency {
            return Err(MockError("frequency rejected"));
        }
        self.0.push(Event::Frequency(hz));
        Ok(())
    }

    fn write_channel_duty(&mut self, channel: u8, duty: u16) -> Result<(), MockError> {
        {
            let mut shared = self.0.0.borrow_mut();
            if shared.fail_writes {
                return Err(MockError("write failed"));
            }
            match shared.writes_left {
                Some(0) => return Err(MockError("write failed")),
                Some(ref mut n) => *n -= 1,
                None => {}
            }
        }
        self.0.push(Event::Write { channel, duty });
        Ok(())
    }

    fn release(self) -> Result<(), MockError> {
        if self.0.0.borrow().fail_release {
            return Err(MockError("release failed"));
        }
        self.0.push(Event::Release);
        Ok(())
    }
}

pub struct MockDelay(Recorder);

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.push(Event::Delay { us: ns / 1_000 });
    }

    fn delay_us(&mut self, us: u32) {
        self.0.push(Event::Delay { us });
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.push(Event::Delay {
            us: ms.saturating_mul(1_000),
        });
    }
}
