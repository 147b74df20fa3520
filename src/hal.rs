//! Peripheral seams a node drives. The state machines only ever talk to
//! these traits, so the same logic runs against real hardware, the console
//! stand-ins, or the recording mocks used in tests.

use std::time::Instant;

use crate::messages::Token;

/// Milliseconds on a monotonic clock.
pub type Timestamp = u64;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    White,
    Green,
    Red,
    Orange,
}

pub trait Display {
    fn render(&mut self, background: Color, foreground: Color, text: &str);
}

pub trait Haptics {
    fn set_vibration(&mut self, on: bool);

    /// Plays a tone and returns once it is done. A frequency of 0 is a
    /// silent rest for the given duration.
    fn play_tone(&mut self, frequency_hz: u32, duration_ms: u64);
}

pub trait Indicator {
    fn set_indicator(&mut self, on: bool);
}

/// A debounced, edge-triggered button.
pub trait Input {
    /// True at most once per physical press.
    fn was_pressed(&mut self) -> bool;

    /// The input source went away and the node should stop.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Outbound half of the broker connection.
pub trait Link {
    fn is_connected(&self) -> bool;

    fn publish(&self, token: Token) -> anyhow::Result<()>;
}
