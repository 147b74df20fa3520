use std::cell::RefCell;
use std::collections::VecDeque;

use crate::hal::{Color, Display, Haptics, Indicator, Input, Link};
use crate::messages::Token;

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub frames: Vec<(Color, Color, String)>,
}

impl RecordingDisplay {
    pub fn labels(&self) -> Vec<&str> {
        self.frames.iter().map(|(_, _, text)| text.as_str()).collect()
    }
}

impl Display for RecordingDisplay {
    fn render(&mut self, background: Color, foreground: Color, text: &str) {
        self.frames.push((background, foreground, text.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct RecordingHaptics {
    pub vibration: Vec<bool>,
    pub tones: Vec<(u32, u64)>,
}

impl Haptics for RecordingHaptics {
    fn set_vibration(&mut self, on: bool) {
        self.vibration.push(on);
    }

    fn play_tone(&mut self, frequency_hz: u32, duration_ms: u64) {
        self.tones.push((frequency_hz, duration_ms));
    }
}

#[derive(Debug, Default)]
pub struct RecordingIndicator {
    pub writes: Vec<bool>,
}

impl Indicator for RecordingIndicator {
    fn set_indicator(&mut self, on: bool) {
        self.writes.push(on);
    }
}

/// Replays a scripted sequence of presses, one entry per poll.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    pub presses: VecDeque<bool>,
    pub closed: bool,
}

impl Input for ScriptedInput {
    fn was_pressed(&mut self) -> bool {
        self.presses.pop_front().unwrap_or(false)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Debug)]
pub struct RecordingLink {
    pub connected: bool,
    pub published: RefCell<Vec<Token>>,
}

impl Default for RecordingLink {
    fn default() -> Self {
        RecordingLink {
            connected: true,
            published: RefCell::new(Vec::new()),
        }
    }
}

impl Link for RecordingLink {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&self, token: Token) -> anyhow::Result<()> {
        self.published.borrow_mut().push(token);
        Ok(())
    }
}
