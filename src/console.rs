use std::thread;
use std::time::Duration;

use log::{debug, error, info};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::mpsc;

use crate::hal::{Color, Display, Haptics, Indicator, Input};

#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl Display for ConsoleDisplay {
    fn render(&mut self, background: Color, foreground: Color, text: &str) {
        println!("{}", paint(background, foreground, text));
    }
}

fn paint(background: Color, foreground: Color, text: &str) -> String {
    format!(
        "\x1b[{};{};1m {:^12} \x1b[0m",
        40 + ansi_index(background),
        30 + ansi_index(foreground),
        text
    )
}

fn ansi_index(color: Color) -> u8 {
    match color {
        Color::Black => 0,
        Color::Red => 1,
        Color::Green => 2,
        // Closest of the eight basic colours.
        Color::Orange => 3,
        Color::White => 7,
    }
}

#[derive(Debug, Default)]
pub struct ConsoleHaptics;

impl Haptics for ConsoleHaptics {
    fn set_vibration(&mut self, on: bool) {
        debug!("Vibration {}", if on { "on" } else { "off" });
    }

    fn play_tone(&mut self, frequency_hz: u32, duration_ms: u64) {
        if frequency_hz > 0 {
            info!("Tone {} Hz for {} ms", frequency_hz, duration_ms);
        }
        thread::sleep(Duration::from_millis(duration_ms));
    }
}

#[derive(Debug, Default)]
pub struct ConsoleLed;

impl Indicator for ConsoleLed {
    fn set_indicator(&mut self, on: bool) {
        debug!("Indicator {}", if on { "on" } else { "off" });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleEvent {
    Press,
    Quit,
}

/// Any line on stdin is one press; `q` or end of input stops the node.
pub struct StdinButton {
    rx: mpsc::UnboundedReceiver<ConsoleEvent>,
    closed: bool,
}

impl StdinButton {
    /// Spawns the stdin reader onto the current tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let event = match lines.next_line().await {
                    Ok(Some(line)) => classify(&line),
                    Ok(None) => ConsoleEvent::Quit,
                    Err(err) => {
                        error!("Error reading stdin: {:?}", err);
                        ConsoleEvent::Quit
                    }
                };
                if tx.send(event).is_err() || event == ConsoleEvent::Quit {
                    break;
                }
            }
        });
        StdinButton { rx, closed: false }
    }
}

fn classify(line: &str) -> ConsoleEvent {
    if line.trim().eq_ignore_ascii_case("q") {
        ConsoleEvent::Quit
    } else {
        ConsoleEvent::Press
    }
}

impl Input for StdinButton {
    fn was_pressed(&mut self) -> bool {
        let mut pressed = false;
        loop {
            match self.rx.try_recv() {
                Ok(ConsoleEvent::Press) => pressed = true,
                Ok(ConsoleEvent::Quit) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
            }
        }
        pressed
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
