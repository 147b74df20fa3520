use log::{debug, info, trace};

use crate::deadline::Deadline;
use crate::hal::{Color, Display, Haptics, Indicator, Timestamp};
use crate::messages::Token;
use crate::node::{Appearance, StateMachine, Timing, phase_on};

/// Short beep confirming the ring went out.
const FEEDBACK_TONE: (u32, u64) = (800, 100);

/// Ascending pair played when the office lets the caller in.
const CONFIRMATION_TONES: [(u32, u64); 3] = [(1_000, 200), (0, 100), (2_000, 200)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Busy,
    Free,
    Ringing,
    Granted,
}

impl DoorState {
    pub fn appearance(self) -> Appearance {
        match self {
            DoorState::Free => Appearance {
                background: Color::Green,
                foreground: Color::Black,
                label: "FREE",
            },
            DoorState::Busy => Appearance {
                background: Color::Red,
                foreground: Color::White,
                label: "BUSY",
            },
            DoorState::Ringing => Appearance {
                background: Color::Orange,
                foreground: Color::White,
                label: "WAIT",
            },
            DoorState::Granted => Appearance {
                background: Color::Green,
                foreground: Color::Black,
                label: "ENTER",
            },
        }
    }
}

/// The call unit outside the door.
///
/// A press while the office is busy rings it; a press while the office is
/// free lets the visitor straight in without asking the broker. Both the
/// ring and the grant revert to `Busy` on their own deadlines.
pub struct DoorNode<D, H, L> {
    state: DoorState,
    last_rendered: Option<DoorState>,
    deadline: Deadline,
    lit: bool,
    timing: Timing,
    display: D,
    haptics: H,
    indicator: L,
}

impl<D: Display, H: Haptics, L: Indicator> DoorNode<D, H, L> {
    pub fn new(display: D, haptics: H, indicator: L, timing: Timing) -> Self {
        DoorNode {
            state: DoorState::Busy,
            last_rendered: None,
            deadline: Deadline::default(),
            lit: false,
            timing,
            display,
            haptics,
            indicator,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> DoorState {
        self.state
    }

    #[cfg(test)]
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    fn transition(&mut self, next: DoorState, now: Timestamp) {
        if self.state != next {
            info!("Door {:?} -> {:?}", self.state, next);
            match self.state {
                DoorState::Granted => {
                    self.deadline.disarm();
                    self.indicator.set_indicator(false);
                    self.lit = false;
                }
                DoorState::Ringing => self.deadline.disarm(),
                DoorState::Busy | DoorState::Free => {}
            }
            self.state = next;
        }
        match next {
            DoorState::Ringing => self.deadline.arm(now, self.timing.ring_timeout_ms),
            DoorState::Granted => self.deadline.arm(now, self.timing.grant_timeout_ms),
            DoorState::Busy | DoorState::Free => {}
        }
    }

    fn play(&mut self, tones: &[(u32, u64)]) {
        for &(frequency_hz, duration_ms) in tones {
            self.haptics.play_tone(frequency_hz, duration_ms);
        }
    }
}

impl<D: Display, H: Haptics, L: Indicator> StateMachine for DoorNode<D, H, L> {
    fn on_press(&mut self, now: Timestamp) -> Option<Token> {
        match self.state {
            DoorState::Busy => {
                self.transition(DoorState::Ringing, now);
                self.play(&[FEEDBACK_TONE]);
                Some(Token::Ring)
            }
            DoorState::Free => {
                self.transition(DoorState::Granted, now);
                None
            }
            DoorState::Ringing | DoorState::Granted => {
                trace!("Press ignored while {:?}", self.state);
                None
            }
        }
    }

    fn on_message(&mut self, token: Token, now: Timestamp) {
        match token {
            Token::Pasa => {
                debug!("Access granted by office");
                self.transition(DoorState::Granted, now);
                self.play(&CONFIRMATION_TONES);
            }
            Token::Ocupado | Token::Busy => self.transition(DoorState::Busy, now),
            Token::Libre | Token::Free => self.transition(DoorState::Free, now),
            Token::Ring => trace!("Door ignores {}", token),
        }
    }

    fn poll_deadline(&mut self, now: Timestamp) {
        if !self.deadline.poll(now) {
            return;
        }
        match self.state {
            DoorState::Granted => info!("Grant window closed"),
            // The office times out on its own clock, nothing to publish.
            DoorState::Ringing => info!("Ring went unanswered"),
            DoorState::Busy | DoorState::Free => return,
        }
        self.transition(DoorState::Busy, now);
    }

    fn update_effects(&mut self, now: Timestamp) {
        if self.state != DoorState::Granted {
            return;
        }
        let on = phase_on(now, self.timing.blink_half_period_ms);
        if on != self.lit {
            self.indicator.set_indicator(on);
            self.lit = on;
        }
    }

    fn redraw(&mut self) -> bool {
        if self.last_rendered == Some(self.state) {
            return false;
        }
        let look = self.state.appearance();
        self.display.render(look.background, look.foreground, look.label);
        self.last_rendered = Some(self.state);
        true
    }
}
