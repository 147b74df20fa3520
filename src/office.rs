use log::{debug, info, trace};

use crate::deadline::Deadline;
use crate::hal::{Color, Display, Haptics, Timestamp};
use crate::messages::Token;
use crate::node::{Appearance, StateMachine, Timing, phase_on};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeState {
    Free,
    Busy,
    Ringing,
}

impl OfficeState {
    pub fn appearance(self) -> Appearance {
        match self {
            OfficeState::Free => Appearance {
                background: Color::Green,
                foreground: Color::White,
                label: "FREE",
            },
            OfficeState::Busy => Appearance {
                background: Color::Red,
                foreground: Color::White,
                label: "BUSY",
            },
            OfficeState::Ringing => Appearance {
                background: Color::Orange,
                foreground: Color::Black,
                label: "RING",
            },
        }
    }
}

/// The indicator in the office. Toggles between free and busy, and
/// vibrates while someone is ringing at the door.
pub struct OfficeNode<D, H> {
    state: OfficeState,
    last_rendered: Option<OfficeState>,
    deadline: Deadline,
    vibrating: bool,
    timing: Timing,
    display: D,
    haptics: H,
}

impl<D: Display, H: Haptics> OfficeNode<D, H> {
    /// Starts `Free`. Nothing has been drawn yet, so the first redraw always paints.
    pub fn new(display: D, haptics: H, timing: Timing) -> Self {
        OfficeNode {
            state: OfficeState::Free,
            last_rendered: None,
            deadline: Deadline::default(),
            vibrating: false,
            timing,
            display,
            haptics,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> OfficeState {
        self.state
    }

    #[cfg(test)]
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    fn transition(&mut self, next: OfficeState, now: Timestamp) {
        if self.state != next {
            info!("Office {:?} -> {:?}", self.state, next);
            if self.state == OfficeState::Ringing {
                self.deadline.disarm();
                self.haptics.set_vibration(false);
                self.vibrating = false;
            }
            self.state = next;
        }
        if next == OfficeState::Ringing {
            self.deadline.arm(now, self.timing.ring_timeout_ms);
            debug!("Ring deadline at {:?}", self.deadline.expires_at());
        }
    }
}

impl<D: Display, H: Haptics> StateMachine for OfficeNode<D, H> {
    fn on_press(&mut self, now: Timestamp) -> Option<Token> {
        let (next, token) = match self.state {
            OfficeState::Ringing => (OfficeState::Busy, Token::Pasa),
            OfficeState::Free => (OfficeState::Busy, Token::Ocupado),
            OfficeState::Busy => (OfficeState::Free, Token::Libre),
        };
        self.transition(next, now);
        Some(token)
    }

    fn on_message(&mut self, token: Token, now: Timestamp) {
        match token {
            Token::Ring => {
                debug!("Call request received");
                self.transition(OfficeState::Ringing, now);
            }
            other => trace!("Office ignores {}", other),
        }
    }

    fn poll_deadline(&mut self, now: Timestamp) {
        if self.deadline.poll(now) && self.state == OfficeState::Ringing {
            // The door times out on its own clock, nothing to publish.
            info!("Ring went unanswered");
            self.transition(OfficeState::Busy, now);
        }
    }

    fn update_effects(&mut self, now: Timestamp) {
        if self.state != OfficeState::Ringing {
            return;
        }
        let on = phase_on(now, self.timing.pulse_half_period_ms);
        if on != self.vibrating {
            self.haptics.set_vibration(on);
            self.vibrating = on;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::step;
    use crate::testing::{RecordingDisplay, RecordingHaptics};

    type TestOffice = OfficeNode<RecordingDisplay, RecordingHaptics>;

    fn office() -> TestOffice {
        let mut node = OfficeNode::new(
            RecordingDisplay::default(),
            RecordingHaptics::default(),
            Timing::default(),
        );
        step(&mut node, 0, false, []);
        node
    }

    #[test]
    fn test_starts_free_and_paints_once() {
        let mut node = office();
        assert_eq!(node.state(), OfficeState::Free);
        assert_eq!(node.display.labels(), vec!["FREE"]);
        step(&mut node, 10, false, []);
        assert_eq!(node.display.frames.len(), 1);
    }

    #[test]
    fn test_press_toggles_free_and_busy() {
        let mut node = office();
        assert_eq!(step(&mut node, 10, true, []), Some(Token::Ocupado));
        assert_eq!(node.state(), OfficeState::Busy);
        assert_eq!(step(&mut node, 20, true, []), Some(Token::Libre));
        assert_eq!(node.state(), OfficeState::Free);
        assert_eq!(node.display.labels(), vec!["FREE", "BUSY", "FREE"]);
        assert_eq!(
            node.display.frames[1],
            (Color::Red, Color::White, "BUSY".to_string())
        );
    }

    #[test]
    fn test_ring_arms_deadline_from_any_state() {
        for presses in 0..2 {
            let mut node = office();
            for i in 0..presses {
                step(&mut node, 10 + i, true, []);
            }
            step(&mut node, 100, false, [Token::Ring]);
            assert_eq!(node.state(), OfficeState::Ringing);
            assert_eq!(node.deadline().expires_at(), Some(15_100));
        }
    }

    #[test]
    fn test_press_while_ringing_grants_access() {
        let mut node = office();
        step(&mut node, 1_000, false, [Token::Ring]);
        assert_eq!(step(&mut node, 2_000, true, []), Some(Token::Pasa));
        assert_eq!(node.state(), OfficeState::Busy);
        assert!(!node.deadline().is_armed());
        assert_eq!(node.haptics.vibration.last(), Some(&false));
    }

    #[test]
    fn test_unanswered_ring_falls_back_to_busy_silently() {
        let mut node = office();
        step(&mut node, 0, false, [Token::Ring]);
        assert_eq!(step(&mut node, 14_999, false, []), None);
        assert_eq!(node.state(), OfficeState::Ringing);
        assert_eq!(step(&mut node, 15_000, false, []), None);
        assert_eq!(node.state(), OfficeState::Busy);
        assert!(!node.deadline().is_armed());
        assert_eq!(node.display.labels(), vec!["FREE", "RING", "BUSY"]);
    }

    #[test]
    fn test_repeated_ring_rearms_without_redraw() {
        let mut node = office();
        step(&mut node, 0, false, [Token::Ring]);
        step(&mut node, 10_000, false, [Token::Ring, Token::Ring]);
        assert_eq!(node.deadline().expires_at(), Some(25_000));
        assert_eq!(node.display.labels(), vec!["FREE", "RING"]);
        step(&mut node, 20_000, false, []);
        assert_eq!(node.state(), OfficeState::Ringing);
    }

    #[test]
    fn test_vibration_pulses_with_the_clock() {
        let mut node = office();
        step(&mut node, 0, false, [Token::Ring]);
        for now in [100, 499, 500, 999, 1_000, 1_600] {
            step(&mut node, now, false, []);
        }
        assert_eq!(node.haptics.vibration, vec![true, false, true, false]);
    }

    #[test]
    fn test_pulse_phase_survives_a_stall() {
        let mut node = office();
        step(&mut node, 0, false, [Token::Ring]);
        // Loop stalls from 100 ms to 2 700 ms; phase is what the clock says.
        step(&mut node, 100, false, []);
        step(&mut node, 2_700, false, []);
        assert_eq!(node.vibrating, phase_on(2_700, 500));
        assert!(!node.vibrating);
    }

    #[test]
    fn test_leaving_ringing_stops_vibration_once() {
        let mut node = office();
        step(&mut node, 0, false, [Token::Ring]);
        step(&mut node, 100, false, []);
        step(&mut node, 15_000, false, []);
        assert_eq!(node.haptics.vibration, vec![true, false]);
        step(&mut node, 15_100, false, []);
        step(&mut node, 15_600, false, []);
        assert_eq!(node.haptics.vibration, vec![true, false]);
    }

    #[test]
    fn test_ignores_own_and_door_tokens() {
        let mut node = office();
        step(&mut node, 10, false, [Token::Pasa, Token::Busy, Token::Libre]);
        assert_eq!(node.state(), OfficeState::Free);
        assert!(!node.deadline().is_armed());
        assert_eq!(node.display.frames.len(), 1);
    }

    #[test]
    fn test_press_is_handled_before_message() {
        let mut node = office();
        // Press takes Free -> Busy, then the ring in the same iteration wins.
        let out = step(&mut node, 10, true, [Token::Ring]);
        assert_eq!(out, Some(Token::Ocupado));
        assert_eq!(node.state(), OfficeState::Ringing);
        assert_eq!(node.display.labels(), vec!["FREE", "RING"]);
    }
}
