use crate::hal::{Color, Timestamp};
use crate::messages::Token;

/// Timer settings shared by both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub ring_timeout_ms: u64,
    pub grant_timeout_ms: u64,
    pub pulse_half_period_ms: u64,
    pub blink_half_period_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            ring_timeout_ms: 15_000,
            grant_timeout_ms: 5_000,
            pulse_half_period_ms: 500,
            blink_half_period_ms: 200,
        }
    }
}

/// What the display shows for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appearance {
    pub background: Color,
    pub foreground: Color,
    pub label: &'static str,
}

/// One role's event handlers. Implementors own their state, deadline, and
/// peripherals; nothing is shared between roles.
pub trait StateMachine {
    /// Local button edge. Returns the token to publish, if any.
    fn on_press(&mut self, now: Timestamp) -> Option<Token>;

    /// Inbound token from the broker. Never publishes.
    fn on_message(&mut self, token: Token, now: Timestamp);

    /// Fires the fallback transition if the armed deadline has passed.
    fn poll_deadline(&mut self, now: Timestamp);

    /// Recomputes time-driven outputs (pulse, blink) for `now`.
    fn update_effects(&mut self, now: Timestamp);

    /// Redraws if the state changed since the last draw. Returns whether it drew.
    fn redraw(&mut self) -> bool;
}

/// Runs one loop iteration: button, then inbound tokens, then the deadline,
/// then effects, then the display.
pub fn step<M, I>(machine: &mut M, now: Timestamp, pressed: bool, inbound: I) -> Option<Token>
where
    M: StateMachine + ?Sized,
    I: IntoIterator<Item = Token>,
{
    let outbound = if pressed { machine.on_press(now) } else { None };
    for token in inbound {
        machine.on_message(token, now);
    }
    machine.poll_deadline(now);
    machine.update_effects(now);
    machine.redraw();
    outbound
}

/// ON for even half-periods of the absolute clock, OFF for odd ones.
pub fn phase_on(now: Timestamp, half_period_ms: u64) -> bool {
    (now / half_period_ms.max(1)) % 2 == 0
}
