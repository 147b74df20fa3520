use crate::hal::Timestamp;

/// Single-slot timer. Arming replaces whatever was armed before, and an
/// expiry is reported once per arming.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Option<Timestamp>,
}

impl Deadline {
    pub fn arm(&mut self, now: Timestamp, duration_ms: u64) {
        self.expires_at = Some(now.saturating_add(duration_ms));
    }

    pub fn disarm(&mut self) {
        self.expires_at = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.expires_at.is_some()
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Returns true exactly once when `now` has reached the armed time.
    pub fn poll(&mut self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(at) if now >= at => {
                self.expires_at = None;
                true
            }
            _ => false,
        }
    }
}
