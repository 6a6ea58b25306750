//! Logical timestamps used for ordering and conflict resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one participant in an editing session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A write stamp: logical time plus the author that produced it.
///
/// Ordering is by `clock` first, then by `author` lexically, so two stamps
/// from different peers never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp {
    pub clock: u64,
    pub author: PeerId,
}

impl Stamp {
    pub fn new(clock: u64, author: PeerId) -> Self {
        Self { clock, author }
    }
}

/// Lamport clock owned by a single session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LamportClock {
    time: u64,
}

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously observed time.
    pub fn starting_at(time: u64) -> Self {
        Self { time }
    }

    /// Current time without advancing.
    pub fn now(&self) -> u64 {
        self.time
    }

    /// Advance for a local event and return the new time.
    pub fn tick(&mut self) -> u64 {
        self.time += 1;
        self.time
    }

    /// Merge a remote time so later local events order after it.
    pub fn observe(&mut self, remote: u64) {
        self.time = self.time.max(remote) + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_orders_by_clock_then_author() {
        let a1 = Stamp::new(1, PeerId::from("a"));
        let b1 = Stamp::new(1, PeerId::from("b"));
        let a2 = Stamp::new(2, PeerId::from("a"));
        assert!(a1 < b1);
        assert!(b1 < a2);
    }

    #[test]
    fn test_clock_observe_moves_past_remote() {
        let mut clock = LamportClock::new();
        clock.tick();
        clock.observe(10);
        assert_eq!(clock.tick(), 12);
    }
}
