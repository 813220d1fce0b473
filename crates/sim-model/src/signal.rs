//! Broadcast Signals
//!
//! Time-stamped, intensity-ranked messages between agents. Signals are
//! immutable once created and are garbage-collected by the world store once
//! older than the retention window.

use serde::{Deserialize, Serialize};

/// Target name that delivers a signal to every agent.
pub const BROADCAST_TARGET: &str = "all";

/// A single broadcast signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub sender: String,
    pub message: String,
    /// Priority/urgency, clamped to 1..=10 at creation
    pub intensity: u8,
    /// "all" for broadcast, or a specific agent name
    pub target: String,
    /// Simulation time at creation
    pub timestamp: f64,
    /// Monotonic sequence id assigned by the world store
    pub sequence: u64,
}

impl Signal {
    pub fn new(
        sender: impl Into<String>,
        message: impl Into<String>,
        intensity: i64,
        target: impl Into<String>,
        timestamp: f64,
        sequence: u64,
    ) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
            intensity: intensity.clamp(1, 10) as u8,
            target: target.into(),
            timestamp,
            sequence,
        }
    }

    /// True if this signal is addressed to the given receiver (directly or
    /// via broadcast).
    pub fn addressed_to(&self, receiver: &str) -> bool {
        self.target == BROADCAST_TARGET || self.target == receiver
    }
}
