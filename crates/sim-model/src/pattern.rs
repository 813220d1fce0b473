//! Discovered Patterns
//!
//! Named, confidence-scored aggregate insights mined from recent event
//! history. Patterns are append-only and immutable once written.

use serde::{Deserialize, Serialize};

/// A discovered strategy or insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Monotonic id assigned by the event memory
    pub id: u64,
    pub name: String,
    pub description: String,
    /// Clamped to [0, 1] at construction
    pub confidence: f64,
    pub discovered_by: String,
    /// Simulation time at discovery
    pub created_at: f64,
    /// How often the pattern has been referenced
    #[serde(default)]
    pub usage_count: u32,
}

impl Pattern {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
        discovered_by: impl Into<String>,
        created_at: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            discovered_by: discovered_by.into(),
            created_at,
            usage_count: 0,
        }
    }
}
