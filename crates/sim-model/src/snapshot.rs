//! Memory Snapshot Schema
//!
//! A single serialized blob holding the flat event log, pattern list,
//! relationship map and per-kind event indices, plus a metadata stamp.
//!
//! Version history: v1 blobs predate the typed-index feature and carry no
//! `kind_indices`; loaders must reclassify every event from its action name
//! rather than trusting stale kind tags.

use crate::event::{Event, EventKind};
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Metadata stamp written with every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub total_events: usize,
    /// Simulation time at save
    pub saved_at_time: f64,
}

/// The persisted memory blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Schema version; absent in the oldest blobs (treated as 1)
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
    pub events: Vec<Event>,
    pub patterns: Vec<Pattern>,
    /// Directed relationship strengths keyed "a->b"
    #[serde(default)]
    pub relationships: BTreeMap<String, f64>,
    /// Per-kind event id lists; absent in v1 blobs
    #[serde(default)]
    pub kind_indices: BTreeMap<EventKind, Vec<u64>>,
}

impl MemorySnapshot {
    /// True when the blob predates the typed-index feature and every event
    /// kind must be recomputed on load.
    pub fn needs_reclassification(&self) -> bool {
        self.version < SNAPSHOT_VERSION && self.kind_indices.is_empty()
    }
}

fn default_version() -> u32 {
    1
}
