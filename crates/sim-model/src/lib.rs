//! Shared data types for the emergent simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for the engine crate.

pub mod attr;
pub mod effect;
pub mod event;
pub mod pattern;
pub mod signal;
pub mod snapshot;

pub use attr::{keys, AttrValue, Entity};
pub use effect::{EffectInvocation, EffectName, EffectReply, ParseEffectNameError};
pub use event::{classify_action, Event, EventDraft, EventKind};
pub use pattern::Pattern;
pub use signal::{Signal, BROADCAST_TARGET};
pub use snapshot::{MemorySnapshot, SnapshotMetadata, SNAPSHOT_VERSION};
