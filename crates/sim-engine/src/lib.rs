//! Simulation engine: world store, typed event memory, effect catalogue,
//! decision-oracle boundary, and the turn scheduler.

pub mod config;
pub mod effects;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod oracle;
pub mod scenario;
pub mod scheduler;
pub mod world;

pub use config::SimConfig;
pub use error::{ConfigError, OracleError, SetupError, SnapshotError};
pub use memory::EventMemory;
pub use oracle::{Decision, DecisionOracle, ScriptedOracle, TurnContext};
pub use scheduler::{RunLimits, RunSummary, Scheduler, StopReason};
pub use world::WorldStore;
