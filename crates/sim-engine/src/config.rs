//! Configuration loading for the engine.
//!
//! All tunables are loaded from a TOML configuration file; every section
//! falls back to defaults so partial configs are valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Turn scheduling and run budgets
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Threat escalation and termination thresholds
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Event memory and semantic search settings
    #[serde(default)]
    pub memory: MemoryConfig,
    /// System health monitor settings
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Turn scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum rounds per run
    pub max_rounds: u64,
    /// Maximum simulated time per run
    pub max_time: f64,
    /// Wall-clock budget for the whole run, in seconds
    pub wall_clock_budget_secs: u64,
    /// One selected actor per round instead of a full pass over all
    /// eligible agents
    pub single_actor: bool,
    /// Simulated time advanced per agent turn
    pub turn_dt: f64,
    /// Bounded recent-action history length used for context building
    pub recent_history: usize,
    /// How many trailing events the back-to-back selection penalty inspects
    pub recency_penalty_window: usize,
    /// Additive selection weight per unit of stress
    pub stress_weight: f64,
    /// Multiplicative penalty for agents that acted recently
    pub recency_penalty: f64,
    /// Multiplicative bonus for agents carrying the urgency flag
    pub urgency_bonus: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_rounds: 100,
            max_time: 500.0,
            wall_clock_budget_secs: 300,
            single_actor: true,
            turn_dt: 1.0,
            recent_history: 10,
            recency_penalty_window: 5,
            stress_weight: 0.5,
            recency_penalty: 0.7,
            urgency_bonus: 1.5,
        }
    }
}

/// Environment escalation and termination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Entity holding the threat scalar
    pub environment_entity: String,
    /// Entity whose barrier strength marks the objective
    pub barrier_entity: String,
    /// Fallback escalation rate when the entity carries none
    pub escalation_rate: f64,
    /// Multiplier applied to the escalation rate each update
    pub step_factor: f64,
    /// Threat level at which agents gain the urgency flag
    pub urgency_threshold: f64,
    /// Threat level that ends the run
    pub critical_threat: f64,
    /// Signals older than this are evicted each round
    pub signal_retention: f64,
    /// Minimum simulated time before quiescence can end the run
    pub quiescence_floor: f64,
    /// Trailing window with no events that counts as quiescence
    pub quiescence_window: f64,
    /// Barrier strength at or below which the objective is achieved
    pub barrier_exit_threshold: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment_entity: "environment".to_string(),
            barrier_entity: "exit_door".to_string(),
            escalation_rate: 0.05,
            step_factor: 0.15,
            urgency_threshold: 0.3,
            critical_threat: 0.95,
            signal_retention: 100.0,
            quiescence_floor: 100.0,
            quiescence_window: 20.0,
            barrier_exit_threshold: 10.0,
        }
    }
}

/// Event memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Default number of results per semantic query
    pub top_k: usize,
    /// Scores at or below this are dropped from query results
    pub min_similarity: f64,
    /// Vocabulary cap for the TF-IDF space
    pub vocabulary_cap: usize,
    /// Minimum event count before pattern auto-detection runs
    pub detect_min_events: usize,
    /// Auto-detection fires when the log length is a multiple of this
    pub detect_stride: usize,
    /// Trailing window inspected by pattern auto-detection
    pub detect_window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: 0.1,
            vocabulary_cap: 1000,
            detect_min_events: 5,
            detect_stride: 3,
            detect_window: 10,
        }
    }
}

/// System health monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,
    /// Run the analysis every N actions
    pub interval_actions: u64,
    /// Trailing events inspected per analysis
    pub window: usize,
    /// Observe ratio above which an observation loop is flagged
    pub observe_loop_ratio: f64,
    /// Communication ratio below which breakdown is flagged
    pub comm_breakdown_ratio: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_actions: 10,
            window: 20,
            observe_loop_ratio: 0.7,
            comm_breakdown_ratio: 0.2,
        }
    }
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Engine Configuration

[scheduler]
max_rounds = 100
max_time = 500.0
wall_clock_budget_secs = 300
single_actor = true
turn_dt = 1.0
recent_history = 10
recency_penalty_window = 5
stress_weight = 0.5
recency_penalty = 0.7
urgency_bonus = 1.5

[environment]
environment_entity = "environment"
barrier_entity = "exit_door"
escalation_rate = 0.05
step_factor = 0.15
urgency_threshold = 0.3
critical_threat = 0.95
signal_retention = 100.0
quiescence_floor = 100.0
quiescence_window = 20.0
barrier_exit_threshold = 10.0

[memory]
top_k = 5
min_similarity = 0.1
vocabulary_cap = 1000
detect_min_events = 5
detect_stride = 3
detect_window = 10

[monitor]
enabled = true
interval_actions = 10
window = 20
observe_loop_ratio = 0.7
comm_breakdown_ratio = 0.2
"#
    .to_string()
}
