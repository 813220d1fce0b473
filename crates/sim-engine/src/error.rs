//! Engine error types.
//!
//! Only scenario setup errors are fatal; everything else degrades in place
//! (effect failures become reply data, oracle failures become safe default
//! turns, semantic-index failures become recency fallbacks).

use thiserror::Error;

/// Fatal pre-run errors. A run never starts with an unknown scenario.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("unknown scenario: '{0}'")]
    UnknownScenario(String),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Decision-oracle failures. Recovered locally by substituting a safe
/// default action; never propagated out of a turn.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call failed: {0}")]
    CallFailed(String),
    #[error("oracle returned a malformed response: {0}")]
    Malformed(String),
}

/// Memory snapshot persistence errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
