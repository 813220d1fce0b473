//! Decision Oracle Boundary
//!
//! The decision policy is an external collaborator; the engine only sees
//! this trait. One call per turn, blocking, no engine-enforced timeout: a
//! wall-clock budget bounds the run, not the individual call.
//!
//! Policy failures never abort a run. A hard error degrades to a safe
//! default action at the scheduler, and an empty decision is replaced by a
//! diversity-aware fallback.

use crate::error::OracleError;
use sim_model::{EffectInvocation, Entity, Signal};

/// One turn's proposal from the policy: an ordered list of effect
/// invocations plus the free-text justification that gets logged with each
/// resulting event.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub invocations: Vec<EffectInvocation>,
    pub justification: String,
}

impl Decision {
    pub fn new(justification: impl Into<String>) -> Self {
        Self {
            invocations: Vec::new(),
            justification: justification.into(),
        }
    }

    pub fn with_invocation(mut self, invocation: EffectInvocation) -> Self {
        self.invocations.push(invocation);
        self
    }
}

/// A peer agent as shown to the policy: identity plus coarse state only.
#[derive(Debug, Clone)]
pub struct PeerView {
    pub id: String,
    pub status: String,
    pub goal: String,
}

/// Read-only world context serialized for one agent's turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub time: f64,
    pub round: u64,
    pub actor: String,
    /// The acting agent's own attribute bag
    pub actor_state: Entity,
    pub peers: Vec<PeerView>,
    /// Newest few signals addressed to the actor
    pub recent_signals: Vec<Signal>,
    /// One-line summaries of the most recent events
    pub recent_events: Vec<String>,
    /// Top semantic matches for the agent's goal, when the index has data
    pub memory_excerpt: Vec<String>,
}

/// The external decision policy.
pub trait DecisionOracle {
    fn decide(&mut self, ctx: &TurnContext) -> Result<Decision, OracleError>;
}

/// Deterministic queue-backed oracle for tests and offline runs. Replays
/// its scripted decisions in order; once exhausted it returns empty
/// decisions, which the scheduler turns into diversity-aware fallbacks.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: std::collections::VecDeque<Decision>,
}

impl ScriptedOracle {
    pub fn new(script: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn push(&mut self, decision: Decision) {
        self.script.push_back(decision);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DecisionOracle for ScriptedOracle {
    fn decide(&mut self, _ctx: &TurnContext) -> Result<Decision, OracleError> {
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| Decision::new("script exhausted")))
    }
}
