//! Event Types
//!
//! Events are the atomic units of simulation history: one record per effect
//! invocation, plus auto-derived secondary records (outcomes, learnings,
//! hypotheses). Every event carries exactly one of five semantic kinds,
//! assigned once at insertion and immutable thereafter.

use crate::effect::EffectReply;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The five semantic event kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Perception,
    Action,
    Outcome,
    Learning,
    Hypothesis,
}

impl EventKind {
    /// Returns all kind variants.
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::Perception,
            EventKind::Action,
            EventKind::Outcome,
            EventKind::Learning,
            EventKind::Hypothesis,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Perception => "perception",
            EventKind::Action => "action",
            EventKind::Outcome => "outcome",
            EventKind::Learning => "learning",
            EventKind::Hypothesis => "hypothesis",
        }
    }

    /// Parses a kind name, returning None for unknown strings. Query paths
    /// treat unknown kinds as empty result sets rather than errors.
    pub fn parse(s: &str) -> Option<EventKind> {
        match s {
            "perception" => Some(EventKind::Perception),
            "action" => Some(EventKind::Action),
            "outcome" => Some(EventKind::Outcome),
            "learning" => Some(EventKind::Learning),
            "hypothesis" => Some(EventKind::Hypothesis),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action names classified as perceptions (information gathering).
const PERCEPTION_ACTIONS: &[&str] = &["observe", "query", "detect", "receive"];

/// Classifies an action name into a primary event kind.
///
/// Pure and total: everything outside the perception set, including unknown
/// names, classifies as `Action`.
pub fn classify_action(action: &str) -> EventKind {
    if PERCEPTION_ACTIONS.contains(&action) {
        EventKind::Perception
    } else {
        EventKind::Action
    }
}

/// An immutable log record of one effect invocation or one derived fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic id assigned by the event memory
    pub id: u64,
    /// Simulation time at insertion
    pub timestamp: f64,
    pub actor: String,
    /// Effect name, or a derived marker like "derived_outcome"
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EffectReply>,
    /// Free-text justification from the decision policy
    #[serde(default)]
    pub justification: String,
    pub kind: EventKind,
    /// Explicit link from a secondary event to its originating primary event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u64>,
}

impl Event {
    /// Concatenated searchable text for semantic indexing.
    pub fn searchable_text(&self) -> String {
        let params = Value::Object(self.params.clone()).to_string();
        let result = self
            .result
            .as_ref()
            .and_then(|r| serde_json::to_string(r).ok())
            .unwrap_or_default();
        format!(
            "{} {} {} {} {}",
            self.actor, self.action, self.justification, params, result
        )
    }
}

/// An event that has not been appended yet: no id, and an optional explicit
/// kind. `kind: None` means "classify from the action name on append";
/// `Some(kind)` marks a pre-classified secondary event that classification
/// returns unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub timestamp: f64,
    pub actor: String,
    pub action: String,
    pub params: Map<String, Value>,
    pub result: Option<EffectReply>,
    pub justification: String,
    pub kind: Option<EventKind>,
    pub source_id: Option<u64>,
}

impl EventDraft {
    pub fn new(timestamp: f64, actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            timestamp,
            actor: actor.into(),
            action: action.into(),
            params: Map::new(),
            result: None,
            justification: String::new(),
            kind: None,
            source_id: None,
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_result(mut self, result: EffectReply) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_justification(mut self, text: impl Into<String>) -> Self {
        self.justification = text.into();
        self
    }

    /// Pre-classifies the draft (used for derived secondary events).
    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_source(mut self, source_id: u64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// Resolves the draft's kind: the explicit kind wins, otherwise the
    /// action name is classified.
    pub fn resolve_kind(&self) -> EventKind {
        self.kind.unwrap_or_else(|| classify_action(&self.action))
    }

    /// Finalizes the draft into an event with the given id.
    pub fn into_event(self, id: u64) -> Event {
        let kind = self.resolve_kind();
        Event {
            id,
            timestamp: self.timestamp,
            actor: self.actor,
            action: self.action,
            params: self.params,
            result: self.result,
            justification: self.justification,
            kind,
            source_id: self.source_id,
        }
    }
}
