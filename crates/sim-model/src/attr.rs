//! Entity Attribute Model
//!
//! Entities are schema-less attribute bags. Instead of untyped dictionaries,
//! attribute values are a tagged union backed by a generic extension map, so
//! the invariants that matter (stress bounds, status strings, numeric
//! thresholds) can be checked statically at the access sites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known attribute keys used by the scheduler and effects.
pub mod keys {
    /// Agent lifecycle status ("active" agents may act)
    pub const STATUS: &str = "status";
    /// Agent stress, saturates at 1.0 (incapacitated)
    pub const STRESS_LEVEL: &str = "stress_level";
    /// Environment threat scalar in [0, 1]
    pub const THREAT_LEVEL: &str = "threat_level";
    /// Per-round threat escalation rate
    pub const ESCALATION_RATE: &str = "escalation_rate";
    /// Set on agents once threat crosses the activation point
    pub const URGENCY: &str = "urgency";
    /// Remaining strength of the exit barrier
    pub const BARRIER_STRENGTH: &str = "barrier_strength";
    /// Agent objective identifier
    pub const GOAL: &str = "goal";
    /// Entity location identifier
    pub const LOCATION: &str = "location";
    /// Entity role (used for low-resolution observation)
    pub const ROLE: &str = "role";
}

/// A single attribute value.
///
/// Serializes untagged, so attribute maps read naturally as JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttrValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<AttrValue>> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Flag(b)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(items: Vec<AttrValue>) -> Self {
        AttrValue::List(items)
    }
}

/// An entity in the world: a named attribute bag.
///
/// Owned exclusively by the world store and mutated only through the effect
/// catalogue. Any entity may gain or lose attributes over its life.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an entity from (key, value) pairs.
    pub fn from_attrs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<AttrValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let attrs = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { attrs }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.attrs.get(key).and_then(AttrValue::as_number)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_text)
    }

    /// Stress attribute, defaulting to 0.0 when absent.
    pub fn stress_level(&self) -> f64 {
        self.number(keys::STRESS_LEVEL).unwrap_or(0.0)
    }

    /// True when the status attribute is "active" (absent counts as active,
    /// matching the permissive semantics of the original eligibility check).
    pub fn is_active(&self) -> bool {
        self.text(keys::STATUS).map_or(true, |s| s == "active")
    }

    pub fn threat_level(&self) -> f64 {
        self.number(keys::THREAT_LEVEL).unwrap_or(0.0)
    }

    /// True when the urgency flag is set (as a flag or truthy number).
    pub fn has_urgency(&self) -> bool {
        match self.attrs.get(keys::URGENCY) {
            Some(AttrValue::Flag(b)) => *b,
            Some(AttrValue::Number(n)) => *n != 0.0,
            _ => false,
        }
    }

    pub fn barrier_strength(&self) -> Option<f64> {
        self.number(keys::BARRIER_STRENGTH)
    }

    /// Heuristic agent check: agents carry a goal, stress level, or role.
    pub fn looks_like_agent(&self) -> bool {
        self.attrs.contains_key(keys::GOAL)
            || self.attrs.contains_key(keys::STRESS_LEVEL)
            || self.attrs.contains_key(keys::ROLE)
    }
}
