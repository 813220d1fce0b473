//! Effect Catalogue Types
//!
//! The fixed set of named world-mutation operations, their invocation form,
//! and the uniform reply shape. The engine crate implements the semantics;
//! these types only describe the wire shape at the boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The fixed effect catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectName {
    Observe,
    Signal,
    Query,
    Transfer,
    Modify,
    Connect,
    Detect,
    Receive,
    Store,
    Compute,
}

impl EffectName {
    /// Returns all catalogue entries.
    pub fn all() -> &'static [EffectName] {
        &[
            EffectName::Observe,
            EffectName::Signal,
            EffectName::Query,
            EffectName::Transfer,
            EffectName::Modify,
            EffectName::Connect,
            EffectName::Detect,
            EffectName::Receive,
            EffectName::Store,
            EffectName::Compute,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectName::Observe => "observe",
            EffectName::Signal => "signal",
            EffectName::Query => "query",
            EffectName::Transfer => "transfer",
            EffectName::Modify => "modify",
            EffectName::Connect => "connect",
            EffectName::Detect => "detect",
            EffectName::Receive => "receive",
            EffectName::Store => "store",
            EffectName::Compute => "compute",
        }
    }
}

impl fmt::Display for EffectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized effect names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEffectNameError(pub String);

impl fmt::Display for ParseEffectNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown effect: '{}'", self.0)
    }
}

impl std::error::Error for ParseEffectNameError {}

impl FromStr for EffectName {
    type Err = ParseEffectNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "observe" => Ok(EffectName::Observe),
            "signal" => Ok(EffectName::Signal),
            "query" => Ok(EffectName::Query),
            "transfer" => Ok(EffectName::Transfer),
            "modify" => Ok(EffectName::Modify),
            "connect" => Ok(EffectName::Connect),
            "detect" => Ok(EffectName::Detect),
            "receive" => Ok(EffectName::Receive),
            "store" => Ok(EffectName::Store),
            "compute" => Ok(EffectName::Compute),
            _ => Err(ParseEffectNameError(s.to_string())),
        }
    }
}

/// One proposed effect call: a catalogue name plus a parameter mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInvocation {
    pub name: EffectName,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl EffectInvocation {
    pub fn new(name: EffectName) -> Self {
        Self {
            name,
            params: Map::new(),
        }
    }

    /// Adds a parameter, builder-style.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Applies known parameter-name aliases from upstream decision policies.
    /// Currently: `search` is mapped to `search_term` for query calls.
    pub fn normalized(mut self) -> Self {
        if self.name == EffectName::Query
            && self.params.contains_key("search")
            && !self.params.contains_key("search_term")
        {
            if let Some(value) = self.params.remove("search") {
                self.params.insert("search_term".to_string(), value);
            }
        }
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn num_param(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }
}

/// Uniform reply shape for every effect: `{success, ...payload}` or
/// `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl EffectReply {
    /// Successful reply with an empty payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: Map::new(),
        }
    }

    /// Successful reply with a payload.
    pub fn ok_with(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            error: None,
            data,
        }
    }

    /// Failed reply carrying the error reason. Failures are data, not
    /// panics: they are logged as normal events and never cross the turn
    /// boundary as errors.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
            data: Map::new(),
        }
    }

    /// Adds a payload field, builder-style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }
}
