use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ErrorCode;

/// A flag value as returned by the evaluation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    List(Vec<FlagValue>),
    Map(HashMap<String, FlagValue>),
    Null,
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FlagValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to doubles; the reverse is never done implicitly.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            FlagValue::Double(d) => Some(*d),
            FlagValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FlagValue]> {
        match self {
            FlagValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, FlagValue>> {
        match self {
            FlagValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FlagValue::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FlagValue::Bool(b) => serde_json::Value::Bool(*b),
            FlagValue::Integer(i) => serde_json::Value::from(*i),
            FlagValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FlagValue::String(s) => serde_json::Value::String(s.clone()),
            FlagValue::List(l) => serde_json::Value::Array(l.iter().map(FlagValue::to_json).collect()),
            FlagValue::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            FlagValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::String(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::String(value.to_string())
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Double(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Integer(value)
    }
}

impl From<i32> for FlagValue {
    fn from(value: i32) -> Self {
        FlagValue::Integer(value as i64)
    }
}

impl From<serde_json::Value> for FlagValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => FlagValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FlagValue::Integer(i),
                None => FlagValue::Double(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => FlagValue::String(s),
            serde_json::Value::Array(items) => {
                FlagValue::List(items.into_iter().map(FlagValue::from).collect())
            }
            serde_json::Value::Object(map) => {
                FlagValue::Map(map.into_iter().map(|(k, v)| (k, FlagValue::from(v))).collect())
            }
            serde_json::Value::Null => FlagValue::Null,
        }
    }
}

/// A scalar value attached to a flag's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    String(String),
    Integer(i64),
    Double(f64),
}

/// The last known evaluation result for one flag.
///
/// Entries are never mutated once stored; a refresh replaces them wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFlag {
    pub key: String,
    pub value: FlagValue,
    pub variant: Option<String>,
    pub reason: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_details: Option<String>,
    pub metadata: HashMap<String, MetadataValue>,
}

impl CachedFlag {
    pub fn new(key: impl Into<String>, value: FlagValue) -> Self {
        Self {
            key: key.into(),
            value,
            variant: None,
            reason: None,
            error_code: None,
            error_details: None,
            metadata: HashMap::new(),
        }
    }

    pub fn variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn error(mut self, code: ErrorCode, details: Option<String>) -> Self {
        self.error_code = Some(code);
        self.error_details = details;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}

/// Lifecycle states reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadinessState {
    NotReady,
    Ready,
    Stale,
    ConfigurationChanged,
    Error,
    Fatal,
}

impl ReadinessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessState::NotReady => "NOT_READY",
            ReadinessState::Ready => "READY",
            ReadinessState::Stale => "STALE",
            ReadinessState::ConfigurationChanged => "CONFIGURATION_CHANGED",
            ReadinessState::Error => "ERROR",
            ReadinessState::Fatal => "FATAL",
        }
    }

    /// Whether lookups may be served from the cache in this state.
    pub fn can_serve(&self) -> bool {
        !matches!(self, ReadinessState::NotReady | ReadinessState::Fatal)
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The typed outcome of an evaluation, handed back to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationDetails<T> {
    pub flag_key: String,
    pub value: T,
    pub variant: Option<String>,
    pub reason: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub metadata: HashMap<String, MetadataValue>,
}

impl<T> EvaluationDetails<T> {
    pub fn from_flag(flag: &CachedFlag, value: T) -> Self {
        Self {
            flag_key: flag.key.clone(),
            value,
            variant: flag.variant.clone(),
            reason: flag.reason.clone(),
            error_code: None,
            error_message: None,
            metadata: flag.metadata.clone(),
        }
    }

    pub fn default_result(key: impl Into<String>, default_value: T, error: &crate::OfrepError) -> Self {
        Self {
            flag_key: key.into(),
            value: default_value,
            variant: None,
            reason: Some("ERROR".to_string()),
            error_code: Some(error.code),
            error_message: Some(error.message.clone()),
            metadata: HashMap::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EvaluationDetails<U> {
        EvaluationDetails {
            flag_key: self.flag_key,
            value: f(self.value),
            variant: self.variant,
            reason: self.reason,
            error_code: self.error_code,
            error_message: self.error_message,
            metadata: self.metadata,
        }
    }
}

/// Attribute key marking an anonymous subject.
pub const ANONYMOUS_ATTRIBUTE: &str = "anonymous";

/// The subject a bulk evaluation is computed for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeting_key: Option<String>,
    #[serde(flatten)]
    pub attributes: HashMap<String, FlagValue>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targeting_key(targeting_key: impl Into<String>) -> Self {
        Self {
            targeting_key: Some(targeting_key.into()),
            attributes: HashMap::new(),
        }
    }

    pub fn targeting_key(mut self, targeting_key: impl Into<String>) -> Self {
        self.targeting_key = Some(targeting_key.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes(mut self, attrs: HashMap<String, FlagValue>) -> Self {
        self.attributes.extend(attrs);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.attributes.get(key)
    }

    pub fn is_anonymous(&self) -> bool {
        self.get(ANONYMOUS_ATTRIBUTE)
            .and_then(FlagValue::as_bool)
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.targeting_key.is_none() && self.attributes.is_empty()
    }
}
