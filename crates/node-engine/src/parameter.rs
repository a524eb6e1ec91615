//! Typed node parameters
//!
//! Every node declares its parameters up front with a semantic type, a
//! default and, for numeric types, an optional inclusive range and step.
//! Values only change through [`Parameters::set`], which validates the new
//! value and reports whether it actually differs from the current one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NodeEngineError, Result};

/// Semantic type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Int,
    Float,
    Bool,
    #[serde(alias = "str")]
    String,
    #[serde(rename = "filepath")]
    FilePath,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::String => "string",
            Self::FilePath => "filepath",
        };
        f.write_str(name)
    }
}

/// A parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Interpret a raw JSON value as a value of `kind`
    pub fn from_json(kind: ParameterKind, value: &serde_json::Value) -> Option<Self> {
        match kind {
            ParameterKind::Int => value
                .as_i64()
                .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Self::Int),
            ParameterKind::Float => value.as_f64().map(Self::Float),
            ParameterKind::Bool => value.as_bool().map(Self::Bool),
            ParameterKind::String | ParameterKind::FilePath => match value {
                serde_json::Value::String(s) => Some(Self::Text(s.clone())),
                serde_json::Value::Null => Some(Self::Text(String::new())),
                _ => None,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(v) => serde_json::json!(v),
            Self::Int(v) => serde_json::json!(v),
            Self::Float(v) => serde_json::json!(v),
            Self::Text(v) => serde_json::json!(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Declaration and current value of one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub kind: ParameterKind,
    pub value: ParamValue,
    pub default: ParamValue,
    /// Inclusive (min, max) for numeric kinds
    pub range: Option<(f64, f64)>,
    pub step: Option<f64>,
}

impl ParameterDescriptor {
    fn new(kind: ParameterKind, default: ParamValue) -> Self {
        Self {
            kind,
            value: default.clone(),
            default,
            range: None,
            step: None,
        }
    }

    pub fn int(default: i64, min: i64, max: i64) -> Self {
        Self::new(ParameterKind::Int, ParamValue::Int(default)).with_range(min as f64, max as f64)
    }

    pub fn float(default: f64, min: f64, max: f64) -> Self {
        Self::new(ParameterKind::Float, ParamValue::Float(default)).with_range(min, max)
    }

    pub fn boolean(default: bool) -> Self {
        Self::new(ParameterKind::Bool, ParamValue::Bool(default))
    }

    pub fn text(default: impl Into<String>) -> Self {
        Self::new(ParameterKind::String, ParamValue::Text(default.into()))
    }

    /// Path to an external file, empty by default
    pub fn file_path() -> Self {
        Self::new(ParameterKind::FilePath, ParamValue::Text(String::new()))
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Check `value` against the declared kind and range, coercing
    /// between integer and float representations where lossless.
    pub fn validate(&self, name: &str, value: ParamValue) -> Result<ParamValue> {
        let mismatch = || NodeEngineError::ParameterTypeMismatch {
            name: name.to_string(),
            expected: self.kind.to_string(),
        };

        let value = match (self.kind, value) {
            (ParameterKind::Int, ParamValue::Int(v)) => ParamValue::Int(v),
            (ParameterKind::Int, ParamValue::Float(v)) if v.fract() == 0.0 => {
                ParamValue::Int(v as i64)
            }
            (ParameterKind::Float, ParamValue::Float(v)) => ParamValue::Float(v),
            (ParameterKind::Float, ParamValue::Int(v)) => ParamValue::Float(v as f64),
            (ParameterKind::Bool, ParamValue::Bool(v)) => ParamValue::Bool(v),
            (ParameterKind::String | ParameterKind::FilePath, ParamValue::Text(v)) => {
                ParamValue::Text(v)
            }
            _ => return Err(mismatch()),
        };

        if let (Some((min, max)), Some(v)) = (self.range, value.as_float()) {
            if v.is_nan() || v < min || v > max {
                return Err(NodeEngineError::ParameterOutOfRange {
                    name: name.to_string(),
                    value: v,
                    min,
                    max,
                });
            }
        }

        Ok(value)
    }
}

/// The parameter set of one node instance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    node_type: String,
    entries: BTreeMap<String, ParameterDescriptor>,
}

impl Parameters {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Builder-style declaration, used by node descriptors
    pub fn with(mut self, name: impl Into<String>, descriptor: ParameterDescriptor) -> Self {
        self.entries.insert(name.into(), descriptor);
        self
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterDescriptor)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current value of a declared parameter
    pub fn value(&self, name: &str) -> Result<&ParamValue> {
        self.entries
            .get(name)
            .map(|d| &d.value)
            .ok_or_else(|| self.unknown(name))
    }

    /// Set a parameter; returns `true` if the stored value changed
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<bool> {
        let unknown = self.unknown(name);
        let descriptor = self.entries.get_mut(name).ok_or(unknown)?;
        let value = descriptor.validate(name, value)?;
        if descriptor.value == value {
            return Ok(false);
        }
        descriptor.value = value;
        Ok(true)
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.value(name)?.as_int().ok_or_else(|| self.mismatch(name))
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        self.value(name)?.as_float().ok_or_else(|| self.mismatch(name))
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.value(name)?.as_bool().ok_or_else(|| self.mismatch(name))
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        self.value(name)?.as_str().ok_or_else(|| self.mismatch(name))
    }

    fn unknown(&self, name: &str) -> NodeEngineError {
        NodeEngineError::UnknownParameter {
            node_type: self.node_type.clone(),
            name: name.to_string(),
        }
    }

    fn mismatch(&self, name: &str) -> NodeEngineError {
        let expected = self
            .entries
            .get(name)
            .map(|d| d.kind.to_string())
            .unwrap_or_default();
        NodeEngineError::ParameterTypeMismatch {
            name: name.to_string(),
            expected,
        }
    }
}
