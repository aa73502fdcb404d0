//! Detector training parameters

use crate::error::{TpodError, TpodResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Well-known parameter names
pub mod keys {
    pub const INPUT_DIR: &str = "input_dir";
    pub const OUTPUT_DIR: &str = "output_dir";
    pub const PIPELINE_CONFIG_PATH: &str = "pipeline_config_path";
    pub const TRAIN_INPUT_PATH: &str = "train_input_path";
    pub const EVAL_INPUT_PATH: &str = "eval_input_path";
    pub const LABEL_MAP_PATH: &str = "label_map_path";
    pub const NUM_CLASSES: &str = "num_classes";
    pub const FINE_TUNE_CHECKPOINT: &str = "fine_tune_checkpoint";
}

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Interpret command line text: integers, floats and booleans are typed,
    /// anything else stays text
    pub fn parse(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(f);
            }
        }
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// The kind of value a declared parameter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ParamKind {
    /// The kind a default value declares
    pub fn of(value: &ParamValue) -> Self {
        match value {
            ParamValue::Bool(_) => Self::Bool,
            ParamValue::Int(_) => Self::Int,
            ParamValue::Float(_) => Self::Float,
            ParamValue::Text(_) => Self::Text,
        }
    }

    /// Convert a supplied value to this kind
    ///
    /// Integers widen to floats and anything can be read as text. Returns
    /// `None` when the value cannot be represented.
    pub fn coerce(self, value: &ParamValue) -> Option<ParamValue> {
        match (self, value) {
            (Self::Bool, ParamValue::Bool(_))
            | (Self::Int, ParamValue::Int(_))
            | (Self::Float, ParamValue::Float(_))
            | (Self::Text, ParamValue::Text(_)) => Some(value.clone()),
            (Self::Float, ParamValue::Int(i)) => Some(ParamValue::Float(*i as f64)),
            (Self::Text, other) => Some(ParamValue::Text(other.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "a boolean",
            Self::Int => "an integer",
            Self::Float => "a number",
            Self::Text => "text",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            // Debug keeps the decimal point on whole numbers
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&Path> for ParamValue {
    fn from(p: &Path) -> Self {
        Self::Text(p.display().to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for ParamValue {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Mutable parameter set owned by one detector while it is being prepared
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectorConfig {
    params: BTreeMap<String, ParamValue>,
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a config with the two directories every detector needs
    pub fn with_dirs(input_dir: &Path, output_dir: &Path) -> Self {
        let mut config = Self::new();
        config.set(keys::INPUT_DIR, input_dir);
        config.set(keys::OUTPUT_DIR, output_dir);
        config
    }

    /// Parse a JSON object of parameters; `null` values count as absent
    pub fn from_json_str(json: &str) -> TpodResult<Self> {
        let raw: BTreeMap<String, Option<ParamValue>> = serde_json::from_str(json)?;
        Ok(Self {
            params: raw
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.params.insert(key.to_string(), value.into());
    }

    /// Insert only if the key is absent; returns whether it was inserted
    pub fn set_default(&mut self, key: &str, value: impl Into<ParamValue>) -> bool {
        if self.params.contains_key(key) {
            return false;
        }
        self.params.insert(key.to_string(), value.into());
        true
    }

    /// Read a path-valued parameter, failing if it is absent
    pub fn require_path(&self, key: &str) -> TpodResult<PathBuf> {
        match self.get(key) {
            Some(ParamValue::Text(s)) if !s.is_empty() => Ok(PathBuf::from(s)),
            _ => Err(TpodError::MissingRequiredParameter(key.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Parameters after derivation and validation; frozen for the job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedConfig(DetectorConfig);

impl ValidatedConfig {
    pub(crate) fn new(config: DetectorConfig) -> Self {
        Self(config)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn params(&self) -> &DetectorConfig {
        &self.0
    }

    pub fn pipeline_config_path(&self) -> TpodResult<PathBuf> {
        self.0.require_path(keys::PIPELINE_CONFIG_PATH)
    }

    pub fn num_classes(&self) -> Option<i64> {
        self.get(keys::NUM_CLASSES).and_then(ParamValue::as_int)
    }
}
