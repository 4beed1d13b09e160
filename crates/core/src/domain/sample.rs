//! Volume samples pushed by audio sources
//!
//! Producers are loosely typed (browser meters sending whatever their form
//! fields hold), so inbound data arrives as a [`RawSample`] and is coerced into
//! a strongly typed [`Sample`] at the boundary. Anything that cannot be coerced
//! is rejected with a [`SampleError`] and never reaches the registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors raised while coercing an inbound sample
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} is empty")]
    EmptyField { field: &'static str },

    #[error("Field {field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("Field {field} has unsupported type: {value}")]
    UnsupportedType { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, SampleError>;

/// Opaque identifier of an audio source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a scene, the unit that carries one presence state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneName(String);

impl SceneName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Latest volume reading of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub source_id: SourceId,
    /// dB-like level, more negative is quieter
    pub volume: i64,
    pub scene: SceneName,
    /// Activation threshold for this source
    pub limit: i64,
}

impl Sample {
    pub fn new(
        source_id: impl Into<String>,
        volume: i64,
        scene: impl Into<String>,
        limit: i64,
    ) -> Self {
        Self {
            source_id: SourceId::new(source_id),
            volume,
            scene: SceneName::new(scene),
            limit,
        }
    }

    /// Strictly above the source's own limit
    pub fn exceeds_limit(&self) -> bool {
        self.volume > self.limit
    }

    /// Parse and coerce a bare `{volume, id, scene, limit}` JSON object
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawSample = serde_json::from_str(text)?;
        Self::try_from(raw)
    }
}

/// Sample as it appears on the wire, before coercion
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub volume: Option<Value>,
    #[serde(default)]
    pub scene: Option<Value>,
    #[serde(default)]
    pub limit: Option<Value>,
}

impl TryFrom<RawSample> for Sample {
    type Error = SampleError;

    fn try_from(raw: RawSample) -> Result<Self> {
        let source_id = coerce_key("id", raw.id)?;
        let scene = coerce_key("scene", raw.scene)?;
        let volume = coerce_integer("volume", raw.volume)?;
        let limit = coerce_integer("limit", raw.limit)?;

        Ok(Self {
            source_id: SourceId::new(source_id),
            volume,
            scene: SceneName::new(scene),
            limit,
        })
    }
}

/// Accept strings and numbers as identifiers
fn coerce_key(field: &'static str, value: Option<Value>) -> Result<String> {
    let key = match value {
        None | Some(Value::Null) => return Err(SampleError::MissingField(field)),
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(SampleError::UnsupportedType {
                field,
                value: other.to_string(),
            })
        }
    };

    if key.trim().is_empty() {
        return Err(SampleError::EmptyField { field });
    }
    Ok(key)
}

/// Lenient integer coercion: floats truncate toward zero, strings are read
/// up to the first non-digit (`"-25dB"` is -25, `"12.7"` is 12).
fn coerce_integer(field: &'static str, value: Option<Value>) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Err(SampleError::MissingField(field)),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() => Ok(f.trunc() as i64),
                _ => Err(SampleError::NotNumeric {
                    field,
                    value: n.to_string(),
                }),
            }
        }
        Some(Value::String(s)) => {
            parse_leading_integer(&s).ok_or(SampleError::NotNumeric { field, value: s })
        }
        Some(other) => Err(SampleError::UnsupportedType {
            field,
            value: other.to_string(),
        }),
    }
}

fn parse_leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
