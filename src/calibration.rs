//! Sensor calibration engine.
//!
//! A raw ADC sample is mapped to a physical unit through a closed set of
//! transforms. Adding a new transform kind means adding a variant here and
//! letting the compiler point at every match that must learn about it —
//! there is no string-dispatched fallthrough.
//!
//! `apply` is a pure function over `(raw, spec)` so it can be tested against
//! literal fixtures with no hardware in the loop.

use serde_json::{Value, json};

use crate::error::ValidationError;

/// Typed description of the raw-to-physical-unit transform for one sensor.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationSpec {
    /// `y = m*x + b`
    Linear { m: f64, b: f64 },
    /// `y = Σ coefficients[i] * x^i`, ascending powers. Empty → 0.
    Polynomial { coefficients: Vec<f64> },
    /// Raw passthrough; the in-memory form of an absent document block.
    Identity,
}

impl CalibrationSpec {
    /// Apply the transform to a raw sample.
    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            Self::Linear { m, b } => m * raw + b,
            Self::Polynomial { coefficients } => {
                // Horner over ascending-power coefficients.
                coefficients.iter().rev().fold(0.0, |acc, c| acc * raw + c)
            }
            Self::Identity => raw,
        }
    }

    /// Validate a candidate spec in document form
    /// (`{"type": "linear"|"polynomial", "params": {...}}`).
    ///
    /// Never mutates caller state; callers swap in the returned spec only
    /// on success, so a rejected candidate leaves the prior spec intact.
    pub fn validate(candidate: &Value) -> Result<Self, ValidationError> {
        let tag = candidate.get("type").and_then(Value::as_str).unwrap_or("");
        let params = candidate.get("params");

        match tag {
            "linear" => {
                let m = require_number(params, "m")?;
                let b = require_number(params, "b")?;
                Ok(Self::Linear { m, b })
            }
            "polynomial" => {
                let coefficients = params
                    .and_then(|p| p.get("coefficients"))
                    .and_then(Value::as_array)
                    .and_then(|a| a.iter().map(Value::as_f64).collect::<Option<Vec<_>>>())
                    .ok_or(ValidationError::MissingParameter("coefficients"))?;
                Ok(Self::Polynomial { coefficients })
            }
            other => Err(ValidationError::UnknownType(other.to_owned())),
        }
    }

    /// Interpret the optional `config` block of a sensor entry at load time.
    /// Absent or empty blocks mean raw passthrough; anything else must be a
    /// well-formed spec or the whole load fails.
    pub fn from_document(block: Option<&Value>) -> Result<Self, ValidationError> {
        match block {
            None | Some(Value::Null) => Ok(Self::Identity),
            Some(v) if v.as_object().is_some_and(serde_json::Map::is_empty) => Ok(Self::Identity),
            Some(v) => Self::validate(v),
        }
    }

    /// Document form of the spec; `None` for `Identity` (absent block).
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Linear { m, b } => Some(json!({
                "type": "linear",
                "params": { "m": m, "b": b },
            })),
            Self::Polynomial { coefficients } => Some(json!({
                "type": "polynomial",
                "params": { "coefficients": coefficients },
            })),
            Self::Identity => None,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}

fn require_number(params: Option<&Value>, name: &'static str) -> Result<f64, ValidationError> {
    params
        .and_then(|p| p.get(name))
        .and_then(Value::as_f64)
        .ok_or(ValidationError::MissingParameter(name))
}
