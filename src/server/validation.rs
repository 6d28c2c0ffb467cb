//! Request body validation for player updates

use serde_json::Value;
use thiserror::Error;

use crate::feedback::DifficultyRequest;

/// Fields every update must carry
pub const REQUIRED_FIELDS: [&str; 4] = ["score", "reactionTime", "mistakes", "speed"];
/// Fields that default to 0 when absent
pub const OPTIONAL_FIELDS: [&str; 2] = ["distance", "combo"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid data types")]
    InvalidTypes,

    #[error("Invalid values")]
    NegativeValues,
}

impl ValidationError {
    /// Human-readable detail for the error body
    pub fn detail(&self) -> &'static str {
        match self {
            ValidationError::MissingFields => "score, reactionTime, mistakes and speed are required",
            ValidationError::InvalidTypes => "All fields must be numbers",
            ValidationError::NegativeValues => "All values must be positive numbers",
        }
    }
}

fn number(body: &Value, field: &str) -> Result<Option<f64>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let n = v.as_f64().ok_or(ValidationError::InvalidTypes)?;
            if !n.is_finite() {
                return Err(ValidationError::InvalidTypes);
            }
            Ok(Some(n))
        }
    }
}

/// Check a raw update body and turn it into a request
///
/// Presence is checked before types, and types before ranges, so a body
/// with several problems reports the first one in that order.
pub fn validate_player_data(body: &Value) -> Result<DifficultyRequest, ValidationError> {
    if !body.is_object() {
        return Err(ValidationError::MissingFields);
    }
    if REQUIRED_FIELDS
        .iter()
        .any(|f| matches!(body.get(*f), None | Some(Value::Null)))
    {
        return Err(ValidationError::MissingFields);
    }

    let mut values = [0.0; 6];
    for (slot, field) in values
        .iter_mut()
        .zip(REQUIRED_FIELDS.iter().chain(OPTIONAL_FIELDS.iter()))
    {
        *slot = number(body, field)?.unwrap_or(0.0);
    }
    if values.iter().any(|v| *v < 0.0) {
        return Err(ValidationError::NegativeValues);
    }

    let [score, reaction_time, mistakes, speed, distance, combo] = values;
    Ok(DifficultyRequest {
        score,
        reaction_time,
        mistakes,
        speed,
        distance,
        combo,
    })
}
