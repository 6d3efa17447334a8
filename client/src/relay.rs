//! Classifier payloads.
//!
//! The upstream classifier publishes JSON objects such as
//! `{"prediction": 5}`. The value may arrive as an integer, a float or a
//! numeric string; anything else is rejected.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("prediction is not an integer: {0}")]
    Prediction(String),
}

#[derive(Debug, Deserialize)]
struct Payload {
    prediction: Option<Value>,
}

/// Extracts the command code. `Ok(None)` when the payload has no prediction.
pub fn parse_prediction(line: &str) -> Result<Option<i32>, RelayError> {
    let payload: Payload = serde_json::from_str(line)?;
    payload.prediction.map(prediction_code).transpose()
}

fn prediction_code(value: Value) -> Result<i32, RelayError> {
    let code = match &value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    code.and_then(|code| i32::try_from(code).ok())
        .ok_or_else(|| RelayError::Prediction(value.to_string()))
}
