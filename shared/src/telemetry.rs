//! Battery telemetry records: `VOLTAGE:<float>,PERCENTAGE:<float>`, encrypted
//! with the PKCS7 codec, base64 encoded, one record per `\n`-terminated line.

use crate::codec::CipherSpec;
use crate::error::{EncodeError, FrameError, ParseError};

pub const PERCENTAGE_PREFIX: &str = "PERCENTAGE:";

/// A battery percentage, always within `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    percentage: f32,
}

impl TelemetrySample {
    /// Clamps out-of-range readings to the nearest bound
    pub fn new(percentage: f32) -> Self {
        Self {
            percentage: percentage.clamp(0.0, 100.0),
        }
    }

    pub fn percentage(&self) -> f32 {
        self.percentage
    }
}

/// Parses a decrypted record.
///
/// Exactly two comma-separated fields are accepted and the second must carry
/// the `PERCENTAGE:` prefix. The voltage field is not interpreted. Any other
/// shape is rejected rather than guessed at. Values that overflow to
/// infinity are clamped like any other out-of-range reading; NaN is rejected.
pub fn parse_record(text: &str) -> Result<TelemetrySample, ParseError> {
    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != 2 {
        return Err(ParseError::FieldCount(fields.len()));
    }

    let value = fields[1]
        .strip_prefix(PERCENTAGE_PREFIX)
        .ok_or(ParseError::MissingPercentage)?
        .trim();

    match value.parse::<f32>() {
        Ok(percentage) if !percentage.is_nan() => Ok(TelemetrySample::new(percentage)),
        _ => Err(ParseError::Percentage(value.to_string())),
    }
}

/// Base64 line (already stripped of its terminator) to sample
pub fn decode_line(spec: &CipherSpec, line: &str) -> Result<TelemetrySample, FrameError> {
    let text = spec.decrypt_base64(line)?;
    Ok(parse_record(&text)?)
}

pub fn format_record(voltage: f32, percentage: f32) -> String {
    format!("VOLTAGE:{:.3},PERCENTAGE:{:.0}", voltage, percentage)
}

/// Builds one wire line, terminator included.
pub fn encode_line(spec: &CipherSpec, voltage: f32, percentage: f32) -> Result<String, EncodeError> {
    let mut line = spec.encrypt_base64(&format_record(voltage, percentage))?;
    line.push('\n');
    Ok(line)
}
