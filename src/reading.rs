//! Sensor Reading
//!
//! The value type shared by every stage of the bridge. The serde field names
//! match the JSON published by the sensors, and the same shape is pushed to
//! dashboard clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One sensor observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Opaque source identifier
    #[serde(rename = "ID")]
    pub id: String,
    /// Temperature in degrees
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    /// Relative humidity in percent
    #[serde(rename = "umidade")]
    pub humidity: f64,
    /// Source-supplied timestamp, passed through untouched
    pub timestamp: String,
    /// Control flag reported by the sensor
    #[serde(rename = "controle")]
    pub control: bool,
}

impl Reading {
    /// Create a new reading
    pub fn new(
        id: impl Into<String>,
        temperature: f64,
        humidity: f64,
        timestamp: impl Into<String>,
        control: bool,
    ) -> Self {
        Self {
            id: id.into(),
            temperature,
            humidity,
            timestamp: timestamp.into(),
            control,
        }
    }
}

/// Errors produced while decoding an inbound payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid sensor payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode a raw JSON payload into a [`Reading`]
///
/// All fields are required. Anything missing or mistyped is rejected as a
/// whole.
pub fn decode_payload(payload: &[u8]) -> Result<Reading, DecodeError> {
    Ok(serde_json::from_slice(payload)?)
}
