//! Temperature reading data model.

use serde::{Deserialize, Serialize};

/// One timestamped temperature value.
///
/// Serializes as `{"timestamp": <int>, "temperature": <float>}`, the element
/// shape of every API response array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(rename = "temperature")]
    pub value: f64,
}

/// A persisted reading with its surrogate key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreRow {
    pub id: i64,
    pub reading: Reading,
}
