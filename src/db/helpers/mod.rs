use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use rusqlite::Row;

use crate::db::models::Reading;

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Maps a `(timestamp, temperature)` projection onto a [`Reading`].
pub fn row_to_reading(row: &Row) -> rusqlite::Result<Reading> {
    Ok(Reading {
        timestamp: row.get("timestamp")?,
        value: row.get("temperature")?,
    })
}
