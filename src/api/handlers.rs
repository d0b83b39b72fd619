//! HTTP handlers for the temperature routes.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{CalendarDay, Database, Reading};

use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetParams {
    pub temperature: Option<String>,
}

/// `GET /api/temperature/getlast`
pub async fn get_last(State(db): State<Database>) -> Result<Json<Vec<Reading>>, ApiError> {
    info!("GET /api/temperature/getlast");

    let latest = db.latest_reading().await.map_err(|err| {
        error!("latest reading query failed: {err:?}");
        ApiError::Store("Error: Couldn't read temperatures")
    })?;

    latest
        .map(|reading| Json(vec![reading]))
        .ok_or(ApiError::NotFound)
}

/// `GET /api/temperature/get?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD`
pub async fn get_range(
    State(db): State<Database>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        warn!("rejected range query: {rejection}");
        ApiError::Validation(format!("Error: Invalid query string: {}", rejection.body_text()))
    })?;
    info!("GET /api/temperature/get {params:?}");

    let (Some(start), Some(end)) = (non_empty(params.start_date), non_empty(params.end_date))
    else {
        return Err(ApiError::Validation(
            "Error: Missing required parameters: 'startDate' or 'endDate'".into(),
        ));
    };

    let (start, end) = match (CalendarDay::parse(&start), CalendarDay::parse(&end)) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(err), _) | (_, Err(err)) => {
            return Err(ApiError::Validation(format!(
                "Error: Invalid format for 'startDate' or 'endDate': {err}"
            )));
        }
    };

    let readings = db.readings_between(start, end).await.map_err(|err| {
        error!("range query {start}..{end} failed: {err:?}");
        ApiError::Store("Error: Couldn't read temperatures")
    })?;

    if readings.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(readings))
}

/// `POST /api/temperature/set` with body `temperature=<float>`.
///
/// The body is decoded as a urlencoded form whatever its `Content-Type`.
pub async fn set_temperature(
    State(db): State<Database>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let missing =
        || ApiError::Validation("Error: Missing required parameters: 'temperature'".into());

    let params: SetParams = serde_urlencoded::from_bytes(&body).map_err(|err| {
        warn!("rejected set body: {err}");
        missing()
    })?;
    let raw = non_empty(params.temperature).ok_or_else(missing)?;
    info!("POST /api/temperature/set temperature={raw}");

    let value = parse_temperature(&raw).ok_or_else(|| {
        ApiError::Validation("Error: Invalid format for 'temperature'".into())
    })?;

    db.insert_reading(value).await.map_err(|err| {
        error!("insert of {value} failed: {err:?}");
        ApiError::Store("Error: Couldn't make an entry")
    })?;

    Ok(Json(json!({ "status": "success" })))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Leading whitespace is skipped; the rest must be a finite number.
fn parse_temperature(raw: &str) -> Option<f64> {
    raw.trim_start()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_skips_leading_whitespace_and_must_be_finite() {
        assert_eq!(parse_temperature("21.5"), Some(21.5));
        assert_eq!(parse_temperature("-4"), Some(-4.0));
        assert_eq!(parse_temperature("1e2"), Some(100.0));
        assert_eq!(parse_temperature("abc"), None);
        assert_eq!(parse_temperature("21.5c"), None);
        assert_eq!(parse_temperature(" 21.5"), Some(21.5));
        assert_eq!(parse_temperature("\t-1.25"), Some(-1.25));
        assert_eq!(parse_temperature("21.5 "), None);
        assert_eq!(parse_temperature("   "), None);
        assert_eq!(parse_temperature("inf"), None);
        assert_eq!(parse_temperature("NaN"), None);
    }

    #[test]
    fn empty_parameters_count_as_missing() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("x".into())), Some("x".to_string()));
    }
}
