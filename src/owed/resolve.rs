//! First-match field resolvers over loosely shaped payment records.
//!
//! Records coming from the admin backend carry their data either at the top
//! level or nested under `job`, under several alternative key names. Every
//! logical field is described by an ordered slice of accessors; the first
//! accessor that yields a value wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

type Accessor = fn(&Value) -> Option<&Value>;

const PROVIDER_ID: &[Accessor] = &[
    |r| r.get("providerId"),
    |r| object_id(r.get("provider")?),
    |r| object_id(job(r).get("assignedTo")?),
    |r| scalar(job(r).get("assignedTo")?),
    |r| job(r).get("providerId"),
];

const PROVIDER_NAME: &[Accessor] = &[
    |r| r.get("providerName"),
    |r| r.get("provider")?.get("name"),
    |r| job(r).get("assignedTo")?.get("name"),
];

const JOB_ID: &[Accessor] = &[
    |r| object_id(r.get("job")?),
    |r| r.get("jobId"),
    |r| scalar(r.get("job")?),
    |r| r.get("_id"),
    |r| r.get("id"),
];

const CREATED_AT: &[Accessor] = &[
    |r| r.get("createdAt"),
    |r| r.get("created_at"),
    |r| r.get("paidAt"),
    |r| job(r).get("createdAt"),
    |r| job(r).get("created_at"),
];

const PICKUP: &[Accessor] = &[
    |r| job(r).get("pickupAddressText"),
    |r| r.get("pickup"),
    |r| job(r).get("pickup"),
];

const DROPOFF: &[Accessor] = &[
    |r| job(r).get("dropoffAddressText"),
    |r| r.get("dropoff"),
    |r| job(r).get("dropoff"),
];

const AMOUNT_DUE: &[Accessor] = &[
    |r| r.get("providerAmountDue"),
    |r| r.get("pricing")?.get("providerAmountDue"),
    |r| job(r).get("pricing")?.get("providerAmountDue"),
    |r| job(r).get("providerAmountDue"),
    |r| r.get("providerAmount"),
    |r| job(r).get("pricing")?.get("providerAmount"),
];

/// The job view of a record: the nested `job` object, or the record itself.
fn job(record: &Value) -> &Value {
    match record.get("job") {
        Some(nested @ Value::Object(_)) => nested,
        _ => record,
    }
}

/// `_id` or `id` of an object-shaped reference.
fn object_id(value: &Value) -> Option<&Value> {
    let obj = value.as_object()?;
    obj.get("_id").or_else(|| obj.get("id"))
}

/// A reference given as a bare string or number.
fn scalar(value: &Value) -> Option<&Value> {
    match value {
        Value::String(_) | Value::Number(_) => Some(value),
        _ => None,
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn first_text(record: &Value, chain: &[Accessor]) -> Option<String> {
    chain
        .iter()
        .filter_map(|access| access(record))
        .find_map(non_empty_text)
}

fn first_present<'a>(record: &'a Value, chain: &[Accessor]) -> Option<&'a Value> {
    chain
        .iter()
        .filter_map(|access| access(record))
        .find(|value| !value.is_null())
}

pub fn provider_id(record: &Value) -> Option<String> {
    first_text(record, PROVIDER_ID)
}

pub fn provider_name(record: &Value) -> Option<String> {
    first_text(record, PROVIDER_NAME)
}

pub fn job_id(record: &Value) -> Option<String> {
    first_text(record, JOB_ID)
}

pub fn pickup(record: &Value) -> Option<String> {
    first_text(record, PICKUP)
}

pub fn dropoff(record: &Value) -> Option<String> {
    first_text(record, DROPOFF)
}

/// First timestamp in the chain that actually parses.
pub fn created_at(record: &Value) -> Option<DateTime<Utc>> {
    CREATED_AT
        .iter()
        .filter_map(|access| access(record))
        .find_map(parse_timestamp)
}

/// Amount owed to the provider; 0 when absent, non-numeric or non-finite.
pub fn amount_due(record: &Value) -> f64 {
    first_present(record, AMOUNT_DUE)
        .map(number_from_value)
        .unwrap_or(0.0)
}

fn number_from_value(value: &Value) -> f64 {
    let number = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// Parse the timestamp shapes the backend is known to emit.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp_str(text.trim()),
        Value::Number(number) => DateTime::from_timestamp_millis(number.as_i64()?),
        Value::Object(obj) => parse_timestamp(obj.get("$date")?),
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Render a timestamp the way the dashboard did (`2024-05-10T00:00:00.000Z`).
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
