use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use ureq::Agent;

use crate::config::{ApiSettings, Session};
use crate::error::{PayoutError, Result};

/// Fetch the raw payments list from the admin API.
///
/// The request carries the session token and, when a country workspace is
/// selected, scopes the query to it.
pub fn fetch_payments(api: &ApiSettings, session: &Session) -> Result<Value> {
    let bearer = session.bearer()?;
    let url = api.payments_url();

    let agent: Agent = Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(api.timeout_secs)))
        .build()
        .into();

    let mut request = agent.get(url.as_str()).header("Authorization", bearer);
    if let Some(country) = session.country_code.as_deref() {
        request = request
            .header("X-Country-Code", country)
            .query("countryCode", country);
    }

    info!(url = %url, country = ?session.country_code, "fetching payments");

    let body: String = request
        .call()
        .map_err(|source| PayoutError::Request {
            url: url.clone(),
            source,
        })?
        .body_mut()
        .read_to_string()
        .map_err(|source| PayoutError::Request {
            url: url.clone(),
            source,
        })?;

    debug!(bytes = body.len(), "received payments response");

    let json: Value = serde_json::from_str(&body).map_err(|source| PayoutError::InvalidJson {
        name: url.clone(),
        source,
    })?;

    extract_payments(json)
        .map_err(|reason| PayoutError::UnexpectedPayload { name: url, reason })
}

/// Pull the payments array out of an API payload or exported file.
/// Accepts a bare array or an object with a `payments` array.
pub fn extract_payments(payload: Value) -> std::result::Result<Value, String> {
    match payload {
        Value::Array(_) => Ok(payload),
        Value::Object(mut obj) => match obj.remove("payments") {
            Some(payments @ Value::Array(_)) => Ok(payments),
            Some(_) => Err("'payments' is not an array".to_string()),
            None => Err("missing 'payments' field".to_string()),
        },
        _ => Err("expected an array or an object with a 'payments' array".to_string()),
    }
}
