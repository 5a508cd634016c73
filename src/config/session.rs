use serde::{Deserialize, Serialize};

use crate::error::{PayoutError, Result};

/// Explicit request context for the admin API: who is calling and which
/// country workspace the requests are scoped to.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn bearer(&self) -> Result<String> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(format!("Bearer {token}")),
            _ => Err(PayoutError::NotLoggedIn),
        }
    }

    /// Select a country workspace; codes are stored upper-case.
    pub fn set_country(&mut self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PayoutError::InvalidCountryCode(code.to_string()));
        }
        self.country_code = Some(code.to_ascii_uppercase());
        Ok(())
    }
}
