use serde::{Deserialize, Serialize};

use crate::owed::InvalidRangePolicy;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_payments_path")]
    pub payments_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiSettings {
    pub fn payments_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.payments_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportSettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default)]
    pub on_invalid_range: InvalidRangePolicy,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            on_invalid_range: InvalidRangePolicy::default(),
        }
    }
}

fn default_payments_path() -> String {
    "/api/admin/payments".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_currency_symbol() -> String {
    "$".to_string()
}
