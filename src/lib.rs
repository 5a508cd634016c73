pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod owed;

pub use client::{extract_payments, fetch_payments};
pub use config::{ApiSettings, Config, ReportSettings, Session};
pub use error::{PayoutError, Result};
pub use owed::{
    compute_provider_owed, InvalidRangePolicy, LineItem, OwedQuery, OwedReport, ProviderSummary,
};
