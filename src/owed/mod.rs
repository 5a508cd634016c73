//! Provider payout aggregation.
//!
//! Groups loosely shaped payment/job records by provider and sums what each
//! provider is owed over an inclusive range of UTC days.

mod aggregate;
mod range;
pub mod resolve;
mod types;

pub use aggregate::{compute_provider_owed, OwedQuery};
pub use range::{DateRange, InvalidRangePolicy, RangeFilter};
pub use types::{LineItem, OwedReport, ProviderSummary};
