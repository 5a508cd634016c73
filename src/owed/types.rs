use serde::Serialize;

/// A single payment record that qualified for payout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub provider_id: String,
    pub provider_name: Option<String>,
    pub job_id: Option<String>,
    /// ISO-8601 UTC with millisecond precision
    pub created_at: String,
    pub pickup: Option<String>,
    pub dropoff: Option<String>,
    pub provider_amount_due: f64,
}

/// Amount owed to one provider across all of its line items
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub provider_id: String,
    pub provider_name: Option<String>,
    pub job_count: usize,
    pub total_due: f64,
}

/// Result of a payout aggregation run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwedReport {
    pub rows: Vec<LineItem>,
    pub providers: Vec<ProviderSummary>,
    pub total_due_all: f64,
}

impl OwedReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
