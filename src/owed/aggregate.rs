use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, trace};

use super::range::{InvalidRangePolicy, RangeFilter};
use super::resolve;
use super::types::{LineItem, OwedReport, ProviderSummary};

/// Parameters for one payout aggregation run
#[derive(Debug, Clone, Default)]
pub struct OwedQuery {
    pub provider_id: Option<String>,
    pub from_ymd: String,
    pub to_ymd: String,
    pub on_invalid_range: InvalidRangePolicy,
}

impl OwedQuery {
    pub fn new(from_ymd: impl Into<String>, to_ymd: impl Into<String>) -> Self {
        Self {
            from_ymd: from_ymd.into(),
            to_ymd: to_ymd.into(),
            ..Self::default()
        }
    }

    /// Restrict to one provider. Blank input clears the filter.
    pub fn provider(mut self, provider_id: Option<&str>) -> Self {
        self.provider_id = provider_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned);
        self
    }

    pub fn on_invalid_range(mut self, policy: InvalidRangePolicy) -> Self {
        self.on_invalid_range = policy;
        self
    }

    pub fn range_filter(&self) -> RangeFilter {
        RangeFilter::new(&self.from_ymd, &self.to_ymd, self.on_invalid_range)
    }

    /// Aggregate what each provider is owed. Never fails: records that cannot
    /// be resolved are left out, and non-array input yields an empty report.
    pub fn compute(&self, payments: &Value) -> OwedReport {
        let Some(records) = payments.as_array() else {
            debug!("payments input is not an array, returning empty report");
            return OwedReport::default();
        };

        let range = self.range_filter();
        let mut rows = Vec::new();

        for (idx, record) in records.iter().enumerate() {
            match self.line_item(record, &range) {
                Ok(item) => rows.push(item),
                Err(reason) => trace!(index = idx, reason, "skipping payment record"),
            }
        }

        let providers = summarize(&rows);
        let total_due_all = providers.iter().map(|p| p.total_due).sum();

        debug!(
            considered = records.len(),
            kept = rows.len(),
            skipped = records.len() - rows.len(),
            providers = providers.len(),
            "computed provider payouts"
        );

        OwedReport {
            rows,
            providers,
            total_due_all,
        }
    }

    fn line_item(&self, record: &Value, range: &RangeFilter) -> Result<LineItem, &'static str> {
        let created_at = resolve::created_at(record).ok_or("no usable timestamp")?;

        let amount = resolve::amount_due(record);
        if amount <= 0.0 {
            return Err("no positive amount due");
        }

        if !range.admits(&created_at) {
            return Err("outside date range");
        }

        let provider_id = resolve::provider_id(record).ok_or("no provider id")?;
        if let Some(wanted) = &self.provider_id {
            if *wanted != provider_id {
                return Err("provider filtered out");
            }
        }

        Ok(LineItem {
            provider_id,
            provider_name: resolve::provider_name(record),
            job_id: resolve::job_id(record),
            created_at: resolve::to_iso(&created_at),
            pickup: resolve::pickup(record),
            dropoff: resolve::dropoff(record),
            provider_amount_due: amount,
        })
    }
}

/// Convenience form with the default invalid-range policy.
pub fn compute_provider_owed(
    payments: &Value,
    provider_id: Option<&str>,
    from_ymd: &str,
    to_ymd: &str,
) -> OwedReport {
    OwedQuery::new(from_ymd, to_ymd)
        .provider(provider_id)
        .compute(payments)
}

/// Group line items per provider in first-seen order, then sort by amount
/// owed, largest first. The sort is stable so ties keep input order.
fn summarize(rows: &[LineItem]) -> Vec<ProviderSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut providers: Vec<ProviderSummary> = Vec::new();

    for row in rows {
        let slot = *index.entry(row.provider_id.as_str()).or_insert_with(|| {
            providers.push(ProviderSummary {
                provider_id: row.provider_id.clone(),
                provider_name: None,
                job_count: 0,
                total_due: 0.0,
            });
            providers.len() - 1
        });

        let summary = &mut providers[slot];
        summary.job_count += 1;
        summary.total_due += row.provider_amount_due;
        if summary.provider_name.is_none() {
            summary.provider_name = row.provider_name.clone();
        }
    }

    providers.sort_by(|a, b| b.total_due.total_cmp(&a.total_due));
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sum_rows(report: &OwedReport) -> f64 {
        report.rows.iter().map(|r| r.provider_amount_due).sum()
    }

    fn sample_payments() -> Value {
        json!([
            { "providerId": "p1", "providerName": "Amina", "createdAt": "2024-05-10", "providerAmountDue": 150 },
            { "providerId": "p1", "createdAt": "2024-05-09", "providerAmountDue": 50 },
            {
                "_id": "pay-3",
                "createdAt": "2024-05-09T14:00:00Z",
                "job": {
                    "_id": "job-3",
                    "assignedTo": { "_id": "p2", "name": "Thabo" },
                    "pickupAddressText": "1 Main Rd",
                    "dropoffAddressText": "9 Beach Rd",
                    "pricing": { "providerAmountDue": 400 }
                }
            },
            { "providerId": "p3", "createdAt": "2024-05-09", "providerAmountDue": 0 },
            { "createdAt": "2024-05-09", "providerAmountDue": 75 },
            { "providerId": "p1", "createdAt": "2024-06-01", "providerAmountDue": 999 }
        ])
    }

    #[test]
    fn two_records_for_one_provider() {
        let payments = json!([
            { "providerId": "p1", "providerName": "Amina", "createdAt": "2024-05-10", "providerAmountDue": 150 },
            { "providerId": "p1", "createdAt": "2024-05-09", "providerAmountDue": 50 }
        ]);

        let report = compute_provider_owed(&payments, None, "2024-05-09", "2024-05-10");

        assert_eq!(report.rows.len(), 2);
        assert_eq!(
            report.providers,
            vec![ProviderSummary {
                provider_id: "p1".to_string(),
                provider_name: Some("Amina".to_string()),
                job_count: 2,
                total_due: 200.0,
            }]
        );
        assert_eq!(report.total_due_all, 200.0);
    }

    #[test]
    fn empty_and_non_array_input() {
        let empty = compute_provider_owed(&json!([]), None, "2024-05-01", "2024-05-31");
        assert_eq!(empty, OwedReport::default());
        assert_eq!(empty.total_due_all, 0.0);

        for input in [json!(null), json!({ "payments": [] }), json!("[]"), json!(3)] {
            let report = compute_provider_owed(&input, None, "2024-05-01", "2024-05-31");
            assert!(report.is_empty());
            assert!(report.providers.is_empty());
        }
    }

    #[test]
    fn malformed_records_never_panic() {
        let payments = json!([null, 1, "x", [], {}, { "job": null }, { "job": [] }]);
        let report = compute_provider_owed(&payments, None, "2024-05-01", "2024-05-31");
        assert!(report.is_empty());
    }

    #[test]
    fn line_items_carry_resolved_fields() {
        let report =
            compute_provider_owed(&sample_payments(), None, "2024-05-01", "2024-05-31");

        let nested = report
            .rows
            .iter()
            .find(|r| r.provider_id == "p2")
            .unwrap();
        assert_eq!(nested.provider_name.as_deref(), Some("Thabo"));
        assert_eq!(nested.job_id.as_deref(), Some("job-3"));
        assert_eq!(nested.created_at, "2024-05-09T14:00:00.000Z");
        assert_eq!(nested.pickup.as_deref(), Some("1 Main Rd"));
        assert_eq!(nested.dropoff.as_deref(), Some("9 Beach Rd"));
        assert_eq!(nested.provider_amount_due, 400.0);

        let flat = &report.rows[0];
        assert_eq!(flat.created_at, "2024-05-10T00:00:00.000Z");
        assert_eq!(flat.job_id, None);
    }

    #[test]
    fn excludes_zero_amounts_and_missing_providers() {
        let report =
            compute_provider_owed(&sample_payments(), None, "2024-05-01", "2024-05-31");

        assert_eq!(report.rows.len(), 3);
        assert!(report.rows.iter().all(|r| r.provider_amount_due > 0.0));
        assert!(report.rows.iter().all(|r| !r.provider_id.is_empty()));
        assert!(report.providers.iter().all(|p| p.provider_id != "p3"));
    }

    #[test]
    fn non_numeric_and_negative_amounts_are_excluded() {
        let payments = json!([
            { "providerId": "p1", "createdAt": "2024-05-09", "providerAmountDue": "not-a-number" },
            { "providerId": "p1", "createdAt": "2024-05-09", "providerAmountDue": -20 },
            { "providerId": "p1", "createdAt": "2024-05-09", "providerAmountDue": "35.5" }
        ]);
        let report = compute_provider_owed(&payments, None, "2024-05-09", "2024-05-09");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.total_due_all, 35.5);
    }

    #[test]
    fn records_without_timestamp_are_excluded_even_when_range_is_invalid() {
        let payments = json!([
            { "providerId": "p1", "providerAmountDue": 10 },
            { "providerId": "p1", "createdAt": "2019-01-01", "providerAmountDue": 20 }
        ]);
        let report = compute_provider_owed(&payments, None, "bad", "worse");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.total_due_all, 20.0);
    }

    #[test]
    fn range_end_is_inclusive_to_the_last_second() {
        let payments = json!([
            { "providerId": "p1", "createdAt": "2024-05-10T23:59:59Z", "providerAmountDue": 10 },
            { "providerId": "p1", "createdAt": "2024-05-11T00:00:00Z", "providerAmountDue": 20 }
        ]);
        let report = compute_provider_owed(&payments, None, "2024-05-10", "2024-05-10");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].created_at, "2024-05-10T23:59:59.000Z");
    }

    #[test]
    fn provider_filter_keeps_only_matching_rows() {
        let report =
            compute_provider_owed(&sample_payments(), Some(" p1 "), "2024-05-01", "2024-05-31");
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|r| r.provider_id == "p1"));
        assert_eq!(report.providers.len(), 1);
        assert_eq!(report.providers[0].provider_id, "p1");
        assert_eq!(report.total_due_all, 200.0);

        let blank = compute_provider_owed(&sample_payments(), Some("  "), "2024-05-01", "2024-05-31");
        assert_eq!(blank.providers.len(), 2);
    }

    #[test]
    fn provider_filter_matches_numeric_ids() {
        let payments = json!([
            { "providerId": 7, "createdAt": "2024-05-09", "providerAmountDue": 10 },
            { "providerId": 8, "createdAt": "2024-05-09", "providerAmountDue": 10 }
        ]);
        let report = compute_provider_owed(&payments, Some("7"), "2024-05-09", "2024-05-09");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].provider_id, "7");
    }

    #[test]
    fn providers_sorted_by_total_with_stable_ties() {
        let payments = json!([
            { "providerId": "a", "createdAt": "2024-05-09", "providerAmountDue": 100 },
            { "providerId": "b", "createdAt": "2024-05-09", "providerAmountDue": 300 },
            { "providerId": "c", "createdAt": "2024-05-09", "providerAmountDue": 100 },
            { "providerId": "d", "createdAt": "2024-05-09", "providerAmountDue": 50 },
            { "providerId": "d", "createdAt": "2024-05-09", "providerAmountDue": 50 }
        ]);
        let report = compute_provider_owed(&payments, None, "2024-05-09", "2024-05-09");
        let order: Vec<&str> = report
            .providers
            .iter()
            .map(|p| p.provider_id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn first_non_empty_name_wins() {
        let payments = json!([
            { "providerId": "p1", "createdAt": "2024-05-09", "providerAmountDue": 10 },
            { "providerId": "p1", "providerName": "Amina", "createdAt": "2024-05-09", "providerAmountDue": 10 },
            { "providerId": "p1", "providerName": "Amina K.", "createdAt": "2024-05-09", "providerAmountDue": 10 }
        ]);
        let report = compute_provider_owed(&payments, None, "2024-05-09", "2024-05-09");
        assert_eq!(report.providers[0].provider_name.as_deref(), Some("Amina"));
        assert_eq!(report.rows[0].provider_name, None);
    }

    #[test]
    fn totals_and_counts_are_consistent() {
        let report =
            compute_provider_owed(&sample_payments(), None, "2024-05-01", "2024-05-31");

        let provider_sum: f64 = report.providers.iter().map(|p| p.total_due).sum();
        assert_eq!(report.total_due_all, provider_sum);
        assert_eq!(report.total_due_all, sum_rows(&report));
        assert_eq!(report.total_due_all, 600.0);

        for provider in &report.providers {
            let count = report
                .rows
                .iter()
                .filter(|r| r.provider_id == provider.provider_id)
                .count();
            assert_eq!(provider.job_count, count);
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let payments = sample_payments();
        let first = compute_provider_owed(&payments, None, "2024-05-01", "2024-05-31");
        let second = compute_provider_owed(&payments, None, "2024-05-01", "2024-05-31");
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_range_accept_all_by_default() {
        let report = compute_provider_owed(&sample_payments(), None, "not-a-date", "2024-05-31");
        // Everything with a timestamp and a positive amount, including June.
        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.total_due_all, 1599.0);
    }

    #[test]
    fn invalid_range_reject_all_policy() {
        let report = OwedQuery::new("2024-05-01", "31/05/2024")
            .on_invalid_range(InvalidRangePolicy::RejectAll)
            .compute(&sample_payments());
        assert_eq!(report, OwedReport::default());
    }

    #[test]
    fn reject_all_policy_does_not_affect_valid_ranges() {
        let report = OwedQuery::new("2024-05-01", "2024-05-31")
            .on_invalid_range(InvalidRangePolicy::RejectAll)
            .compute(&sample_payments());
        assert_eq!(report.rows.len(), 3);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let payments = json!([
            { "providerId": "p1", "providerName": "Amina", "createdAt": "2024-05-10", "providerAmountDue": 150 }
        ]);
        let report = compute_provider_owed(&payments, None, "2024-05-10", "2024-05-10");
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["totalDueAll"], json!(150.0));
        assert_eq!(value["providers"][0]["jobCount"], json!(1));
        assert_eq!(value["providers"][0]["totalDue"], json!(150.0));
        assert_eq!(value["rows"][0]["providerAmountDue"], json!(150.0));
        assert_eq!(value["rows"][0]["createdAt"], json!("2024-05-10T00:00:00.000Z"));
    }
}
