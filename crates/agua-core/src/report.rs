//! # Collection Report
//!
//! Aggregates outstanding voucher debt per client for a billing period.
//!
//! ## Aggregation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Vouchers                          Period 2026-03-01 ..= 2026-03-31     │
//! │  ────────                                                               │
//! │  V1 Ana   30.00 active  03-02  ──┐                                      │
//! │  V2 Ana   20.00 active  03-20  ──┼──► Ana   2 vouchers, 50.00 owed      │
//! │  V3 Luis  15.00 active  03-05  ──┼──► Luis  1 voucher,  15.00 owed      │
//! │  V4 Luis  10.00 paid    03-07  ──┤    (paid: skipped)                   │
//! │  V5 Ana    8.00 active  02-27  ──┘    (outside period: skipped)         │
//! │                                                                         │
//! │  Summary: 2 clients, 3 vouchers, 65.00 total debt                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The builder only reads. Clients are ordered by remaining debt, largest
//! first, then by id.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Client, Voucher};
use crate::validation::validate_period;

// =============================================================================
// Report Types
// =============================================================================

/// Outstanding debt of one client within the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientDebt {
    pub client_id: String,
    pub client_name: String,
    pub voucher_count: usize,
    /// Face value of the included vouchers.
    pub total_amount: Money,
    pub remaining_amount: Money,
    #[ts(as = "String")]
    pub oldest_due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportSummary {
    pub total_clients: usize,
    pub total_vouchers: usize,
    /// Sum of remaining amounts.
    pub total_debt: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CollectionReport {
    #[ts(as = "String")]
    pub period_start: NaiveDate,
    #[ts(as = "String")]
    pub period_end: NaiveDate,
    pub clients: Vec<ClientDebt>,
    pub summary: ReportSummary,
}

// =============================================================================
// Builder
// =============================================================================

pub struct CollectionReportBuilder;

impl CollectionReportBuilder {
    /// Builds the report from Active vouchers created within
    /// `[period_start, period_end]` (UTC calendar days, both inclusive).
    ///
    /// Every client owning an included voucher must appear in `clients`.
    pub fn build_report(
        vouchers: &[Voucher],
        clients: &[Client],
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> CoreResult<CollectionReport> {
        validate_period(period_start, period_end)?;

        let names: BTreeMap<&str, &str> = clients
            .iter()
            .map(|client| (client.id.as_str(), client.name.as_str()))
            .collect();

        let mut by_client: BTreeMap<&str, ClientDebt> = BTreeMap::new();

        for voucher in vouchers.iter().filter(|v| {
            let created = v.created_at.date_naive();
            v.is_active() && created >= period_start && created <= period_end
        }) {
            let client_id = voucher.client_id.as_str();
            let name = names
                .get(client_id)
                .ok_or_else(|| CoreError::unknown("client", client_id))?;

            let entry = by_client.entry(client_id).or_insert_with(|| ClientDebt {
                client_id: client_id.to_string(),
                client_name: name.to_string(),
                voucher_count: 0,
                total_amount: Money::zero(),
                remaining_amount: Money::zero(),
                oldest_due_date: voucher.due_date,
            });

            entry.voucher_count += 1;
            entry.total_amount += voucher.amount();
            entry.remaining_amount += voucher.remaining();
            entry.oldest_due_date = entry.oldest_due_date.min(voucher.due_date);
        }

        let mut debts: Vec<ClientDebt> = by_client.into_values().collect();
        // BTreeMap already yields client id order; the stable sort keeps it for ties
        debts.sort_by(|a, b| b.remaining_amount.cmp(&a.remaining_amount));

        let summary = ReportSummary {
            total_clients: debts.len(),
            total_vouchers: debts.iter().map(|debt| debt.voucher_count).sum(),
            total_debt: debts.iter().map(|debt| debt.remaining_amount).sum(),
        };

        Ok(CollectionReport {
            period_start,
            period_end,
            clients: debts,
            summary,
        })
    }
}

/// First and last day of a calendar month.
///
/// ```rust
/// use agua_core::report::monthly_period;
/// use chrono::NaiveDate;
///
/// let (start, end) = monthly_period(2028, 2).unwrap();
/// assert_eq!(start, NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
/// assert_eq!(end, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
/// ```
pub fn monthly_period(year: i32, month: u32) -> CoreResult<(NaiveDate, NaiveDate)> {
    let invalid = || ValidationError::InvalidFormat {
        field: "period".to_string(),
        reason: format!("{}-{:02} is not a calendar month", year, month),
    };

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;

    debug_assert_eq!(end.month(), month);

    Ok((start, end))
}

// =============================================================================
// Unit Tests
// =============================================================================
