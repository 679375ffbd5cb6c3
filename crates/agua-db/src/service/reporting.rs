//! # Collection Reporting
//!
//! Builds collection reports from stored vouchers and sends the monthly
//! debt reminders.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  send_monthly_reminders(sender, 2026, 3)                                │
//! │                                                                         │
//! │  monthly_period ──► build_report ──► for each ClientDebt:              │
//! │                                         sender.send(debt)              │
//! │                                           Ok  → sent += 1              │
//! │                                           Err → warn!, failed += 1     │
//! │                                                                         │
//! │  One pass, no retries. A failed client does not stop the others.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::DbResult;
use crate::pool::Database;
use agua_core::report::monthly_period;
use agua_core::{ClientDebt, CollectionReport, CollectionReportBuilder};

/// Delivery failure reported by a [`ReminderSender`].
#[derive(Debug, Error)]
pub enum ReminderError {
    /// The client has no contact channel.
    #[error("no contact for client {0}")]
    NoContact(String),

    /// The notification channel rejected or dropped the message.
    #[error("reminder delivery failed: {0}")]
    Delivery(String),
}

/// Outbound channel for debt reminders (SMS, WhatsApp, email...).
pub trait ReminderSender {
    fn send(&self, debt: &ClientDebt) -> impl Future<Output = Result<(), ReminderError>> + Send;
}

/// Counts of one reminder run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderOutcome {
    pub sent: usize,
    pub failed: usize,
}

/// Read-only collection reporting.
#[derive(Debug, Clone)]
pub struct CollectionService {
    db: Database,
}

impl CollectionService {
    pub fn new(db: Database) -> Self {
        CollectionService { db }
    }

    /// Report of Active vouchers created within `[start, end]`.
    ///
    /// ## Returns
    /// * `Err(Domain(Validation))` - `start` after `end`
    /// * `Err(Domain(UnknownReference))` - A voucher's client is missing
    pub async fn build_report(&self, start: NaiveDate, end: NaiveDate) -> DbResult<CollectionReport> {
        let vouchers = self.db.vouchers().list_active().await?;
        let clients = self.db.catalog().list_clients().await?;

        let report = CollectionReportBuilder::build_report(&vouchers, &clients, start, end)?;

        info!(
            period_start = %start,
            period_end = %end,
            clients = report.summary.total_clients,
            vouchers = report.summary.total_vouchers,
            total_debt = %report.summary.total_debt,
            "Collection report built"
        );

        Ok(report)
    }

    /// Report for one calendar month.
    pub async fn monthly_report(&self, year: i32, month: u32) -> DbResult<CollectionReport> {
        let (start, end) = monthly_period(year, month)?;
        self.build_report(start, end).await
    }

    /// Sends one reminder per indebted client of the month.
    pub async fn send_monthly_reminders<S>(
        &self,
        sender: &S,
        year: i32,
        month: u32,
    ) -> DbResult<ReminderOutcome>
    where
        S: ReminderSender + Sync,
    {
        let report = self.monthly_report(year, month).await?;
        let mut outcome = ReminderOutcome::default();

        for debt in &report.clients {
            match sender.send(debt).await {
                Ok(()) => outcome.sent += 1,
                Err(err) => {
                    warn!(
                        client_id = %debt.client_id,
                        remaining = %debt.remaining_amount,
                        error = %err,
                        "Reminder not sent"
                    );
                    outcome.failed += 1;
                }
            }
        }

        info!(
            year = year,
            month = month,
            sent = outcome.sent,
            failed = outcome.failed,
            "Monthly reminders sent"
        );

        Ok(outcome)
    }
}
