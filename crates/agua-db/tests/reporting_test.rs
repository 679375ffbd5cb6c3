//! Integration tests for collection reports and monthly reminders.

mod common;

use std::future::Future;
use std::sync::Mutex;

use agua_core::{ClientDebt, CoreError, Money};
use agua_db::{CollectionService, CreditLedger, DbError, ReminderError, ReminderSender};
use chrono::{Datelike, Duration, Utc};
use common::setup;

/// Records every reminder; fails for one client.
struct RecordingSender {
    fail_for: String,
    sent: Mutex<Vec<String>>,
}

impl ReminderSender for RecordingSender {
    fn send(&self, debt: &ClientDebt) -> impl Future<Output = Result<(), ReminderError>> + Send {
        let result = if debt.client_id == self.fail_for {
            Err(ReminderError::Delivery("gateway timeout".into()))
        } else {
            self.sent.lock().unwrap().push(debt.client_id.clone());
            Ok(())
        };
        async move { result }
    }
}

#[tokio::test]
async fn report_groups_active_debt_by_client() {
    let fx = setup().await;
    let other = fx.another_client("Bodega San Martín").await;
    let ledger = CreditLedger::new(fx.db.clone());
    let reports = CollectionService::new(fx.db.clone());

    let today = Utc::now().date_naive();
    let soon = today + Duration::days(10);
    let later = today + Duration::days(30);

    ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), later)
        .await
        .unwrap();
    ledger
        .create_voucher(&fx.client.id, Money::from_cents(2_000), soon)
        .await
        .unwrap();
    ledger
        .create_voucher(&other.id, Money::from_cents(9_000), later)
        .await
        .unwrap();
    // Fully paid vouchers drop out of the report
    let paid = ledger
        .create_voucher(&other.id, Money::from_cents(1_000), soon)
        .await
        .unwrap();
    ledger.pay_voucher(&paid.id, Money::from_cents(1_000)).await.unwrap();
    // Partly paid vouchers count with what is left
    ledger
        .allocate_partial(&fx.client.id, Money::from_cents(500))
        .await
        .unwrap();

    let report = reports.build_report(today, today).await.unwrap();

    assert_eq!(report.clients.len(), 2);
    assert_eq!(report.clients[0].client_id, other.id);
    assert_eq!(report.clients[0].remaining_amount.cents(), 9_000);
    assert_eq!(report.clients[0].voucher_count, 1);

    let rosa = &report.clients[1];
    assert_eq!(rosa.client_name, "Rosa Quispe");
    assert_eq!(rosa.voucher_count, 2);
    assert_eq!(rosa.total_amount.cents(), 5_000);
    assert_eq!(rosa.remaining_amount.cents(), 4_500);
    assert_eq!(rosa.oldest_due_date, soon);

    assert_eq!(report.summary.total_clients, 2);
    assert_eq!(report.summary.total_vouchers, 3);
    assert_eq!(report.summary.total_debt.cents(), 13_500);
}

#[tokio::test]
async fn report_excludes_vouchers_outside_period() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());
    let reports = CollectionService::new(fx.db.clone());

    let today = Utc::now().date_naive();
    ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), today)
        .await
        .unwrap();

    let yesterday = today - Duration::days(1);
    let report = reports.build_report(yesterday, yesterday).await.unwrap();
    assert!(report.clients.is_empty());
    assert!(report.summary.total_debt.is_zero());

    let err = reports.build_report(today, yesterday).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
}

#[tokio::test]
async fn reminders_count_failures_without_stopping() {
    let fx = setup().await;
    let other = fx.another_client("Colegio Los Andes").await;
    let ledger = CreditLedger::new(fx.db.clone());
    let reports = CollectionService::new(fx.db.clone());

    let due = Utc::now().date_naive() + Duration::days(30);
    ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), due)
        .await
        .unwrap();
    ledger
        .create_voucher(&other.id, Money::from_cents(8_000), due)
        .await
        .unwrap();

    let sender = RecordingSender {
        fail_for: other.id.clone(),
        sent: Mutex::new(Vec::new()),
    };

    let today = Utc::now().date_naive();
    let outcome = reports
        .send_monthly_reminders(&sender, today.year(), today.month())
        .await
        .unwrap();

    assert_eq!(outcome.sent, 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(*sender.sent.lock().unwrap(), vec![fx.client.id.clone()]);
}

#[tokio::test]
async fn monthly_report_rejects_invalid_month() {
    let fx = setup().await;
    let reports = CollectionService::new(fx.db.clone());

    let err = reports.monthly_report(2026, 13).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
}
