//! Integration tests for the credit ledger (vouchers and payment allocation).

mod common;

use agua_core::{CoreError, Money, Voucher, VoucherStatus};
use agua_db::{CreditLedger, DbError};
use chrono::{Duration, NaiveDate, Utc};
use common::setup;

fn due() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(30)
}

fn assert_voucher_invariants(voucher: &Voucher) {
    assert_eq!(voucher.used() + voucher.remaining(), voucher.amount());
    assert!(!voucher.remaining().is_negative());
    assert_eq!(voucher.status == VoucherStatus::Paid, voucher.remaining().is_zero());
}

#[tokio::test]
async fn full_payment_settles_every_voucher_oldest_first() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());

    let first = ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), due())
        .await
        .unwrap();
    let second = ledger
        .create_voucher(&fx.client.id, Money::from_cents(2_000), due())
        .await
        .unwrap();

    let allocation = ledger
        .allocate_payment(&fx.client.id, Money::from_cents(5_000))
        .await
        .unwrap();

    assert_eq!(allocation.allocations.len(), 2);
    assert_eq!(allocation.allocations[0].voucher_id, first.id);
    assert_eq!(allocation.allocations[0].applied.cents(), 3_000);
    assert_eq!(allocation.allocations[1].voucher_id, second.id);
    assert_eq!(allocation.total_applied.cents(), 5_000);
    assert!(allocation.change_due.is_zero());
    assert!(allocation.remaining_debt.is_zero());

    for voucher in ledger.list_client_vouchers(&fx.client.id).await.unwrap() {
        assert_eq!(voucher.status, VoucherStatus::Paid);
        assert!(voucher.paid_at.is_some());
        assert_voucher_invariants(&voucher);
    }

    let balance = ledger.get_client_balance(&fx.client.id).await.unwrap();
    assert_eq!(balance.total_vouchers, 2);
    assert_eq!(balance.active_vouchers, 0);
    assert!(balance.total_remaining.is_zero());
}

#[tokio::test]
async fn insufficient_payment_changes_nothing() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());

    let voucher = ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), due())
        .await
        .unwrap();

    let err = ledger
        .allocate_payment(&fx.client.id, Money::from_cents(2_000))
        .await
        .unwrap_err();
    match err {
        DbError::Domain(CoreError::InsufficientPayment {
            outstanding,
            offered,
            ..
        }) => {
            assert_eq!(outstanding.cents(), 3_000);
            assert_eq!(offered.cents(), 2_000);
        }
        other => panic!("expected InsufficientPayment, got {other:?}"),
    }

    let stored = fx.db.vouchers().get_by_id(&voucher.id).await.unwrap().unwrap();
    assert_eq!(stored.used_amount_cents, 0);
    assert_eq!(stored.remaining().cents(), 3_000);
    assert_eq!(stored.status, VoucherStatus::Active);
}

#[tokio::test]
async fn overpayment_returns_change() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());

    ledger
        .create_voucher(&fx.client.id, Money::from_cents(1_250), due())
        .await
        .unwrap();

    let allocation = ledger
        .allocate_payment(&fx.client.id, Money::from_cents(2_000))
        .await
        .unwrap();

    assert_eq!(allocation.total_applied.cents(), 1_250);
    assert_eq!(allocation.change_due.cents(), 750);
}

#[tokio::test]
async fn partial_allocation_follows_fifo() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());

    let older = ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), due())
        .await
        .unwrap();
    let newer = ledger
        .create_voucher(&fx.client.id, Money::from_cents(2_000), due())
        .await
        .unwrap();

    let allocation = ledger
        .allocate_partial(&fx.client.id, Money::from_cents(4_000))
        .await
        .unwrap();
    assert_eq!(allocation.remaining_debt.cents(), 1_000);

    let older = fx.db.vouchers().get_by_id(&older.id).await.unwrap().unwrap();
    let newer = fx.db.vouchers().get_by_id(&newer.id).await.unwrap().unwrap();
    assert_eq!(older.status, VoucherStatus::Paid);
    assert_eq!(newer.used_amount_cents, 1_000);
    assert_eq!(newer.status, VoucherStatus::Active);
    assert_voucher_invariants(&older);
    assert_voucher_invariants(&newer);
}

#[tokio::test]
async fn pay_voucher_allows_partial_then_rejects_paid() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());

    let voucher = ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), due())
        .await
        .unwrap();

    let first = ledger
        .pay_voucher(&voucher.id, Money::from_cents(1_000))
        .await
        .unwrap();
    assert_eq!(first.applied.cents(), 1_000);
    assert_eq!(first.voucher.remaining().cents(), 2_000);
    assert_eq!(first.remaining_debt.cents(), 2_000);

    let second = ledger
        .pay_voucher(&voucher.id, Money::from_cents(2_500))
        .await
        .unwrap();
    assert_eq!(second.applied.cents(), 2_000);
    assert_eq!(second.change_due.cents(), 500);
    assert_eq!(second.voucher.status, VoucherStatus::Paid);

    let err = ledger
        .pay_voucher(&voucher.id, Money::from_cents(100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InvalidStateTransition { .. })
    ));
}

#[tokio::test]
async fn rejects_unknown_client_and_non_positive_amounts() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());

    let stranger = uuid::Uuid::new_v4().to_string();
    let err = ledger
        .create_voucher(&stranger, Money::from_cents(1_000), due())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::UnknownReference { .. })));

    let err = ledger
        .allocate_payment(&stranger, Money::from_cents(1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::UnknownReference { .. })));

    // Rejected lookups leave no per-client lock behind
    assert!(fx.db.locks().is_empty());

    let err = ledger
        .create_voucher(&fx.client.id, Money::zero(), due())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    let err = ledger
        .allocate_payment(&fx.client.id, Money::from_cents(-100))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
}

#[tokio::test]
async fn balance_is_idempotent_and_per_client() {
    let fx = setup().await;
    let other = fx.another_client("Bodega San Martín").await;
    let ledger = CreditLedger::new(fx.db.clone());

    ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), due())
        .await
        .unwrap();
    ledger
        .create_voucher(&other.id, Money::from_cents(9_900), due())
        .await
        .unwrap();
    ledger
        .allocate_partial(&fx.client.id, Money::from_cents(500))
        .await
        .unwrap();

    let first = ledger.get_client_balance(&fx.client.id).await.unwrap();
    let second = ledger.get_client_balance(&fx.client.id).await.unwrap();
    assert_eq!(first, second);

    assert_eq!(first.total_amount.cents(), 3_000);
    assert_eq!(first.total_used.cents(), 500);
    assert_eq!(first.total_remaining.cents(), 2_500);
    assert!(first.has_debt());
}

#[tokio::test]
async fn concurrent_payments_never_double_allocate() {
    let fx = setup().await;
    let ledger = CreditLedger::new(fx.db.clone());

    ledger
        .create_voucher(&fx.client.id, Money::from_cents(3_000), due())
        .await
        .unwrap();
    ledger
        .create_voucher(&fx.client.id, Money::from_cents(2_000), due())
        .await
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let ledger = ledger.clone();
            let client_id = fx.client.id.clone();
            tokio::spawn(async move {
                ledger
                    .allocate_payment(&client_id, Money::from_cents(5_000))
                    .await
            })
        })
        .collect();

    let mut applied = Money::zero();
    let mut change = Money::zero();
    for handle in handles {
        let allocation = handle.await.unwrap().unwrap();
        applied += allocation.total_applied;
        change += allocation.change_due;
    }

    // One payment settled the debt, the other found nothing left to pay
    assert_eq!(applied.cents(), 5_000);
    assert_eq!(change.cents(), 5_000);

    let balance = ledger.get_client_balance(&fx.client.id).await.unwrap();
    assert_eq!(balance.total_used.cents(), 5_000);
    assert!(balance.total_remaining.is_zero());
    for voucher in ledger.list_client_vouchers(&fx.client.id).await.unwrap() {
        assert_voucher_invariants(&voucher);
    }
}
