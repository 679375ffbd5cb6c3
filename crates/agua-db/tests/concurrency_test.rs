//! Integration tests for concurrent writers on a file-backed, multi-connection pool.

use std::time::Duration;

use agua_core::{Money, PaymentMethod, VoucherStatus};
use agua_db::{CreditLedger, Database, DbConfig, OrderLineInput, OrderService, PlaceOrder};
use agua_db::{EngineConfig, NewProduct};
use chrono::Utc;
use tempfile::TempDir;

const CLIENTS: usize = 16;
const ROUNDS: usize = 10;

/// Helper: a migrated database file in a fresh temp dir. Keep the dir alive.
async fn file_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("agua.db"))
        .max_connections(8)
        .busy_timeout(Duration::from_secs(30));

    let db = Database::new(config).await.unwrap();
    (dir, db)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_for_different_clients_all_succeed() {
    let (_dir, db) = file_database().await;
    let catalog = db.catalog();

    let district = catalog
        .create_district("Centro", Money::from_cents(500))
        .await
        .unwrap();
    let mut client_ids = Vec::with_capacity(CLIENTS);
    for n in 0..CLIENTS {
        let client = catalog
            .create_client(&format!("Cliente {n}"), None, Some(district.id.as_str()))
            .await
            .unwrap();
        client_ids.push(client.id);
    }

    let ledger = CreditLedger::new(db.clone());
    let due = Utc::now().date_naive();

    let handles: Vec<_> = client_ids
        .iter()
        .cloned()
        .map(|client_id| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                let mut failures = Vec::new();
                for _ in 0..ROUNDS {
                    if let Err(err) = ledger
                        .create_voucher(&client_id, Money::from_cents(1_000), due)
                        .await
                    {
                        failures.push(err.to_string());
                    }
                    if let Err(err) = ledger
                        .allocate_payment(&client_id, Money::from_cents(1_000))
                        .await
                    {
                        failures.push(err.to_string());
                    }
                }
                failures
            })
        })
        .collect();

    let mut failures = Vec::new();
    for handle in handles {
        failures.extend(handle.await.unwrap());
    }
    assert!(failures.is_empty(), "{} failed: {:?}", failures.len(), failures.first());

    for client_id in &client_ids {
        let balance = ledger.get_client_balance(client_id).await.unwrap();
        assert_eq!(balance.total_vouchers, ROUNDS);
        assert!(balance.total_remaining.is_zero());
    }
    assert!(db.locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_credit_orders_each_open_one_voucher() {
    let (_dir, db) = file_database().await;
    let catalog = db.catalog();

    let district = catalog
        .create_district("Centro", Money::from_cents(500))
        .await
        .unwrap();
    let product = catalog
        .create_product(NewProduct {
            name: "Bidón 20L".into(),
            price: Money::from_cents(1000),
            tiers: [None, None, None],
        })
        .await
        .unwrap();
    let client = catalog
        .create_client("Rosa Quispe", None, Some(district.id.as_str()))
        .await
        .unwrap();

    let orders = OrderService::new(db.clone(), &EngineConfig::default());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let orders = orders.clone();
            let request = PlaceOrder {
                client_id: client.id.clone(),
                district_id: district.id.clone(),
                lines: vec![OrderLineInput {
                    product_id: product.id.clone(),
                    quantity: 2,
                }],
                payment_method: PaymentMethod::Credit,
            };
            tokio::spawn(async move { orders.place_order(request).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let vouchers = db.vouchers().list_for_client(&client.id).await.unwrap();
    assert_eq!(vouchers.len(), 8);
    assert!(vouchers
        .iter()
        .all(|v| v.status == VoucherStatus::Active && v.amount_cents == 2_500));
}
