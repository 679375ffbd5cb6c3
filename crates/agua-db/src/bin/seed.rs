//! # Seed Data Generator
//!
//! Populates the database with reference data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by AGUA_DATABASE_PATH (default ./agua.db)
//! cargo run -p agua-db --bin seed
//!
//! # Specify database path
//! cargo run -p agua-db --bin seed -- --db ./data/agua.db
//!
//! # Also place a few demo orders (credit + subscription)
//! cargo run -p agua-db --bin seed -- --demo
//! ```
//!
//! ## Generated Data
//! - Districts with their base delivery fee
//! - Water products, most with wholesale tiers
//! - Subscription plans with bonus bottles
//! - Clients spread over the districts

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agua_core::{Money, PaymentMethod};
use agua_db::{
    CreditLedger, Database, EngineConfig, NewProduct, OrderLineInput, OrderService, PlaceOrder,
    SubscriptionTracker,
};

/// (name, base delivery fee in cents)
const DISTRICTS: &[(&str, i64)] = &[
    ("Centro", 300),
    ("Norte", 500),
    ("Sur", 500),
    ("Los Olivos", 700),
    ("Chorrillos", 900),
];

/// (name, base price, tiers as (min quantity, unit price))
const PRODUCTS: &[(&str, i64, [Option<(i64, i64)>; 3])] = &[
    (
        "Bidón 20L",
        1000,
        [Some((10, 900)), Some((50, 800)), Some((100, 700))],
    ),
    ("Bidón 10L", 600, [Some((10, 550)), Some((50, 500)), None]),
    ("Botella 2.5L", 250, [Some((12, 220)), None, Some((120, 180))]),
    ("Botella 625ml", 120, [Some((24, 100)), None, None]),
    ("Recarga 20L", 700, [Some((10, 650)), Some((50, 600)), None]),
    ("Dispensador de mesa", 4500, [None, None, None]),
];

/// (name, bottles, bonus bottles, monthly price in cents, max bottles per day)
const PLANS: &[(&str, i64, i64, i64, i64)] = &[
    ("Hogar 10", 10, 1, 9_000, 3),
    ("Familia 20", 20, 2, 17_000, 4),
    ("Oficina 50", 50, 10, 40_000, 10),
];

const CLIENTS: &[(&str, Option<&str>)] = &[
    ("Rosa Quispe", Some("+51 987 654 321")),
    ("Bodega San Martín", Some("+51 912 345 678")),
    ("Colegio Los Andes", None),
    ("Miguel Torres", Some("+51 955 111 222")),
    ("Clínica Santa Ana", Some("+51 944 333 444")),
    ("Panadería El Trigo", None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = EngineConfig::from_env()?;
    let mut demo = false;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--demo" => demo = true,
            "--help" | "-h" => {
                println!("Agua Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $AGUA_DATABASE_PATH or ./agua.db)");
                println!("      --demo         Also place demo orders");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(database = %config.database_path.display(), "Seeding database");

    let db = Database::new(config.db_config()).await?;
    let catalog = db.catalog();

    let existing = catalog.count_products().await?;
    if existing > 0 {
        warn!(
            products = existing,
            "Database already seeded, skipping. Delete the database file to regenerate."
        );
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut districts = Vec::with_capacity(DISTRICTS.len());
    for (name, fee) in DISTRICTS {
        districts.push(catalog.create_district(name, Money::from_cents(*fee)).await?);
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (name, price, tiers) in PRODUCTS {
        let product = catalog
            .create_product(NewProduct {
                name: name.to_string(),
                price: Money::from_cents(*price),
                tiers: tiers.map(|tier| tier.map(|(min, cents)| (min, Money::from_cents(cents)))),
            })
            .await?;
        products.push(product);
    }

    let mut plans = Vec::with_capacity(PLANS.len());
    for (name, bottles, bonus, monthly, max_daily) in PLANS {
        plans.push(
            catalog
                .create_plan(name, *bottles, *bonus, Money::from_cents(*monthly), *max_daily)
                .await?,
        );
    }

    let mut clients = Vec::with_capacity(CLIENTS.len());
    for (idx, (name, phone)) in CLIENTS.iter().enumerate() {
        let district = &districts[idx % districts.len()];
        clients.push(
            catalog
                .create_client(name, *phone, Some(district.id.as_str()))
                .await?,
        );
    }

    info!(
        districts = districts.len(),
        products = products.len(),
        plans = plans.len(),
        clients = clients.len(),
        elapsed = ?start.elapsed(),
        "Reference data created"
    );

    if demo {
        let orders = OrderService::new(db.clone(), &config);
        let subscriptions = SubscriptionTracker::new(db.clone());
        let ledger = CreditLedger::new(db.clone());

        // A wholesale credit order and a small cash order
        for (client, quantity, payment_method) in [
            (&clients[1], 60, PaymentMethod::Credit),
            (&clients[0], 2, PaymentMethod::CashOnDelivery),
        ] {
            let district_id = client.district_id.clone().unwrap_or_default();
            orders
                .place_order(PlaceOrder {
                    client_id: client.id.clone(),
                    district_id,
                    lines: vec![OrderLineInput {
                        product_id: products[0].id.clone(),
                        quantity,
                    }],
                    payment_method,
                })
                .await?;
        }

        let subscriber = &clients[3];
        subscriptions
            .activate(&subscriber.id, &plans[1].id, Utc::now().date_naive())
            .await?;
        orders
            .place_order(PlaceOrder {
                client_id: subscriber.id.clone(),
                district_id: subscriber.district_id.clone().unwrap_or_default(),
                lines: vec![OrderLineInput {
                    product_id: products[0].id.clone(),
                    quantity: 2,
                }],
                payment_method: PaymentMethod::Subscription,
            })
            .await?;

        let balance = ledger.get_client_balance(&clients[1].id).await?;
        info!(
            client = %clients[1].name,
            debt = %balance.total_remaining,
            "Demo orders placed"
        );
    }

    db.close().await;
    info!(elapsed = ?start.elapsed(), "Seed complete");

    Ok(())
}
