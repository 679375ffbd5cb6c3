//! Shared fixtures for the engine integration tests (in-memory SQLite).

#![allow(dead_code)]

use agua_core::{Client, District, Money, Product, SubscriptionPlan};
use agua_db::{Database, DbConfig, EngineConfig, NewProduct};

pub struct Fixture {
    pub db: Database,
    pub config: EngineConfig,
    /// Base delivery fee 5.00.
    pub district: District,
    /// Base 10.00, tier 1 from 10 units at 9.00, tier 2 from 50 units at 8.00.
    pub product: Product,
    pub client: Client,
}

/// Helper: spin up an in-memory DB (migrated) with one district, one tiered
/// product and one client.
pub async fn setup() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let catalog = db.catalog();

    let district = catalog
        .create_district("Centro", Money::from_cents(500))
        .await
        .unwrap();

    let product = catalog
        .create_product(NewProduct {
            name: "Bidón 20L".into(),
            price: Money::from_cents(1000),
            tiers: [
                Some((10, Money::from_cents(900))),
                Some((50, Money::from_cents(800))),
                None,
            ],
        })
        .await
        .unwrap();

    let client = catalog
        .create_client("Rosa Quispe", Some("+51 987 654 321"), Some(district.id.as_str()))
        .await
        .unwrap();

    Fixture {
        db,
        config: EngineConfig::default(),
        district,
        product,
        client,
    }
}

impl Fixture {
    pub async fn another_client(&self, name: &str) -> Client {
        self.db
            .catalog()
            .create_client(name, None, Some(self.district.id.as_str()))
            .await
            .unwrap()
    }

    /// 20 bottles + 2 bonus, up to 22 a day.
    pub async fn plan(&self) -> SubscriptionPlan {
        self.db
            .catalog()
            .create_plan("Familia 20", 20, 2, Money::from_cents(17_000), 22)
            .await
            .unwrap()
    }
}
