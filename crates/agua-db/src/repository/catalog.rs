//! # Catalog Repository
//!
//! Reference data the engine prices and bills against: products with their
//! wholesale tiers, delivery districts, clients and subscription plans.
//!
//! ## Read Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CatalogRepository (pool)           fetch_* (any executor)              │
//! │  ─────────────────────────          ──────────────────────              │
//! │  seed, tests, reporting             order placement, activation         │
//! │       │                                  │                              │
//! │       └──────────────┬───────────────────┘                              │
//! │                      ▼                                                  │
//! │          same SELECT, same FromRow mapping                              │
//! │                                                                         │
//! │  Inside a transaction always use fetch_* with `&mut *tx`: an           │
//! │  in-memory pool has a single connection, already held by the tx.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reference data is created validated: product tiers go through
//! [`validate_wholesale_tiers`] and plans through [`new_plan`], so a
//! malformed configuration never reaches the table.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use agua_core::pricing::validate_wholesale_tiers;
use agua_core::subscription::new_plan;
use agua_core::validation::{validate_name, validate_price_cents};
use agua_core::{Client, District, Money, Product, SubscriptionPlan};

/// Input for a new product. Tier slots may be left empty, including gaps.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    /// `(min_quantity, unit_price)` per tier level 1..=3.
    pub tiers: [Option<(i64, Money)>; 3],
}

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Validates and inserts a product.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(Validation))` - Price outside `0..=MAX_PRICE_CENTS`
    /// * `Err(DbError::Domain(Configuration))` - Malformed tiers
    pub async fn create_product(&self, input: NewProduct) -> DbResult<Product> {
        validate_name("product name", &input.name)?;
        validate_price_cents("product price", input.price.cents())?;

        let now = Utc::now();
        let [t1, t2, t3] = input.tiers;
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            price_cents: input.price.cents(),
            tier1_min_quantity: t1.map(|(min, _)| min),
            tier1_price_cents: t1.map(|(_, price)| price.cents()),
            tier2_min_quantity: t2.map(|(min, _)| min),
            tier2_price_cents: t2.map(|(_, price)| price.cents()),
            tier3_min_quantity: t3.map(|(min, _)| min),
            tier3_price_cents: t3.map(|(_, price)| price.cents()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        validate_wholesale_tiers(&product)?;
        self.insert_product(&product).await?;

        Ok(product)
    }

    /// Inserts a product row as-is.
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents,
                tier1_min_quantity, tier1_price_cents,
                tier2_min_quantity, tier2_price_cents,
                tier3_min_quantity, tier3_price_cents,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5,
                ?6, ?7,
                ?8, ?9,
                ?10, ?11, ?12
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.tier1_min_quantity)
        .bind(product.tier1_price_cents)
        .bind(product.tier2_min_quantity)
        .bind(product.tier2_price_cents)
        .bind(product.tier3_min_quantity)
        .bind(product.tier3_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Counts active products (for diagnostics).
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Districts
    // =========================================================================

    /// Validates and inserts a district.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Name already used
    pub async fn create_district(&self, name: &str, base_delivery_fee: Money) -> DbResult<District> {
        validate_name("district name", name)?;
        validate_price_cents("base delivery fee", base_delivery_fee.cents())?;

        let district = District {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            base_delivery_fee_cents: base_delivery_fee.cents(),
            created_at: Utc::now(),
        };

        debug!(id = %district.id, name = %district.name, "Inserting district");

        sqlx::query(
            r#"
            INSERT INTO districts (id, name, base_delivery_fee_cents, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&district.id)
        .bind(&district.name)
        .bind(district.base_delivery_fee_cents)
        .bind(district.created_at)
        .execute(&self.pool)
        .await?;

        Ok(district)
    }

    pub async fn get_district(&self, id: &str) -> DbResult<Option<District>> {
        fetch_district(&self.pool, id).await
    }

    pub async fn list_districts(&self) -> DbResult<Vec<District>> {
        let districts = sqlx::query_as::<_, District>(
            r#"
            SELECT id, name, base_delivery_fee_cents, created_at
            FROM districts
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(districts)
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// Validates and inserts a client.
    pub async fn create_client(
        &self,
        name: &str,
        phone: Option<&str>,
        district_id: Option<&str>,
    ) -> DbResult<Client> {
        validate_name("client name", name)?;

        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone: phone.map(str::to_string),
            district_id: district_id.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (id, name, phone, district_id, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.district_id)
        .bind(client.is_active)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn get_client(&self, id: &str) -> DbResult<Option<Client>> {
        fetch_client(&self.pool, id).await
    }

    /// All clients, active or not (reports still name former clients).
    pub async fn list_clients(&self) -> DbResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, name, phone, district_id, is_active, created_at
            FROM clients
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    // =========================================================================
    // Subscription Plans
    // =========================================================================

    /// Builds a plan (bonus percentage derived) and inserts it.
    pub async fn create_plan(
        &self,
        name: &str,
        total_bottles: i64,
        bonus_bottles: i64,
        monthly_price: Money,
        max_daily_delivery: i64,
    ) -> DbResult<SubscriptionPlan> {
        let plan = new_plan(
            name,
            total_bottles,
            bonus_bottles,
            monthly_price,
            max_daily_delivery,
            Utc::now(),
        )?;
        self.insert_plan(&plan).await?;

        Ok(plan)
    }

    /// Inserts a plan row as-is.
    pub async fn insert_plan(&self, plan: &SubscriptionPlan) -> DbResult<()> {
        debug!(id = %plan.id, name = %plan.name, "Inserting subscription plan");

        sqlx::query(
            r#"
            INSERT INTO subscription_plans (
                id, name, total_bottles, bonus_bottles, bonus_percentage_bps,
                monthly_price_cents, price_per_bottle_cents, max_daily_delivery,
                is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.name)
        .bind(plan.total_bottles)
        .bind(plan.bonus_bottles)
        .bind(plan.bonus_percentage_bps)
        .bind(plan.monthly_price_cents)
        .bind(plan.price_per_bottle_cents)
        .bind(plan.max_daily_delivery)
        .bind(plan.is_active)
        .bind(plan.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_plan(&self, id: &str) -> DbResult<Option<SubscriptionPlan>> {
        fetch_plan(&self.pool, id).await
    }

    /// Activates or retires a plan. Running subscriptions are unaffected.
    pub async fn set_plan_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        debug!(id = %id, is_active = is_active, "Updating plan availability");

        let result = sqlx::query("UPDATE subscription_plans SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SubscriptionPlan", id));
        }

        Ok(())
    }
}

// =============================================================================
// Executor-Level Lookups
// =============================================================================
// Shared by the pool-backed methods above and by services running inside a
// transaction (`&mut *tx`).

pub async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT
            id, name, price_cents,
            tier1_min_quantity, tier1_price_cents,
            tier2_min_quantity, tier2_price_cents,
            tier3_min_quantity, tier3_price_cents,
            is_active, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

pub async fn fetch_district<'e, E>(executor: E, id: &str) -> DbResult<Option<District>>
where
    E: SqliteExecutor<'e>,
{
    let district = sqlx::query_as::<_, District>(
        "SELECT id, name, base_delivery_fee_cents, created_at FROM districts WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(district)
}

pub async fn fetch_client<'e, E>(executor: E, id: &str) -> DbResult<Option<Client>>
where
    E: SqliteExecutor<'e>,
{
    let client = sqlx::query_as::<_, Client>(
        "SELECT id, name, phone, district_id, is_active, created_at FROM clients WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(client)
}

pub async fn fetch_plan<'e, E>(executor: E, id: &str) -> DbResult<Option<SubscriptionPlan>>
where
    E: SqliteExecutor<'e>,
{
    let plan = sqlx::query_as::<_, SubscriptionPlan>(
        r#"
        SELECT
            id, name, total_bottles, bonus_bottles, bonus_percentage_bps,
            monthly_price_cents, price_per_bottle_cents, max_daily_delivery,
            is_active, created_at
        FROM subscription_plans
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(plan)
}
