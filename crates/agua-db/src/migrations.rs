//! # Database Migrations
//!
//! Embedded SQL migrations for the engine schema.
//!
//! ## Schema
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  001_initial_schema.sql                                                 │
//! │                                                                         │
//! │  districts ◄── clients ◄──┬── orders ◄── order_lines ──► products       │
//! │                           │     │  ▲                                    │
//! │                           │     ▼  │                                    │
//! │                           ├── vouchers                                  │
//! │                           │                                             │
//! │  subscription_plans ◄─────┴── subscriptions ◄── orders.subscription_id │
//! │                                                                         │
//! │  CHECK constraints back the engine invariants:                          │
//! │  • 0 <= used_amount_cents <= amount_cents                               │
//! │  • status = 'paid' exactly when the voucher is fully used               │
//! │  • 0 <= bottles_delivered <= total_bottles_with_bonus                   │
//! │  • total_cents = subtotal_cents + delivery_fee_cents                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create `migrations/sqlite/NNN_description.sql` with the next number
//! 2. Never edit an applied migration; add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations, in filename order.
///
/// Idempotent: applied migrations are tracked in `_sqlx_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(
        embedded = MIGRATOR.migrations.len(),
        "Checking for pending migrations"
    );

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
