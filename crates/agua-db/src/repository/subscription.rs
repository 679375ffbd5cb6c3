//! # Subscription Repository
//!
//! Database operations for client subscriptions.
//!
//! Progress updates are conditional on the stored `bottles_delivered`
//! value the change was computed from. A stale writer matches no row and
//! gets an error instead of overwriting a newer count.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use agua_core::Subscription;

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, client_id, plan_id, total_bottles_with_bonus, bottles_delivered,
    status, start_date, next_payment_date, created_at, updated_at
"#;

/// Repository for subscription database operations.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    /// Creates a new SubscriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SubscriptionRepository { pool }
    }

    /// Gets a subscription by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Subscription>> {
        fetch_subscription(&self.pool, id).await
    }

    /// Oldest Active subscription of a client.
    pub async fn active_for_client(&self, client_id: &str) -> DbResult<Option<Subscription>> {
        fetch_active_for_client(&self.pool, client_id).await
    }

    /// Every subscription of a client, oldest first.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {} FROM subscriptions WHERE client_id = ?1 ORDER BY created_at, rowid",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }
}

// =============================================================================
// Executor-Level Operations
// =============================================================================

pub async fn insert_subscription<'e, E>(executor: E, subscription: &Subscription) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        id = %subscription.id,
        client_id = %subscription.client_id,
        plan_id = %subscription.plan_id,
        bottles = subscription.total_bottles_with_bonus,
        "Inserting subscription"
    );

    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, client_id, plan_id, total_bottles_with_bonus, bottles_delivered,
            status, start_date, next_payment_date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&subscription.id)
    .bind(&subscription.client_id)
    .bind(&subscription.plan_id)
    .bind(subscription.total_bottles_with_bonus)
    .bind(subscription.bottles_delivered)
    .bind(subscription.status)
    .bind(subscription.start_date)
    .bind(subscription.next_payment_date)
    .bind(subscription.created_at)
    .bind(subscription.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn fetch_subscription<'e, E>(executor: E, id: &str) -> DbResult<Option<Subscription>>
where
    E: SqliteExecutor<'e>,
{
    let subscription = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {} FROM subscriptions WHERE id = ?1",
        SUBSCRIPTION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(subscription)
}

pub async fn fetch_active_for_client<'e, E>(
    executor: E,
    client_id: &str,
) -> DbResult<Option<Subscription>>
where
    E: SqliteExecutor<'e>,
{
    let subscription = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        SELECT {} FROM subscriptions
        WHERE client_id = ?1 AND status = 'active'
        ORDER BY created_at, rowid
        LIMIT 1
        "#,
        SUBSCRIPTION_COLUMNS
    ))
    .bind(client_id)
    .fetch_optional(executor)
    .await?;

    Ok(subscription)
}

/// Persists progress and status of a subscription.
///
/// `previously_delivered` is the count the change was computed from.
pub async fn update_subscription<'e, E>(
    executor: E,
    subscription: &Subscription,
    previously_delivered: i64,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        id = %subscription.id,
        delivered = subscription.bottles_delivered,
        status = subscription.status.as_str(),
        "Updating subscription"
    );

    let result = sqlx::query(
        r#"
        UPDATE subscriptions SET
            bottles_delivered = ?2,
            status = ?3,
            updated_at = ?4
        WHERE id = ?1 AND bottles_delivered = ?5
        "#,
    )
    .bind(&subscription.id)
    .bind(subscription.bottles_delivered)
    .bind(subscription.status)
    .bind(subscription.updated_at)
    .bind(previously_delivered)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::TransactionFailed(format!(
            "subscription {} changed concurrently",
            subscription.id
        )));
    }

    Ok(())
}
