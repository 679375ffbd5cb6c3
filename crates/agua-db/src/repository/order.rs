//! # Order Repository
//!
//! Database operations for orders and order lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. PLACE (one transaction)                                            │
//! │     └── insert_order()  → Order { status: Pending, priced, frozen }    │
//! │     └── insert_line()   → OrderLine (unit price snapshot)              │
//! │     └── link_voucher()  → credit orders only                           │
//! │     └── link_subscription() → subscription orders only                 │
//! │                                                                         │
//! │  2. DISPATCH                                                           │
//! │     └── update_dispatch() → Assigned (driver) → InTransit → Delivered  │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL while Pending or Assigned                        │
//! │                                                                         │
//! │  Pricing columns are written once and never updated.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use agua_core::{Order, OrderLine, OrderStatus};

const ORDER_COLUMNS: &str = r#"
    id, client_id, district_id, subtotal_cents, delivery_fee_cents,
    delivery_discount_bps, delivery_fee_degraded, total_cents,
    payment_method, status, driver_id, voucher_id, subscription_id,
    created_at, updated_at
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        fetch_order(&self.pool, id).await
    }

    /// Gets all lines of an order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        fetch_lines(&self.pool, order_id).await
    }

    /// Orders of a client, newest first.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE client_id = ?1 ORDER BY created_at DESC, rowid DESC",
            ORDER_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

// =============================================================================
// Executor-Level Operations
// =============================================================================

pub async fn insert_order<'e, E>(executor: E, order: &Order) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        id = %order.id,
        client_id = %order.client_id,
        total = order.total_cents,
        payment_method = ?order.payment_method,
        "Inserting order"
    );

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, client_id, district_id, subtotal_cents, delivery_fee_cents,
            delivery_discount_bps, delivery_fee_degraded, total_cents,
            payment_method, status, driver_id, voucher_id, subscription_id,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8,
            ?9, ?10, ?11, ?12, ?13,
            ?14, ?15
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.client_id)
    .bind(&order.district_id)
    .bind(order.subtotal_cents)
    .bind(order.delivery_fee_cents)
    .bind(order.delivery_discount_bps)
    .bind(order.delivery_fee_degraded)
    .bind(order.total_cents)
    .bind(order.payment_method)
    .bind(order.status)
    .bind(&order.driver_id)
    .bind(&order.voucher_id)
    .bind(&order.subscription_id)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Inserts an order line.
///
/// ## Snapshot Pattern
/// The unit price resolved at placement is copied to the line, so later
/// catalog price changes never alter a placed order.
pub async fn insert_line<'e, E>(executor: E, line: &OrderLine) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(order_id = %line.order_id, product_id = %line.product_id, "Adding order line");

    sqlx::query(
        r#"
        INSERT INTO order_lines (
            id, order_id, product_id, quantity,
            unit_price_cents, line_total_cents, tier_level
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&line.id)
    .bind(&line.order_id)
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.line_total_cents)
    .bind(line.tier_level)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn fetch_order<'e, E>(executor: E, id: &str) -> DbResult<Option<Order>>
where
    E: SqliteExecutor<'e>,
{
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM orders WHERE id = ?1",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(order)
}

pub async fn fetch_lines<'e, E>(executor: E, order_id: &str) -> DbResult<Vec<OrderLine>>
where
    E: SqliteExecutor<'e>,
{
    let lines = sqlx::query_as::<_, OrderLine>(
        r#"
        SELECT
            id, order_id, product_id, quantity,
            unit_price_cents, line_total_cents, tier_level
        FROM order_lines
        WHERE order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(lines)
}

/// Links the voucher opened for a credit order.
pub async fn link_voucher<'e, E>(executor: E, order_id: &str, voucher_id: &str) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE orders SET voucher_id = ?2 WHERE id = ?1 AND voucher_id IS NULL")
        .bind(order_id)
        .bind(voucher_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order (without voucher)", order_id));
    }

    Ok(())
}

/// Links the subscription a subscription order was charged to.
pub async fn link_subscription<'e, E>(
    executor: E,
    order_id: &str,
    subscription_id: &str,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE orders SET subscription_id = ?2 WHERE id = ?1 AND subscription_id IS NULL",
    )
    .bind(order_id)
    .bind(subscription_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order (without subscription)", order_id));
    }

    Ok(())
}

/// Writes the dispatch state of an order (status and driver).
///
/// The update only applies while the stored status is still `expected`, so
/// two racing transitions cannot both succeed.
pub async fn update_dispatch<'e, E>(
    executor: E,
    order_id: &str,
    expected: OrderStatus,
    status: OrderStatus,
    driver_id: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %order_id, from = expected.as_str(), to = status.as_str(), "Updating order dispatch");

    let result = sqlx::query(
        r#"
        UPDATE orders SET
            status = ?3,
            driver_id = ?4,
            updated_at = ?5
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(order_id)
    .bind(expected)
    .bind(status)
    .bind(driver_id)
    .bind(now)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(
            format!("Order ({})", expected.as_str()),
            order_id,
        ));
    }

    Ok(())
}
