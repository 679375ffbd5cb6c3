//! # Voucher Repository
//!
//! Database operations for vouchers (vales).
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_voucher          amount fixed here, never updated afterwards   │
//! │  update_voucher_balance  used_amount / status / paid_at only            │
//! │                          WHERE used_amount_cents <= new value           │
//! │                          (a balance never moves backwards)             │
//! │                                                                         │
//! │  Reads for FIFO come back ordered by created_at, then insertion order. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Balance changes are only written by the ledger services, inside a
//! transaction and while holding the client's lock.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use agua_core::Voucher;

const VOUCHER_COLUMNS: &str = r#"
    id, client_id, order_id, amount_cents, used_amount_cents,
    status, due_date, created_at, paid_at
"#;

/// Repository for voucher database operations.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    /// Creates a new VoucherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Gets a voucher by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Voucher>> {
        fetch_voucher(&self.pool, id).await
    }

    /// All vouchers of a client, oldest first.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Voucher>> {
        list_client_vouchers(&self.pool, client_id).await
    }

    /// Every Active voucher, oldest first (collection report input).
    pub async fn list_active(&self) -> DbResult<Vec<Voucher>> {
        debug!("Listing active vouchers");

        let vouchers = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {} FROM vouchers WHERE status = 'active' ORDER BY created_at, rowid",
            VOUCHER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    /// Number of Active vouchers (for diagnostics).
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vouchers WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Executor-Level Operations
// =============================================================================

pub async fn insert_voucher<'e, E>(executor: E, voucher: &Voucher) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        id = %voucher.id,
        client_id = %voucher.client_id,
        amount = voucher.amount_cents,
        "Inserting voucher"
    );

    sqlx::query(
        r#"
        INSERT INTO vouchers (
            id, client_id, order_id, amount_cents, used_amount_cents,
            status, due_date, created_at, paid_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&voucher.id)
    .bind(&voucher.client_id)
    .bind(&voucher.order_id)
    .bind(voucher.amount_cents)
    .bind(voucher.used_amount_cents)
    .bind(voucher.status)
    .bind(voucher.due_date)
    .bind(voucher.created_at)
    .bind(voucher.paid_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn fetch_voucher<'e, E>(executor: E, id: &str) -> DbResult<Option<Voucher>>
where
    E: SqliteExecutor<'e>,
{
    let voucher = sqlx::query_as::<_, Voucher>(&format!(
        "SELECT {} FROM vouchers WHERE id = ?1",
        VOUCHER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(voucher)
}

pub async fn list_client_vouchers<'e, E>(executor: E, client_id: &str) -> DbResult<Vec<Voucher>>
where
    E: SqliteExecutor<'e>,
{
    let vouchers = sqlx::query_as::<_, Voucher>(&format!(
        "SELECT {} FROM vouchers WHERE client_id = ?1 ORDER BY created_at, rowid",
        VOUCHER_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(executor)
    .await?;

    Ok(vouchers)
}

/// Active vouchers of one client, oldest first.
pub async fn list_active_for_client<'e, E>(executor: E, client_id: &str) -> DbResult<Vec<Voucher>>
where
    E: SqliteExecutor<'e>,
{
    let vouchers = sqlx::query_as::<_, Voucher>(&format!(
        "SELECT {} FROM vouchers WHERE client_id = ?1 AND status = 'active' ORDER BY created_at, rowid",
        VOUCHER_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(executor)
    .await?;

    Ok(vouchers)
}

/// Persists a voucher's new balance after a payment.
///
/// ## Returns
/// * `Err(DbError::NotFound)` - Unknown id, or the stored balance is already
///   past the new one
pub async fn update_voucher_balance<'e, E>(executor: E, voucher: &Voucher) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        id = %voucher.id,
        used = voucher.used_amount_cents,
        status = ?voucher.status,
        "Updating voucher balance"
    );

    let result = sqlx::query(
        r#"
        UPDATE vouchers SET
            used_amount_cents = ?2,
            status = ?3,
            paid_at = ?4
        WHERE id = ?1 AND used_amount_cents <= ?2
        "#,
    )
    .bind(&voucher.id)
    .bind(voucher.used_amount_cents)
    .bind(voucher.status)
    .bind(voucher.paid_at)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Voucher", &voucher.id));
    }

    Ok(())
}
