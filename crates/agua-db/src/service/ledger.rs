//! # Credit Ledger
//!
//! Vouchers (vales) and the payments applied to them.
//!
//! ## Payment Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate_payment(client, 50.00)                                        │
//! │                                                                         │
//! │  1. lock(client)             one writer per client                     │
//! │  2. BEGIN                                                              │
//! │  3. load Active vouchers     oldest first                              │
//! │        V1 30.00   V2 20.00                                             │
//! │  4. allocate (agua-core)     payment < outstanding → InsufficientPayment│
//! │        V1 +30.00 → Paid                                                │
//! │        V2 +20.00 → Paid                                                │
//! │  5. write touched vouchers                                             │
//! │  6. COMMIT                   any error before this rolls back all      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::catalog::fetch_client;
use crate::repository::voucher::{
    fetch_voucher, insert_voucher, list_active_for_client, list_client_vouchers,
    update_voucher_balance,
};
use agua_core::ledger::{allocate, apply_to_voucher, open_voucher};
use agua_core::validation::validate_positive_amount;
use agua_core::{ClientBalance, Money, PaymentAllocation, SettlementPolicy, Voucher};

/// Result of a payment against a single voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherPayment {
    pub voucher: Voucher,
    pub applied: Money,
    /// Part of the payment above the voucher's remaining balance.
    pub change_due: Money,
    /// Client debt across all Active vouchers after this payment.
    pub remaining_debt: Money,
}

/// Voucher creation, payment allocation and balances.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    db: Database,
}

impl CreditLedger {
    pub fn new(db: Database) -> Self {
        CreditLedger { db }
    }

    /// Opens a voucher for `client_id` not tied to any order.
    ///
    /// ## Returns
    /// * `Err(Domain(UnknownReference))` - Client does not exist
    /// * `Err(Domain(Validation))` - Amount not positive
    pub async fn create_voucher(
        &self,
        client_id: &str,
        amount: Money,
        due_date: NaiveDate,
    ) -> DbResult<Voucher> {
        validate_positive_amount("voucher amount", amount)?;

        let _guard = self.db.locks().lock(client_id).await;
        let mut tx = self.db.begin().await?;

        let voucher = open_voucher_in(&mut *tx, client_id, None, amount, due_date).await?;

        tx.commit().await?;

        info!(
            voucher_id = %voucher.id,
            client_id = %client_id,
            amount = %amount,
            due_date = %due_date,
            "Voucher created"
        );

        Ok(voucher)
    }

    /// Settles the client's whole outstanding debt, oldest voucher first.
    ///
    /// ## Returns
    /// * `Err(Domain(InsufficientPayment))` - Payment below the debt; nothing changed
    pub async fn allocate_payment(
        &self,
        client_id: &str,
        payment: Money,
    ) -> DbResult<PaymentAllocation> {
        self.allocate_with(client_id, payment, SettlementPolicy::FullSettlement)
            .await
    }

    /// Applies whatever `payment` covers, oldest voucher first.
    pub async fn allocate_partial(
        &self,
        client_id: &str,
        payment: Money,
    ) -> DbResult<PaymentAllocation> {
        self.allocate_with(client_id, payment, SettlementPolicy::Partial)
            .await
    }

    async fn allocate_with(
        &self,
        client_id: &str,
        payment: Money,
        policy: SettlementPolicy,
    ) -> DbResult<PaymentAllocation> {
        validate_positive_amount("payment amount", payment)?;

        let _guard = self.db.locks().lock(client_id).await;
        let mut tx = self.db.begin().await?;

        if fetch_client(&mut *tx, client_id).await?.is_none() {
            return Err(DbError::unknown("client", client_id));
        }

        let mut vouchers = list_active_for_client(&mut *tx, client_id).await?;
        let allocation = allocate(client_id, &mut vouchers, payment, policy, Utc::now())?;

        for voucher in vouchers
            .iter()
            .filter(|v| allocation.touched_voucher_ids().any(|id| id == v.id))
        {
            update_voucher_balance(&mut *tx, voucher).await?;
        }

        tx.commit().await?;

        info!(
            client_id = %client_id,
            policy = ?policy,
            payment = %payment,
            applied = %allocation.total_applied,
            vouchers = allocation.allocations.len(),
            change_due = %allocation.change_due,
            remaining_debt = %allocation.remaining_debt,
            "Payment allocated"
        );

        Ok(allocation)
    }

    /// Applies a payment to one voucher. Partial payments are allowed.
    ///
    /// ## Returns
    /// * `Err(Domain(UnknownReference))` - No such voucher
    /// * `Err(Domain(InvalidStateTransition))` - Voucher already Paid
    pub async fn pay_voucher(&self, voucher_id: &str, payment: Money) -> DbResult<VoucherPayment> {
        validate_positive_amount("payment amount", payment)?;

        let client_id = self
            .db
            .vouchers()
            .get_by_id(voucher_id)
            .await?
            .ok_or_else(|| DbError::unknown("voucher", voucher_id))?
            .client_id;

        let _guard = self.db.locks().lock(&client_id).await;
        let mut tx = self.db.begin().await?;

        // Re-read under the lock: the balance may have moved since
        let mut voucher = fetch_voucher(&mut *tx, voucher_id)
            .await?
            .ok_or_else(|| DbError::unknown("voucher", voucher_id))?;

        let applied = apply_to_voucher(&mut voucher, payment, Utc::now())?;
        update_voucher_balance(&mut *tx, &voucher).await?;

        let remaining_debt: Money = list_active_for_client(&mut *tx, &client_id)
            .await?
            .iter()
            .map(Voucher::remaining)
            .sum();

        tx.commit().await?;

        info!(
            voucher_id = %voucher_id,
            client_id = %client_id,
            applied = %applied,
            remaining = %voucher.remaining(),
            "Voucher payment recorded"
        );

        Ok(VoucherPayment {
            voucher,
            applied,
            change_due: payment - applied,
            remaining_debt,
        })
    }

    /// Aggregated voucher totals for a client. Read-only.
    pub async fn get_client_balance(&self, client_id: &str) -> DbResult<ClientBalance> {
        let vouchers = self.db.vouchers().list_for_client(client_id).await?;
        Ok(ClientBalance::from_vouchers(client_id, &vouchers))
    }

    /// Every voucher of a client, oldest first.
    pub async fn list_client_vouchers(&self, client_id: &str) -> DbResult<Vec<Voucher>> {
        list_client_vouchers(self.db.pool(), client_id).await
    }
}

/// Opens and inserts a voucher on an open transaction.
///
/// The caller must already hold the client's lock.
pub(crate) async fn open_voucher_in(
    conn: &mut SqliteConnection,
    client_id: &str,
    order_id: Option<&str>,
    amount: Money,
    due_date: NaiveDate,
) -> DbResult<Voucher> {
    if fetch_client(&mut *conn, client_id).await?.is_none() {
        return Err(DbError::unknown("client", client_id));
    }

    let voucher = open_voucher(client_id, order_id, amount, due_date, Utc::now())?;
    insert_voucher(&mut *conn, &voucher).await?;

    Ok(voucher)
}
