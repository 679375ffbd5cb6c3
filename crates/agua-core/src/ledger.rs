//! # Voucher Ledger
//!
//! Pure voucher math: opening vouchers, applying payments, FIFO allocation
//! across a client's open vouchers and balance aggregation. The database
//! layer loads the vouchers, calls into this module, and persists whatever
//! it mutated inside one transaction.
//!
//! ## FIFO Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Client vouchers (oldest first)      Payment 60.00                      │
//! │                                                                         │
//! │  V1  30.00 remaining  ◄── 30.00 ──► remaining 0  → Paid                 │
//! │  V2  20.00 remaining  ◄── 20.00 ──► remaining 0  → Paid                 │
//! │                                                                         │
//! │  total_applied 50.00 │ change_due 10.00 │ remaining_debt 0.00           │
//! │                                                                         │
//! │  FullSettlement: payment < 50.00 → InsufficientPayment, nothing moves   │
//! │  Partial:        payment   20.00 → V1 remaining 10.00, V2 untouched     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `change_due` is only reported back; it is never stored as client credit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Voucher, VoucherStatus};
use crate::validation::{validate_positive_amount, validate_uuid};

// =============================================================================
// Allocation Types
// =============================================================================

/// Whether an allocation must clear the client's whole debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// The payment must cover every open voucher or nothing is applied.
    FullSettlement,
    /// Apply as much as the payment covers, oldest voucher first.
    Partial,
}

/// Amount applied to one voucher by an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VoucherAllocation {
    pub voucher_id: String,
    pub applied: Money,
    /// Voucher balance after this allocation.
    pub remaining_after: Money,
    /// True when this allocation closed the voucher.
    pub paid: bool,
}

/// Outcome of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentAllocation {
    pub client_id: String,
    pub payment: Money,
    /// Touched vouchers, in the order they were paid.
    pub allocations: Vec<VoucherAllocation>,
    pub total_applied: Money,
    /// Part of the payment above the debt. Reported, not stored.
    pub change_due: Money,
    /// Client debt left after the allocation.
    pub remaining_debt: Money,
}

impl PaymentAllocation {
    /// Ids of the vouchers whose balance changed.
    pub fn touched_voucher_ids(&self) -> impl Iterator<Item = &str> {
        self.allocations
            .iter()
            .map(|allocation| allocation.voucher_id.as_str())
    }
}

// =============================================================================
// Vouchers
// =============================================================================

/// Opens a new Active voucher with nothing used.
pub fn open_voucher(
    client_id: &str,
    order_id: Option<&str>,
    amount: Money,
    due_date: NaiveDate,
    now: DateTime<Utc>,
) -> CoreResult<Voucher> {
    validate_uuid("client id", client_id)?;
    validate_positive_amount("voucher amount", amount)?;

    Ok(Voucher {
        id: Uuid::new_v4().to_string(),
        client_id: client_id.to_string(),
        order_id: order_id.map(str::to_string),
        amount_cents: amount.cents(),
        used_amount_cents: 0,
        status: VoucherStatus::Active,
        due_date,
        created_at: now,
        paid_at: None,
    })
}

/// Applies up to `payment` to a single Active voucher and returns the amount
/// actually applied. The voucher flips to Paid the moment its remaining
/// balance reaches zero.
pub fn apply_to_voucher(
    voucher: &mut Voucher,
    payment: Money,
    now: DateTime<Utc>,
) -> CoreResult<Money> {
    validate_positive_amount("payment amount", payment)?;

    if !voucher.is_active() {
        return Err(CoreError::invalid_transition("voucher", "paid", "paid"));
    }

    let applied = payment.min(voucher.remaining());
    voucher.used_amount_cents += applied.cents();

    if voucher.remaining().is_zero() {
        voucher.status = VoucherStatus::Paid;
        voucher.paid_at = Some(now);
    }

    Ok(applied)
}

/// Spreads `payment` over the client's Active vouchers, oldest first.
///
/// `vouchers` is sorted in place by `created_at` (stable, so ties keep
/// their loaded order). Vouchers of other clients and Paid vouchers are
/// skipped. Under [`SettlementPolicy::FullSettlement`] the outstanding debt
/// is checked before any voucher is touched.
pub fn allocate(
    client_id: &str,
    vouchers: &mut [Voucher],
    payment: Money,
    policy: SettlementPolicy,
    now: DateTime<Utc>,
) -> CoreResult<PaymentAllocation> {
    validate_positive_amount("payment amount", payment)?;

    vouchers.sort_by_key(|voucher| voucher.created_at);

    let outstanding: Money = vouchers
        .iter()
        .filter(|voucher| voucher.client_id == client_id && voucher.is_active())
        .map(Voucher::remaining)
        .sum();

    if policy == SettlementPolicy::FullSettlement && payment < outstanding {
        return Err(CoreError::InsufficientPayment {
            client_id: client_id.to_string(),
            outstanding,
            offered: payment,
        });
    }

    let mut left = payment;
    let mut allocations = Vec::new();

    for voucher in vouchers
        .iter_mut()
        .filter(|voucher| voucher.client_id == client_id && voucher.is_active())
    {
        if left.is_zero() {
            break;
        }

        let applied = apply_to_voucher(voucher, left, now)?;
        left -= applied;

        allocations.push(VoucherAllocation {
            voucher_id: voucher.id.clone(),
            applied,
            remaining_after: voucher.remaining(),
            paid: voucher.status == VoucherStatus::Paid,
        });
    }

    let total_applied = payment - left;

    Ok(PaymentAllocation {
        client_id: client_id.to_string(),
        payment,
        allocations,
        total_applied,
        change_due: left,
        remaining_debt: outstanding - total_applied,
    })
}

// =============================================================================
// Balance
// =============================================================================

/// Aggregated voucher totals of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientBalance {
    pub client_id: String,
    /// Every voucher the client ever had, paid ones included.
    pub total_vouchers: usize,
    pub active_vouchers: usize,
    pub total_amount: Money,
    pub total_used: Money,
    /// Outstanding debt: `total_amount - total_used`.
    pub total_remaining: Money,
}

impl ClientBalance {
    /// Sums the vouchers belonging to `client_id`. Others are ignored.
    pub fn from_vouchers(client_id: &str, vouchers: &[Voucher]) -> Self {
        let mut balance = ClientBalance {
            client_id: client_id.to_string(),
            total_vouchers: 0,
            active_vouchers: 0,
            total_amount: Money::zero(),
            total_used: Money::zero(),
            total_remaining: Money::zero(),
        };

        for voucher in vouchers.iter().filter(|v| v.client_id == client_id) {
            balance.total_vouchers += 1;
            if voucher.is_active() {
                balance.active_vouchers += 1;
            }
            balance.total_amount += voucher.amount();
            balance.total_used += voucher.used();
            balance.total_remaining += voucher.remaining();
        }

        balance
    }

    pub fn has_debt(&self) -> bool {
        self.total_remaining.is_positive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
