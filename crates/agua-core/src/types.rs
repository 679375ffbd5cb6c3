//! # Domain Types
//!
//! Core domain types used throughout the engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Reference data            Orders                 Credit instruments    │
//! │  ──────────────            ──────                 ──────────────────    │
//! │  Product (+3 tiers)        Order                  Voucher (vale)        │
//! │  District                  OrderLine              Subscription          │
//! │  Client                    PaymentMethod          SubscriptionPlan      │
//! │                            OrderStatus                                  │
//! │                                                                         │
//! │  DiscountRate: basis points, 1000 = 10%                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are stored as `*_cents: i64` columns and exposed as [`Money`]
//! through accessor methods, the same way for every entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Discount Rate
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%).
///
/// 1000 bps = 10%, 2000 bps = 20%, 10000 bps = 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Whole-percent value for messages such as "10% discount applied".
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A wholesale price break: from `min_quantity` units on, each unit costs `price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WholesaleTier {
    /// Tier number, 1 to 3.
    pub level: u8,
    pub min_quantity: i64,
    pub price: Money,
}

/// A product sold by the delivery business (bottles, jugs, refills...).
///
/// Up to three wholesale tiers are stored as nullable column pairs. A tier
/// slot counts as configured when both its minimum and its price are set.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,

    /// Base unit price in cents.
    pub price_cents: i64,

    pub tier1_min_quantity: Option<i64>,
    pub tier1_price_cents: Option<i64>,
    pub tier2_min_quantity: Option<i64>,
    pub tier2_price_cents: Option<i64>,
    pub tier3_min_quantity: Option<i64>,
    pub tier3_price_cents: Option<i64>,

    /// Soft delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the base unit price.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Raw tier slots as `(level, min_quantity, price_cents)`, lowest level first.
    pub fn tier_slots(&self) -> [(u8, Option<i64>, Option<i64>); 3] {
        [
            (1, self.tier1_min_quantity, self.tier1_price_cents),
            (2, self.tier2_min_quantity, self.tier2_price_cents),
            (3, self.tier3_min_quantity, self.tier3_price_cents),
        ]
    }

    /// Fully configured tiers, lowest level first. Half-configured slots are skipped;
    /// use [`crate::pricing::validate_wholesale_tiers`] to reject them.
    pub fn tiers(&self) -> Vec<WholesaleTier> {
        self.tier_slots()
            .into_iter()
            .filter_map(|(level, min, price)| match (min, price) {
                (Some(min_quantity), Some(price_cents)) => Some(WholesaleTier {
                    level,
                    min_quantity,
                    price: Money::from_cents(price_cents),
                }),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// District & Client
// =============================================================================

/// A delivery district with its base delivery fee.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct District {
    pub id: String,
    /// Unique district name.
    pub name: String,
    pub base_delivery_fee_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl District {
    #[inline]
    pub fn base_delivery_fee(&self) -> Money {
        Money::from_cents(self.base_delivery_fee_cents)
    }
}

/// A customer of the delivery business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub district_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How an order is settled. Drives the post-pricing branch of order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid in cash when the driver hands over the order.
    CashOnDelivery,
    /// Deferred payment: a voucher (vale) is opened for the order total.
    Credit,
    /// Bottles are taken from the client's prepaid subscription.
    Subscription,
}

// =============================================================================
// Order
// =============================================================================

/// Order lifecycle status.
///
/// ```text
/// Pending ──► Assigned ──► InTransit ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Assigned, InTransit)
                | (InTransit, Delivered)
                | (Pending, Cancelled)
                | (Assigned, Cancelled)
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// A delivery order. Pricing fields are frozen at creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub client_id: String,
    /// District the order was priced against (may be unknown when the fee was degraded).
    pub district_id: String,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub delivery_discount_bps: u32,
    /// True when the fallback fee was applied because the district was unknown.
    pub delivery_fee_degraded: bool,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub driver_id: Option<String>,
    /// Voucher opened for a credit order.
    pub voucher_id: Option<String>,
    /// Subscription charged for a subscription order.
    pub subscription_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn delivery_fee(&self) -> Money {
        Money::from_cents(self.delivery_fee_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A priced order line. Unit price is a snapshot taken at order creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Wholesale tier level that set the unit price, if any.
    pub tier_level: Option<i64>,
}

impl OrderLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Voucher
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Still has a remaining balance.
    Active,
    /// Remaining balance reached zero.
    Paid,
}

/// A deferred-payment credit instrument (vale).
///
/// ## Invariants
/// - `amount_cents` never changes after creation
/// - `0 <= used_amount_cents <= amount_cents`, only ever increases
/// - `remaining = amount - used`, never stored
/// - `status == Paid` exactly when remaining is zero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Voucher {
    pub id: String,
    pub client_id: String,
    /// Order that opened this voucher, when created by the ordering flow.
    pub order_id: Option<String>,
    pub amount_cents: i64,
    pub used_amount_cents: i64,
    pub status: VoucherStatus,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Voucher {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn used(&self) -> Money {
        Money::from_cents(self.used_amount_cents)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.amount_cents - self.used_amount_cents)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == VoucherStatus::Active
    }
}

// =============================================================================
// Subscriptions
// =============================================================================

/// A prepaid plan: `total_bottles` plus `bonus_bottles` per period.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub total_bottles: i64,
    pub bonus_bottles: i64,
    /// `bonus_bottles / total_bottles` in basis points. Always derived, never entered.
    pub bonus_percentage_bps: u32,
    pub monthly_price_cents: i64,
    pub price_per_bottle_cents: i64,
    pub max_daily_delivery: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    /// Entitlement granted at activation (base + bonus).
    #[inline]
    pub fn total_with_bonus(&self) -> i64 {
        self.total_bottles + self.bonus_bottles
    }

    #[inline]
    pub fn monthly_price(&self) -> Money {
        Money::from_cents(self.monthly_price_cents)
    }

    #[inline]
    pub fn price_per_bottle(&self) -> Money {
        Money::from_cents(self.price_per_bottle_cents)
    }

    #[inline]
    pub fn bonus_percentage(&self) -> DiscountRate {
        DiscountRate::from_bps(self.bonus_percentage_bps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
    Expired,
}

/// A client's prepaid subscription and its consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Subscription {
    pub id: String,
    pub client_id: String,
    pub plan_id: String,
    /// Fixed at activation.
    pub total_bottles_with_bonus: i64,
    /// Only ever increases, never above `total_bottles_with_bonus`.
    pub bottles_delivered: i64,
    pub status: SubscriptionStatus,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub next_payment_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product_with_tiers() -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Bidón 20L".to_string(),
            price_cents: 1000,
            tier1_min_quantity: Some(10),
            tier1_price_cents: Some(900),
            tier2_min_quantity: None,
            tier2_price_cents: None,
            tier3_min_quantity: Some(100),
            tier3_price_cents: Some(700),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tiers_skip_empty_slots() {
        let tiers = product_with_tiers().tiers();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].level, 1);
        assert_eq!(tiers[1].level, 3);
        assert_eq!(tiers[1].price.cents(), 700);
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Assigned));
        assert!(OrderStatus::Assigned.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_payment_method_serializes_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(json, "\"cash_on_delivery\"");
    }

    #[test]
    fn test_discount_rate_percentage() {
        let rate = DiscountRate::from_bps(2000);
        assert!((rate.percentage() - 20.0).abs() < 0.001);
        assert_eq!(DiscountRate::default(), DiscountRate::zero());
    }
}
