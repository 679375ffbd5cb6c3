//! # agua-core: Pure Business Logic for Agua
//!
//! This crate is the **heart** of the water-delivery engine. It holds the
//! pricing, delivery-fee, voucher and subscription rules as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Agua Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              agua-db services (OrderService, CreditLedger,      │   │
//! │  │              SubscriptionTracker, CollectionService)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ agua-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │ delivery  │  │  ledger   │  │subscription│ │   │
//! │  │   │  tiers    │  │ discounts │  │ vouchers  │  │  states   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  report   │  │   money   │  │   types   │  │ validation│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS IN CALCULATORS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    agua-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, District, Order, Voucher, Subscription...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Wholesale tier resolution
//! - [`delivery`] - Delivery fee with volume discounts
//! - [`ledger`] - Voucher allocation and balances
//! - [`subscription`] - Plan construction and subscription state machine
//! - [`report`] - Collection report aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use agua_core::delivery::DeliveryFeeCalculator;
//! use agua_core::money::Money;
//! use agua_core::types::District;
//! use chrono::Utc;
//!
//! let district = District {
//!     id: "d-1".into(),
//!     name: "Centro".into(),
//!     base_delivery_fee_cents: 500,
//!     created_at: Utc::now(),
//! };
//!
//! // 60.00 of goods earns 10% off the delivery fee
//! let quote = DeliveryFeeCalculator::default()
//!     .resolve_delivery_fee(&district, Money::from_cents(6000))
//!     .unwrap();
//! assert_eq!(quote.fee.cents(), 450);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod delivery;
pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod report;
pub mod subscription;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use delivery::{DeliveryDiscountPolicy, DeliveryFeeCalculator, DeliveryFeeQuote};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{ClientBalance, PaymentAllocation, SettlementPolicy};
pub use money::Money;
pub use pricing::{PriceCalculator, PricedLine};
pub use report::{ClientDebt, CollectionReport, CollectionReportBuilder};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product in an order.
///
/// ## Business Reason
/// Prevents typing 1000 instead of 10 on a delivery order.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price or fee accepted anywhere (1,000,000.00).
///
/// Keeps `price × MAX_ITEM_QUANTITY` summed over `MAX_ORDER_LINES` lines
/// well inside `i64` cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Maximum lines in a single order.
pub const MAX_ORDER_LINES: usize = 50;

/// Delivery fee charged when an order's district cannot be resolved (5.00).
pub const DEFAULT_FALLBACK_DELIVERY_FEE_CENTS: i64 = 500;

/// Days between a credit order and its voucher's due date.
pub const DEFAULT_VOUCHER_DUE_DAYS: i64 = 30;
