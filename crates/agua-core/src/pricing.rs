//! # Wholesale Pricing
//!
//! Resolves the unit price of a product for a requested quantity.
//!
//! ## Tier Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product: base 10.00 │ tier1 ≥10 → 9.00 │ tier2 ≥50 → 8.00             │
//! │                                                                         │
//! │  quantity 49                                                            │
//! │     │                                                                   │
//! │     ├── tier2: 50 ≤ 49? no                                             │
//! │     ├── tier1: 10 ≤ 49? yes ──► 9.00                                   │
//! │     └── (base never reached)                                           │
//! │                                                                         │
//! │  Tiers are walked from the highest level down; the first match wins.   │
//! │  A missing tier 2 does not hide tier 3.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product whose tiers are malformed is refused with
//! [`CoreError::Configuration`]; pricing never picks a tier by guesswork.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, WholesaleTier};
use crate::validation::validate_quantity;
use crate::MAX_PRICE_CENTS;

/// Checks a product's price configuration.
///
/// ## Rules
/// - Base price lies in `0..=MAX_PRICE_CENTS`
/// - A tier slot has both a minimum quantity and a price, or neither
/// - Minimum quantities are positive and strictly increase with the level
/// - Tier prices are not negative, not above the base price, and never
///   above the price of a lower configured tier
pub fn validate_wholesale_tiers(product: &Product) -> CoreResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&product.price_cents) {
        return Err(CoreError::configuration(format!(
            "product {} base price {} is outside 0..={}",
            product.id,
            product.price(),
            Money::from_cents(MAX_PRICE_CENTS)
        )));
    }

    let mut previous: Option<WholesaleTier> = None;

    for (level, min, price) in product.tier_slots() {
        let (min_quantity, price_cents) = match (min, price) {
            (None, None) => continue,
            (Some(min_quantity), Some(price_cents)) => (min_quantity, price_cents),
            _ => {
                return Err(CoreError::configuration(format!(
                    "product {} tier {} needs both a minimum quantity and a price",
                    product.id, level
                )))
            }
        };

        if min_quantity <= 0 {
            return Err(CoreError::configuration(format!(
                "product {} tier {} minimum quantity must be positive",
                product.id, level
            )));
        }

        if price_cents < 0 || price_cents > product.price_cents {
            return Err(CoreError::configuration(format!(
                "product {} tier {} price {} is outside 0..={}",
                product.id,
                level,
                Money::from_cents(price_cents),
                product.price()
            )));
        }

        if let Some(prev) = previous {
            if min_quantity <= prev.min_quantity {
                return Err(CoreError::configuration(format!(
                    "product {} tier {} minimum quantity ({}) must be greater than tier {} minimum quantity ({})",
                    product.id, level, min_quantity, prev.level, prev.min_quantity
                )));
            }
            if price_cents > prev.price.cents() {
                return Err(CoreError::configuration(format!(
                    "product {} tier {} price {} is above tier {} price {}",
                    product.id,
                    level,
                    Money::from_cents(price_cents),
                    prev.level,
                    prev.price
                )));
            }
        }

        previous = Some(WholesaleTier {
            level,
            min_quantity,
            price: Money::from_cents(price_cents),
        });
    }

    Ok(())
}

/// A product line priced for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// `unit_price × quantity`, exact to the cent.
    pub line_total: Money,
    /// Wholesale tier that set the unit price; `None` means base price.
    pub tier_level: Option<u8>,
}

/// Resolves unit prices and line totals.
pub struct PriceCalculator;

impl PriceCalculator {
    /// Returns the unit price of `product` when `quantity` units are ordered.
    ///
    /// ```rust
    /// # use agua_core::pricing::PriceCalculator;
    /// # use agua_core::types::Product;
    /// # use chrono::Utc;
    /// let product = Product {
    ///     id: "p-1".into(), name: "Bidón 20L".into(), price_cents: 1000,
    ///     tier1_min_quantity: Some(10), tier1_price_cents: Some(900),
    ///     tier2_min_quantity: Some(50), tier2_price_cents: Some(800),
    ///     tier3_min_quantity: None, tier3_price_cents: None,
    ///     is_active: true, created_at: Utc::now(), updated_at: Utc::now(),
    /// };
    /// assert_eq!(PriceCalculator::resolve_unit_price(&product, 49).unwrap().cents(), 900);
    /// assert_eq!(PriceCalculator::resolve_unit_price(&product, 50).unwrap().cents(), 800);
    /// ```
    pub fn resolve_unit_price(product: &Product, quantity: i64) -> CoreResult<Money> {
        Ok(Self::resolve(product, quantity)?.0)
    }

    /// Prices one order line.
    pub fn price_line(product: &Product, quantity: i64) -> CoreResult<PricedLine> {
        let (unit_price, tier_level) = Self::resolve(product, quantity)?;

        Ok(PricedLine {
            product_id: product.id.clone(),
            quantity,
            unit_price,
            line_total: unit_price.multiply_quantity(quantity),
            tier_level,
        })
    }

    /// Sum of line totals.
    pub fn subtotal(lines: &[PricedLine]) -> Money {
        lines.iter().map(|line| line.line_total).sum()
    }

    fn resolve(product: &Product, quantity: i64) -> CoreResult<(Money, Option<u8>)> {
        validate_quantity(quantity)?;
        validate_wholesale_tiers(product)?;

        let tier = product
            .tiers()
            .into_iter()
            .rev()
            .find(|tier| tier.min_quantity <= quantity);

        Ok(match tier {
            Some(tier) => (tier.price, Some(tier.level)),
            None => (product.price(), None),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
