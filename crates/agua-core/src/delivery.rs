//! # Delivery Fees
//!
//! Resolves the delivery fee of an order from its district and subtotal.
//!
//! ## Volume Discount
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The discount applies to the DELIVERY FEE, not to the goods.           │
//! │                                                                         │
//! │  subtotal  <  50.00  ──►  base fee                                      │
//! │  subtotal  ≥  50.00  ──►  base fee − 10%                                │
//! │  subtotal  ≥ 100.00  ──►  base fee − 20%                                │
//! │                                                                         │
//! │  District base 5.00: 40.00 → 5.00 │ 60.00 → 4.50 │ 150.00 → 4.00        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Unknown District
//! An order whose district cannot be resolved still gets a fee: the
//! configured fallback, no discount, and `degraded = true` on the quote so
//! the caller can log it and flag the order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{DiscountRate, District};
use crate::DEFAULT_FALLBACK_DELIVERY_FEE_CENTS;

// =============================================================================
// Discount Policy
// =============================================================================

/// From `min_subtotal` on, the delivery fee is reduced by `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountThreshold {
    pub min_subtotal: Money,
    pub rate: DiscountRate,
}

/// Subtotal thresholds for delivery-fee discounts, lowest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDiscountPolicy {
    thresholds: Vec<DiscountThreshold>,
}

impl DeliveryDiscountPolicy {
    /// Builds a policy, rejecting ambiguous configurations.
    ///
    /// ## Rules
    /// - Thresholds are not negative and strictly increase
    /// - Rates strictly increase with the threshold
    /// - No rate above 100%
    pub fn new(thresholds: Vec<DiscountThreshold>) -> CoreResult<Self> {
        for (idx, threshold) in thresholds.iter().enumerate() {
            if threshold.min_subtotal.is_negative() {
                return Err(CoreError::configuration(format!(
                    "discount threshold {} is negative",
                    threshold.min_subtotal
                )));
            }
            if threshold.rate.bps() > 10_000 {
                return Err(CoreError::configuration(format!(
                    "discount rate {} bps exceeds 100%",
                    threshold.rate.bps()
                )));
            }
            if idx > 0 {
                let prev = thresholds[idx - 1];
                if threshold.min_subtotal <= prev.min_subtotal {
                    return Err(CoreError::configuration(format!(
                        "discount thresholds must increase: {} after {}",
                        threshold.min_subtotal, prev.min_subtotal
                    )));
                }
                if threshold.rate <= prev.rate {
                    return Err(CoreError::configuration(format!(
                        "discount rates must increase with the threshold: {} bps after {} bps",
                        threshold.rate.bps(),
                        prev.rate.bps()
                    )));
                }
            }
        }

        Ok(DeliveryDiscountPolicy { thresholds })
    }

    pub fn thresholds(&self) -> &[DiscountThreshold] {
        &self.thresholds
    }

    /// Discount for a subtotal: the highest threshold reached, or zero.
    pub fn rate_for(&self, subtotal: Money) -> DiscountRate {
        self.thresholds
            .iter()
            .rev()
            .find(|threshold| subtotal >= threshold.min_subtotal)
            .map(|threshold| threshold.rate)
            .unwrap_or_default()
    }
}

impl Default for DeliveryDiscountPolicy {
    /// 10% from 50.00, 20% from 100.00.
    fn default() -> Self {
        DeliveryDiscountPolicy {
            thresholds: vec![
                DiscountThreshold {
                    min_subtotal: Money::from_cents(5_000),
                    rate: DiscountRate::from_bps(1_000),
                },
                DiscountThreshold {
                    min_subtotal: Money::from_cents(10_000),
                    rate: DiscountRate::from_bps(2_000),
                },
            ],
        }
    }
}

// =============================================================================
// Quote
// =============================================================================

/// A resolved delivery fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryFeeQuote {
    /// Fee charged after the discount.
    pub fee: Money,
    /// Fee before the discount.
    pub base_fee: Money,
    pub discount: DiscountRate,
    /// True when the district was unknown and the fallback fee was used.
    pub degraded: bool,
}

impl DeliveryFeeQuote {
    /// Message shown to the client when a discount applies.
    ///
    /// ```rust
    /// use agua_core::delivery::DeliveryFeeQuote;
    /// use agua_core::money::Money;
    /// use agua_core::types::DiscountRate;
    ///
    /// let quote = DeliveryFeeQuote {
    ///     fee: Money::from_cents(450),
    ///     base_fee: Money::from_cents(500),
    ///     discount: DiscountRate::from_bps(1000),
    ///     degraded: false,
    /// };
    /// assert_eq!(quote.discount_label().as_deref(), Some("10% discount applied"));
    /// ```
    pub fn discount_label(&self) -> Option<String> {
        if self.discount.is_zero() {
            return None;
        }
        let bps = self.discount.bps();
        if bps % 100 == 0 {
            Some(format!("{}% discount applied", bps / 100))
        } else {
            Some(format!("{:.2}% discount applied", self.discount.percentage()))
        }
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Resolves delivery fees against a discount policy.
#[derive(Debug, Clone)]
pub struct DeliveryFeeCalculator {
    policy: DeliveryDiscountPolicy,
    fallback_fee: Money,
}

impl DeliveryFeeCalculator {
    pub fn new(policy: DeliveryDiscountPolicy, fallback_fee: Money) -> CoreResult<Self> {
        if fallback_fee.is_negative() {
            return Err(CoreError::configuration(format!(
                "fallback delivery fee {} is negative",
                fallback_fee
            )));
        }

        Ok(DeliveryFeeCalculator {
            policy,
            fallback_fee,
        })
    }

    pub fn policy(&self) -> &DeliveryDiscountPolicy {
        &self.policy
    }

    pub fn fallback_fee(&self) -> Money {
        self.fallback_fee
    }

    /// Fee for an order of `subtotal` delivered to `district`.
    pub fn resolve_delivery_fee(
        &self,
        district: &District,
        subtotal: Money,
    ) -> CoreResult<DeliveryFeeQuote> {
        let base_fee = district.base_delivery_fee();
        if base_fee.is_negative() {
            return Err(CoreError::configuration(format!(
                "district {} has a negative delivery fee",
                district.id
            )));
        }

        let discount = self.policy.rate_for(subtotal);

        Ok(DeliveryFeeQuote {
            fee: base_fee.apply_discount(discount),
            base_fee,
            discount,
            degraded: false,
        })
    }

    /// Like [`Self::resolve_delivery_fee`], but an unresolved district yields
    /// the fallback fee instead of an error.
    pub fn resolve_with_fallback(
        &self,
        district: Option<&District>,
        subtotal: Money,
    ) -> CoreResult<DeliveryFeeQuote> {
        match district {
            Some(district) => self.resolve_delivery_fee(district, subtotal),
            None => Ok(DeliveryFeeQuote {
                fee: self.fallback_fee,
                base_fee: self.fallback_fee,
                discount: DiscountRate::zero(),
                degraded: true,
            }),
        }
    }
}

impl Default for DeliveryFeeCalculator {
    fn default() -> Self {
        DeliveryFeeCalculator {
            policy: DeliveryDiscountPolicy::default(),
            fallback_fee: Money::from_cents(DEFAULT_FALLBACK_DELIVERY_FEE_CENTS),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
