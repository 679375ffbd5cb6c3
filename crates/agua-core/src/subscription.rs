//! # Subscriptions
//!
//! Plan construction and the subscription state machine.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            pause                                                        │
//! │   Active ◄──────────► Paused                                            │
//! │     │     resume        │                                               │
//! │     │                   │                                               │
//! │     ├───────────────────┼──► Cancelled                                  │
//! │     ├───────────────────┴──► Expired                                    │
//! │     │                                                                   │
//! │     └── record_delivery reaches the entitlement ──► Completed           │
//! │                                                                         │
//! │  Completed, Cancelled and Expired are terminal.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entitlement
//! `total_bottles_with_bonus` is fixed at activation. `bottles_delivered`
//! only grows and never passes it; a delivery that would overshoot is
//! refused whole.

use chrono::{DateTime, Months, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Subscription, SubscriptionPlan, SubscriptionStatus};
use crate::validation::{validate_bottle_count, validate_name, validate_uuid};

// =============================================================================
// Status Machine
// =============================================================================

impl SubscriptionStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Completed
                | SubscriptionStatus::Cancelled
                | SubscriptionStatus::Expired
        )
    }

    /// Manual transitions. Completed is only reached through deliveries.
    pub const fn can_transition_to(&self, next: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, next),
            (Active, Paused)
                | (Paused, Active)
                | (Active, Cancelled)
                | (Paused, Cancelled)
                | (Active, Expired)
                | (Paused, Expired)
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Completed => "completed",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl Subscription {
    /// Bottles still owed to the client.
    pub fn remaining_bottles(&self) -> i64 {
        self.total_bottles_with_bonus - self.bottles_delivered
    }
}

// =============================================================================
// Plans
// =============================================================================

/// Builds a plan, deriving the bonus percentage and per-bottle price.
///
/// ```rust
/// use agua_core::money::Money;
/// use agua_core::subscription::new_plan;
/// use chrono::Utc;
///
/// let plan = new_plan("Familiar", 20, 2, Money::from_cents(5000), 4, Utc::now()).unwrap();
/// assert_eq!(plan.bonus_percentage_bps, 1000); // 2 of 20 = 10%
/// assert_eq!(plan.total_with_bonus(), 22);
/// assert_eq!(plan.price_per_bottle_cents, 250);
/// ```
pub fn new_plan(
    name: &str,
    total_bottles: i64,
    bonus_bottles: i64,
    monthly_price: Money,
    max_daily_delivery: i64,
    now: DateTime<Utc>,
) -> CoreResult<SubscriptionPlan> {
    validate_name("plan name", name)?;
    validate_bottle_count(total_bottles)?;

    if bonus_bottles < 0 {
        return Err(ValidationError::OutOfRange {
            field: "bonus bottles".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    if monthly_price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "monthly price".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    if max_daily_delivery <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "max daily delivery".to_string(),
        }
        .into());
    }

    Ok(SubscriptionPlan {
        id: Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        total_bottles,
        bonus_bottles,
        bonus_percentage_bps: bonus_percentage_bps(total_bottles, bonus_bottles)?,
        monthly_price_cents: monthly_price.cents(),
        price_per_bottle_cents: (monthly_price.cents() + total_bottles / 2) / total_bottles,
        max_daily_delivery,
        is_active: true,
        created_at: now,
    })
}

/// `bonus / total` in basis points, rounded half-up.
fn bonus_percentage_bps(total_bottles: i64, bonus_bottles: i64) -> CoreResult<u32> {
    let bps = (bonus_bottles as i128 * 10_000 + total_bottles as i128 / 2) / total_bottles as i128;
    u32::try_from(bps).map_err(|_| {
        CoreError::configuration(format!(
            "bonus of {} bottles over {} is out of range",
            bonus_bottles, total_bottles
        ))
    })
}

/// Checks that a stored plan's bonus percentage matches its bottle counts.
pub fn validate_plan(plan: &SubscriptionPlan) -> CoreResult<()> {
    if plan.total_bottles <= 0 || plan.bonus_bottles < 0 {
        return Err(CoreError::configuration(format!(
            "plan {} has invalid bottle counts",
            plan.id
        )));
    }

    let expected = bonus_percentage_bps(plan.total_bottles, plan.bonus_bottles)?;
    if plan.bonus_percentage_bps != expected {
        return Err(CoreError::configuration(format!(
            "plan {} bonus is {} bps, expected {} bps",
            plan.id, plan.bonus_percentage_bps, expected
        )));
    }

    Ok(())
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Starts a subscription on `plan` for `client_id`.
pub fn activate(
    plan: &SubscriptionPlan,
    client_id: &str,
    start_date: NaiveDate,
    now: DateTime<Utc>,
) -> CoreResult<Subscription> {
    validate_uuid("client id", client_id)?;
    validate_plan(plan)?;

    if !plan.is_active {
        return Err(ValidationError::InvalidFormat {
            field: "plan".to_string(),
            reason: format!("plan {} is not active", plan.id),
        }
        .into());
    }

    let next_payment_date = start_date
        .checked_add_months(Months::new(1))
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "start date".to_string(),
            reason: format!("{} has no following month", start_date),
        })?;

    Ok(Subscription {
        id: Uuid::new_v4().to_string(),
        client_id: client_id.to_string(),
        plan_id: plan.id.clone(),
        total_bottles_with_bonus: plan.total_with_bonus(),
        bottles_delivered: 0,
        status: SubscriptionStatus::Active,
        start_date,
        next_payment_date,
        created_at: now,
        updated_at: now,
    })
}

/// Consumes `bottle_count` bottles of the entitlement.
///
/// ## Checks, in order
/// 1. `bottle_count` is positive
/// 2. The entitlement covers it, else `SubscriptionExhausted`
/// 3. It is within the plan's daily maximum
/// 4. The subscription is Active, else `InvalidStateTransition`
///
/// On any error the subscription is left as it was.
pub fn record_delivery(
    subscription: &mut Subscription,
    plan: &SubscriptionPlan,
    bottle_count: i64,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    validate_bottle_count(bottle_count)?;

    let remaining = subscription.remaining_bottles();
    if bottle_count > remaining {
        return Err(CoreError::SubscriptionExhausted {
            subscription_id: subscription.id.clone(),
            remaining,
            requested: bottle_count,
        });
    }

    if bottle_count > plan.max_daily_delivery {
        return Err(ValidationError::OutOfRange {
            field: "bottle count".to_string(),
            min: 1,
            max: plan.max_daily_delivery,
        }
        .into());
    }

    if subscription.status != SubscriptionStatus::Active {
        return Err(CoreError::invalid_transition(
            "subscription",
            subscription.status.as_str(),
            "delivery",
        ));
    }

    subscription.bottles_delivered += bottle_count;
    if subscription.remaining_bottles() == 0 {
        subscription.status = SubscriptionStatus::Completed;
    }
    subscription.updated_at = now;

    Ok(())
}

/// Applies a manual status change.
pub fn change_status(
    subscription: &mut Subscription,
    next: SubscriptionStatus,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if !subscription.status.can_transition_to(next) {
        return Err(CoreError::invalid_transition(
            "subscription",
            subscription.status.as_str(),
            next.as_str(),
        ));
    }

    subscription.status = next;
    subscription.updated_at = now;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
