//! # Subscription Tracker
//!
//! Activation, bottle consumption and manual status changes of prepaid
//! subscriptions. Consumption runs under the client's lock so two
//! deliveries cannot both spend the last bottles.

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::catalog::{fetch_client, fetch_plan};
use crate::repository::subscription::{
    fetch_subscription, insert_subscription, update_subscription,
};
use agua_core::subscription::{activate, change_status, record_delivery};
use agua_core::{Subscription, SubscriptionStatus};

/// Prepaid subscription lifecycle.
#[derive(Debug, Clone)]
pub struct SubscriptionTracker {
    db: Database,
}

impl SubscriptionTracker {
    pub fn new(db: Database) -> Self {
        SubscriptionTracker { db }
    }

    /// Starts a subscription on `plan_id` for `client_id`.
    ///
    /// ## Returns
    /// * `Err(Domain(UnknownReference))` - Client or plan does not exist
    /// * `Err(Domain(Validation))` - Plan no longer offered
    pub async fn activate(
        &self,
        client_id: &str,
        plan_id: &str,
        start_date: NaiveDate,
    ) -> DbResult<Subscription> {
        let _guard = self.db.locks().lock(client_id).await;
        let mut tx = self.db.begin().await?;

        if fetch_client(&mut *tx, client_id).await?.is_none() {
            return Err(DbError::unknown("client", client_id));
        }
        let plan = fetch_plan(&mut *tx, plan_id)
            .await?
            .ok_or_else(|| DbError::unknown("subscription plan", plan_id))?;

        let subscription = activate(&plan, client_id, start_date, Utc::now())?;
        insert_subscription(&mut *tx, &subscription).await?;

        tx.commit().await?;

        info!(
            subscription_id = %subscription.id,
            client_id = %client_id,
            plan = %plan.name,
            bottles = subscription.total_bottles_with_bonus,
            next_payment = %subscription.next_payment_date,
            "Subscription activated"
        );

        Ok(subscription)
    }

    /// Consumes `bottle_count` bottles of a subscription.
    ///
    /// ## Returns
    /// * `Err(Domain(SubscriptionExhausted))` - Not enough bottles left; unchanged
    /// * `Err(Domain(InvalidStateTransition))` - Subscription not Active
    pub async fn record_delivery(
        &self,
        subscription_id: &str,
        bottle_count: i64,
    ) -> DbResult<Subscription> {
        let client_id = self.owner_of(subscription_id).await?;

        let _guard = self.db.locks().lock(&client_id).await;
        let mut tx = self.db.begin().await?;

        let subscription = fetch_subscription(&mut *tx, subscription_id)
            .await?
            .ok_or_else(|| DbError::unknown("subscription", subscription_id))?;
        let subscription = record_delivery_in(&mut *tx, subscription, bottle_count).await?;

        tx.commit().await?;

        Ok(subscription)
    }

    /// Manual status change (pause, resume, cancel, expire).
    pub async fn change_status(
        &self,
        subscription_id: &str,
        next: SubscriptionStatus,
    ) -> DbResult<Subscription> {
        let client_id = self.owner_of(subscription_id).await?;

        let _guard = self.db.locks().lock(&client_id).await;
        let mut tx = self.db.begin().await?;

        let mut subscription = fetch_subscription(&mut *tx, subscription_id)
            .await?
            .ok_or_else(|| DbError::unknown("subscription", subscription_id))?;

        let from = subscription.status;
        change_status(&mut subscription, next, Utc::now())?;
        update_subscription(&mut *tx, &subscription, subscription.bottles_delivered).await?;

        tx.commit().await?;

        info!(
            subscription_id = %subscription_id,
            from = from.as_str(),
            to = next.as_str(),
            "Subscription status changed"
        );

        Ok(subscription)
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> DbResult<Option<Subscription>> {
        self.db.subscriptions().get_by_id(subscription_id).await
    }

    /// The client's oldest Active subscription, if any.
    pub async fn active_for_client(&self, client_id: &str) -> DbResult<Option<Subscription>> {
        self.db.subscriptions().active_for_client(client_id).await
    }

    /// Bottles still available on a subscription.
    pub async fn remaining_bottles(&self, subscription_id: &str) -> DbResult<i64> {
        self.get_subscription(subscription_id)
            .await?
            .map(|subscription| subscription.remaining_bottles())
            .ok_or_else(|| DbError::unknown("subscription", subscription_id))
    }

    async fn owner_of(&self, subscription_id: &str) -> DbResult<String> {
        self.get_subscription(subscription_id)
            .await?
            .map(|subscription| subscription.client_id)
            .ok_or_else(|| DbError::unknown("subscription", subscription_id))
    }
}

/// Applies a delivery to `subscription` and writes it on an open transaction.
///
/// The caller must already hold the owning client's lock.
pub(crate) async fn record_delivery_in(
    conn: &mut SqliteConnection,
    mut subscription: Subscription,
    bottle_count: i64,
) -> DbResult<Subscription> {
    let plan = fetch_plan(&mut *conn, &subscription.plan_id)
        .await?
        .ok_or_else(|| DbError::unknown("subscription plan", &subscription.plan_id))?;

    let previously_delivered = subscription.bottles_delivered;
    record_delivery(&mut subscription, &plan, bottle_count, Utc::now())?;
    update_subscription(&mut *conn, &subscription, previously_delivered).await?;

    info!(
        subscription_id = %subscription.id,
        client_id = %subscription.client_id,
        bottles = bottle_count,
        delivered = subscription.bottles_delivered,
        remaining = subscription.remaining_bottles(),
        status = subscription.status.as_str(),
        "Subscription delivery recorded"
    );

    Ok(subscription)
}
