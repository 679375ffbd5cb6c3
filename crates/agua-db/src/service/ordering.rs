//! # Order Service
//!
//! Places delivery orders and moves them through dispatch.
//!
//! ## Placement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(PlaceOrder)                                                │
//! │                                                                         │
//! │  validate lines ──► lock(client) ──► BEGIN                             │
//! │                                        │                               │
//! │  client, products ── unknown id ──► UnknownReference (fail fast)       │
//! │        │                                                               │
//! │        ▼                                                               │
//! │  price lines (wholesale tiers) ──► subtotal                            │
//! │        │                                                               │
//! │        ▼                                                               │
//! │  district ── unknown ──► fallback fee, degraded = true, warn!          │
//! │        │                                                               │
//! │        ▼                                                               │
//! │  insert order + lines                                                  │
//! │        │                                                               │
//! │        ├── CashOnDelivery ──► nothing else                             │
//! │        ├── Credit ──────────► voucher for the total, due in N days     │
//! │        └── Subscription ────► Σ quantities off the Active subscription │
//! │                                        │                               │
//! │                                     COMMIT                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Days, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, MAX_VOUCHER_DUE_DAYS};
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::catalog::{fetch_client, fetch_district, fetch_product};
use crate::repository::order::{
    fetch_order, insert_line, insert_order, link_subscription, link_voucher, update_dispatch,
};
use crate::repository::subscription::fetch_active_for_client;
use crate::service::ledger::open_voucher_in;
use crate::service::subscriptions::record_delivery_in;
use agua_core::validation::{validate_name, validate_order_lines, validate_quantity, validate_uuid};
use agua_core::{
    CoreError, DeliveryFeeCalculator, Order, OrderLine, OrderStatus, PaymentMethod,
    PriceCalculator, PricedLine, ValidationError,
};

/// One requested line: a product and how many units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: String,
    pub quantity: i64,
}

/// Order placement request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub client_id: String,
    pub district_id: String,
    pub lines: Vec<OrderLineInput>,
    pub payment_method: PaymentMethod,
}

/// A placed order with its priced lines.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Order placement and dispatch.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
    delivery_fees: DeliveryFeeCalculator,
    voucher_due_days: i64,
}

impl OrderService {
    pub fn new(db: Database, config: &EngineConfig) -> Self {
        OrderService {
            db,
            delivery_fees: config.delivery_fees.clone(),
            voucher_due_days: config.voucher_due_days,
        }
    }

    /// Prices and persists an order, then settles it by payment method.
    ///
    /// ## Returns
    /// * `Err(Domain(UnknownReference))` - Unknown client or product, or a
    ///   subscription order from a client with no Active subscription
    /// * `Err(Domain(Configuration))` - Malformed product tiers
    /// * `Err(Domain(SubscriptionExhausted))` - Not enough bottles left
    pub async fn place_order(&self, request: PlaceOrder) -> DbResult<PlacedOrder> {
        validate_uuid("client id", &request.client_id)?;
        validate_order_lines(request.lines.len())?;
        for line in &request.lines {
            validate_quantity(line.quantity)?;
        }

        let _guard = self.db.locks().lock(&request.client_id).await;
        let mut tx = self.db.begin().await?;

        if fetch_client(&mut *tx, &request.client_id).await?.is_none() {
            return Err(DbError::unknown("client", &request.client_id));
        }

        let mut priced: Vec<PricedLine> = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = fetch_product(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| DbError::unknown("product", &line.product_id))?;

            if !product.is_active {
                return Err(ValidationError::InvalidFormat {
                    field: "product".to_string(),
                    reason: format!("product {} is no longer sold", product.id),
                }
                .into());
            }

            priced.push(PriceCalculator::price_line(&product, line.quantity)?);
        }
        let subtotal = PriceCalculator::subtotal(&priced);

        let district = fetch_district(&mut *tx, &request.district_id).await?;
        if district.is_none() {
            warn!(
                client_id = %request.client_id,
                district_id = %request.district_id,
                fallback_fee = %self.delivery_fees.fallback_fee(),
                "Unknown district, applying fallback delivery fee"
            );
        }
        let quote = self
            .delivery_fees
            .resolve_with_fallback(district.as_ref(), subtotal)?;

        let now = Utc::now();
        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            client_id: request.client_id.clone(),
            district_id: request.district_id.clone(),
            subtotal_cents: subtotal.cents(),
            delivery_fee_cents: quote.fee.cents(),
            delivery_discount_bps: quote.discount.bps(),
            delivery_fee_degraded: quote.degraded,
            total_cents: (subtotal + quote.fee).cents(),
            payment_method: request.payment_method,
            status: OrderStatus::Pending,
            driver_id: None,
            voucher_id: None,
            subscription_id: None,
            created_at: now,
            updated_at: now,
        };
        insert_order(&mut *tx, &order).await?;

        let mut lines = Vec::with_capacity(priced.len());
        for priced_line in &priced {
            let line = OrderLine {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                product_id: priced_line.product_id.clone(),
                quantity: priced_line.quantity,
                unit_price_cents: priced_line.unit_price.cents(),
                line_total_cents: priced_line.line_total.cents(),
                tier_level: priced_line.tier_level.map(i64::from),
            };
            insert_line(&mut *tx, &line).await?;
            lines.push(line);
        }

        match order.payment_method {
            PaymentMethod::CashOnDelivery => {}
            PaymentMethod::Credit => {
                let due_date = u64::try_from(self.voucher_due_days)
                    .ok()
                    .and_then(|days| now.date_naive().checked_add_days(Days::new(days)))
                    .ok_or_else(|| ValidationError::OutOfRange {
                        field: "voucher due days".to_string(),
                        min: 0,
                        max: MAX_VOUCHER_DUE_DAYS,
                    })?;
                let voucher = open_voucher_in(
                    &mut *tx,
                    &order.client_id,
                    Some(&order.id),
                    order.total(),
                    due_date,
                )
                .await?;
                link_voucher(&mut *tx, &order.id, &voucher.id).await?;
                order.voucher_id = Some(voucher.id);
            }
            PaymentMethod::Subscription => {
                let subscription = fetch_active_for_client(&mut *tx, &order.client_id)
                    .await?
                    .ok_or_else(|| DbError::unknown("active subscription", &order.client_id))?;
                let bottles: i64 = lines.iter().map(|line| line.quantity).sum();
                let subscription = record_delivery_in(&mut *tx, subscription, bottles).await?;
                link_subscription(&mut *tx, &order.id, &subscription.id).await?;
                order.subscription_id = Some(subscription.id);
            }
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            client_id = %order.client_id,
            lines = lines.len(),
            subtotal = %subtotal,
            delivery_fee = %quote.fee,
            discount = ?quote.discount_label(),
            degraded = quote.degraded,
            total = %order.total(),
            payment_method = ?order.payment_method,
            "Order placed"
        );

        Ok(PlacedOrder { order, lines })
    }

    /// Assigns a driver to a Pending order.
    pub async fn assign_driver(&self, order_id: &str, driver_id: &str) -> DbResult<Order> {
        validate_name("driver id", driver_id)?;
        self.transition(order_id, OrderStatus::Assigned, Some(driver_id))
            .await
    }

    /// Moves an order along its lifecycle. Use [`Self::assign_driver`] to
    /// reach Assigned.
    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> DbResult<Order> {
        if status == OrderStatus::Assigned {
            return Err(ValidationError::Required {
                field: "driver id".to_string(),
            }
            .into());
        }
        self.transition(order_id, status, None).await
    }

    pub async fn get_order(&self, order_id: &str) -> DbResult<Option<PlacedOrder>> {
        let orders = self.db.orders();
        let Some(order) = orders.get_by_id(order_id).await? else {
            return Ok(None);
        };
        let lines = orders.get_lines(order_id).await?;

        Ok(Some(PlacedOrder { order, lines }))
    }

    async fn transition(
        &self,
        order_id: &str,
        next: OrderStatus,
        driver_id: Option<&str>,
    ) -> DbResult<Order> {
        let mut tx = self.db.begin().await?;

        let mut order = fetch_order(&mut *tx, order_id)
            .await?
            .ok_or_else(|| DbError::unknown("order", order_id))?;

        if !order.status.can_transition_to(next) {
            return Err(CoreError::invalid_transition(
                "order",
                order.status.as_str(),
                next.as_str(),
            )
            .into());
        }

        // A driver stays on the order once assigned
        let driver_id = driver_id.or(order.driver_id.as_deref()).map(str::to_string);
        let now = Utc::now();
        update_dispatch(
            &mut *tx,
            order_id,
            order.status,
            next,
            driver_id.as_deref(),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            from = order.status.as_str(),
            to = next.as_str(),
            driver_id = ?driver_id,
            "Order status changed"
        );

        order.status = next;
        order.driver_id = driver_id;
        order.updated_at = now;

        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_order_from_json_payload() {
        let payload = r#"{
            "client_id": "550e8400-e29b-41d4-a716-446655440000",
            "district_id": "d-centro",
            "lines": [{ "product_id": "p-20l", "quantity": 12 }],
            "payment_method": "credit"
        }"#;

        let request: PlaceOrder = serde_json::from_str(payload).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Credit);
        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].quantity, 12);
    }

    #[test]
    fn test_unknown_payment_method_is_rejected() {
        let payload = r#"{
            "client_id": "550e8400-e29b-41d4-a716-446655440000",
            "district_id": "d-centro",
            "lines": [],
            "payment_method": "barter"
        }"#;

        assert!(serde_json::from_str::<PlaceOrder>(payload).is_err());
    }
}
