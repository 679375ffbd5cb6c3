//! Integration tests for order placement and dispatch.

mod common;

use agua_core::{CoreError, OrderStatus, PaymentMethod, SubscriptionStatus, VoucherStatus};
use agua_core::{Money, MAX_PRICE_CENTS};
use agua_db::{DbError, NewProduct, OrderLineInput, OrderService, PlaceOrder, SubscriptionTracker};
use chrono::{Duration, Utc};
use common::{setup, Fixture};

fn request(fx: &Fixture, quantity: i64, payment_method: PaymentMethod) -> PlaceOrder {
    PlaceOrder {
        client_id: fx.client.id.clone(),
        district_id: fx.district.id.clone(),
        lines: vec![OrderLineInput {
            product_id: fx.product.id.clone(),
            quantity,
        }],
        payment_method,
    }
}

#[tokio::test]
async fn place_order_resolves_wholesale_tier_per_quantity() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let below = orders
        .place_order(request(&fx, 49, PaymentMethod::CashOnDelivery))
        .await
        .unwrap();
    assert_eq!(below.lines[0].unit_price_cents, 900);
    assert_eq!(below.lines[0].tier_level, Some(1));
    assert_eq!(below.order.subtotal_cents, 44_100);

    let at = orders
        .place_order(request(&fx, 50, PaymentMethod::CashOnDelivery))
        .await
        .unwrap();
    assert_eq!(at.lines[0].unit_price_cents, 800);
    assert_eq!(at.lines[0].line_total_cents, 40_000);
    assert_eq!(at.lines[0].tier_level, Some(2));
}

#[tokio::test]
async fn place_order_discounts_delivery_fee_by_subtotal() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    // 4 x 10.00 = 40.00: no discount
    let small = orders
        .place_order(request(&fx, 4, PaymentMethod::CashOnDelivery))
        .await
        .unwrap();
    assert_eq!(small.order.delivery_fee_cents, 500);
    assert_eq!(small.order.delivery_discount_bps, 0);
    assert_eq!(small.order.total_cents, 4_500);

    // 6 x 10.00 = 60.00: 10% off
    let medium = orders
        .place_order(request(&fx, 6, PaymentMethod::CashOnDelivery))
        .await
        .unwrap();
    assert_eq!(medium.order.delivery_fee_cents, 450);
    assert_eq!(medium.order.delivery_discount_bps, 1_000);

    // 15 x 9.00 = 135.00: 20% off
    let large = orders
        .place_order(request(&fx, 15, PaymentMethod::CashOnDelivery))
        .await
        .unwrap();
    assert_eq!(large.order.subtotal_cents, 13_500);
    assert_eq!(large.order.delivery_fee_cents, 400);
    assert_eq!(large.order.total_cents, 13_900);
    assert!(!large.order.delivery_fee_degraded);
}

#[tokio::test]
async fn unknown_district_falls_back_to_degraded_fee() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let mut req = request(&fx, 6, PaymentMethod::CashOnDelivery);
    req.district_id = "district-that-does-not-exist".into();

    let placed = orders.place_order(req).await.unwrap();

    // Fallback fee is never discounted, even above the 50.00 threshold
    assert_eq!(placed.order.delivery_fee_cents, 500);
    assert_eq!(placed.order.delivery_discount_bps, 0);
    assert!(placed.order.delivery_fee_degraded);
    assert_eq!(placed.order.total_cents, 6_500);
}

#[tokio::test]
async fn credit_order_opens_voucher_for_order_total() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let placed = orders
        .place_order(request(&fx, 5, PaymentMethod::Credit))
        .await
        .unwrap();

    let voucher_id = placed.order.voucher_id.clone().expect("credit order has a voucher");
    let voucher = fx.db.vouchers().get_by_id(&voucher_id).await.unwrap().unwrap();

    assert_eq!(voucher.amount_cents, placed.order.total_cents);
    assert_eq!(voucher.amount_cents, 5_450);
    assert_eq!(voucher.used_amount_cents, 0);
    assert_eq!(voucher.status, VoucherStatus::Active);
    assert_eq!(voucher.client_id, fx.client.id);
    assert_eq!(voucher.order_id.as_deref(), Some(placed.order.id.as_str()));
    assert_eq!(
        voucher.due_date,
        placed.order.created_at.date_naive() + Duration::days(fx.config.voucher_due_days)
    );

    let stored = fx.db.orders().get_by_id(&placed.order.id).await.unwrap().unwrap();
    assert_eq!(stored.voucher_id, Some(voucher_id));
}

#[tokio::test]
async fn credit_term_beyond_calendar_is_rejected() {
    let fx = setup().await;
    let mut config = fx.config.clone();
    config.voucher_due_days = 200_000_000;
    let orders = OrderService::new(fx.db.clone(), &config);

    let err = orders
        .place_order(request(&fx, 5, PaymentMethod::Credit))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    assert!(fx.db.orders().list_for_client(&fx.client.id).await.unwrap().is_empty());
    assert_eq!(fx.db.vouchers().count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn cash_order_opens_no_voucher() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let placed = orders
        .place_order(request(&fx, 2, PaymentMethod::CashOnDelivery))
        .await
        .unwrap();

    assert!(placed.order.voucher_id.is_none());
    assert_eq!(fx.db.vouchers().count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_product_fails_fast_and_writes_nothing() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let mut req = request(&fx, 2, PaymentMethod::Credit);
    req.lines.push(OrderLineInput {
        product_id: "no-such-product".into(),
        quantity: 1,
    });

    let err = orders.place_order(req).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::UnknownReference { ref entity, .. }) if entity == "product"
    ));

    assert!(fx.db.orders().list_for_client(&fx.client.id).await.unwrap().is_empty());
    assert_eq!(fx.db.vouchers().count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_client_is_rejected() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let mut req = request(&fx, 2, PaymentMethod::CashOnDelivery);
    req.client_id = uuid::Uuid::new_v4().to_string();

    let err = orders.place_order(req).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::UnknownReference { ref entity, .. }) if entity == "client"
    ));
}

#[tokio::test]
async fn product_priced_above_cap_is_refused() {
    let fx = setup().await;

    let err = fx
        .db
        .catalog()
        .create_product(NewProduct {
            name: "Dispensador".into(),
            price: Money::from_cents(MAX_PRICE_CENTS + 1),
            tiers: [None, None, None],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    assert_eq!(fx.db.catalog().count_products().await.unwrap(), 1);
}

#[tokio::test]
async fn invalid_lines_are_rejected_before_any_lookup() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let mut empty = request(&fx, 1, PaymentMethod::CashOnDelivery);
    empty.lines.clear();
    let err = orders.place_order(empty).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    let zero = request(&fx, 0, PaymentMethod::CashOnDelivery);
    let err = orders.place_order(zero).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
}

#[tokio::test]
async fn subscription_order_consumes_bottles() {
    let fx = setup().await;
    let plan = fx.plan().await;
    let tracker = SubscriptionTracker::new(fx.db.clone());
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let subscription = tracker
        .activate(&fx.client.id, &plan.id, Utc::now().date_naive())
        .await
        .unwrap();

    let placed = orders
        .place_order(request(&fx, 3, PaymentMethod::Subscription))
        .await
        .unwrap();
    assert_eq!(placed.order.subscription_id.as_deref(), Some(subscription.id.as_str()));
    assert!(placed.order.voucher_id.is_none());

    assert_eq!(tracker.remaining_bottles(&subscription.id).await.unwrap(), 19);
}

#[tokio::test]
async fn subscription_order_over_entitlement_rolls_back() {
    let fx = setup().await;
    let plan = fx.plan().await;
    let tracker = SubscriptionTracker::new(fx.db.clone());
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let subscription = tracker
        .activate(&fx.client.id, &plan.id, Utc::now().date_naive())
        .await
        .unwrap();
    tracker.record_delivery(&subscription.id, 20).await.unwrap();

    let err = orders
        .place_order(request(&fx, 3, PaymentMethod::Subscription))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::SubscriptionExhausted { remaining: 2, requested: 3, .. })
    ));

    // Neither the order nor a partial consumption survived
    assert!(fx.db.orders().list_for_client(&fx.client.id).await.unwrap().is_empty());
    let unchanged = tracker.get_subscription(&subscription.id).await.unwrap().unwrap();
    assert_eq!(unchanged.bottles_delivered, 20);
    assert_eq!(unchanged.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn subscription_order_without_active_subscription_fails() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);

    let err = orders
        .place_order(request(&fx, 1, PaymentMethod::Subscription))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::UnknownReference { .. })));
}

#[tokio::test]
async fn dispatch_follows_order_lifecycle() {
    let fx = setup().await;
    let orders = OrderService::new(fx.db.clone(), &fx.config);
    let placed = orders
        .place_order(request(&fx, 2, PaymentMethod::CashOnDelivery))
        .await
        .unwrap();
    let id = placed.order.id.as_str();

    // Assigned needs a driver
    let err = orders.update_status(id, OrderStatus::Assigned).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

    let assigned = orders.assign_driver(id, "driver-7").await.unwrap();
    assert_eq!(assigned.status, OrderStatus::Assigned);
    assert_eq!(assigned.driver_id.as_deref(), Some("driver-7"));

    orders.update_status(id, OrderStatus::InTransit).await.unwrap();
    let delivered = orders.update_status(id, OrderStatus::Delivered).await.unwrap();
    assert_eq!(delivered.driver_id.as_deref(), Some("driver-7"));

    let err = orders.update_status(id, OrderStatus::Cancelled).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InvalidStateTransition { .. })
    ));

    let stored = orders.get_order(id).await.unwrap().unwrap();
    assert_eq!(stored.order.status, OrderStatus::Delivered);
    assert_eq!(stored.lines.len(), 1);
    // Pricing frozen at placement
    assert_eq!(stored.order.total_cents, placed.order.total_cents);
}
