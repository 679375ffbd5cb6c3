//! # Repository Module
//!
//! Database repository implementations for the engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Outside a transaction                 Inside a transaction            │
//! │  ─────────────────────                 ────────────────────            │
//! │  db.vouchers().list_for_client(id)     let mut tx = db.begin().await?; │
//! │       │                                voucher::list_active_for_client │
//! │       │                                    (&mut *tx, id)              │
//! │       ▼                                     │                          │
//! │  VoucherRepository (holds the pool)         │                          │
//! │       │                                     │                          │
//! │       └───────────► executor-level fn ◄─────┘                          │
//! │                          │                                             │
//! │                          ▼                                             │
//! │                     SQLite Database                                    │
//! │                                                                         │
//! │  SQL lives in one place per aggregate; services decide the            │
//! │  transaction boundary.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Products, districts, clients, plans
//! - [`OrderRepository`](order::OrderRepository) - Orders and order lines
//! - [`VoucherRepository`](voucher::VoucherRepository) - Vouchers
//! - [`SubscriptionRepository`](subscription::SubscriptionRepository) - Subscriptions

pub mod catalog;
pub mod order;
pub mod subscription;
pub mod voucher;
