//! # agua-db: Database Layer and Engine Services for Agua
//!
//! This crate stores the water-delivery engine's state in SQLite (through
//! sqlx) and runs the engine operations on top of it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Agua Data Flow                                   │
//! │                                                                         │
//! │  Caller (API handler, job, CLI)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     agua-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │               │    │               │    │  (embedded)  │  │   │
//! │  │   │ OrderService  │───►│ Catalog       │    │              │  │   │
//! │  │   │ CreditLedger  │    │ Order         │    │ 001_initial  │  │   │
//! │  │   │ Subscription- │    │ Voucher       │    │ _schema.sql  │  │   │
//! │  │   │   Tracker     │    │ Subscription  │    │              │  │   │
//! │  │   │ Collection-   │    └───────┬───────┘    └──────────────┘  │   │
//! │  │   │   Service     │            │                              │   │
//! │  │   └───────┬───────┘    ┌───────▼───────┐                      │   │
//! │  │           │            │   Database    │                      │   │
//! │  │           └───────────►│ pool + client │                      │   │
//! │  │         agua-core      │ locks         │                      │   │
//! │  │         (rules)        └───────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`locks`] - Per-client critical sections
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (catalog, order, voucher, subscription)
//! - [`service`] - Engine operations (ordering, ledger, subscriptions, reporting)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agua_db::{CreditLedger, Database, EngineConfig, OrderService};
//!
//! let config = EngineConfig::from_env()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let orders = OrderService::new(db.clone(), &config);
//! let placed = orders.place_order(request).await?;
//!
//! let ledger = CreditLedger::new(db);
//! let allocation = ledger.allocate_payment(&client_id, Money::from_cents(5000)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig};
pub use error::{DbError, DbResult};
pub use locks::{ClientGuard, ClientLocks};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, NewProduct};
pub use repository::order::OrderRepository;
pub use repository::subscription::SubscriptionRepository;
pub use repository::voucher::VoucherRepository;

// Service re-exports
pub use service::ledger::{CreditLedger, VoucherPayment};
pub use service::ordering::{OrderLineInput, OrderService, PlaceOrder, PlacedOrder};
pub use service::reporting::{CollectionService, ReminderError, ReminderOutcome, ReminderSender};
pub use service::subscriptions::SubscriptionTracker;
