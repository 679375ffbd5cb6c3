//! # Services
//!
//! Engine operations on top of the repositories. Each mutating call owns
//! its transaction and, for client state, the client's lock.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderService ───────────┬──► ledger::open_voucher_in        (credit)  │
//! │                          └──► subscriptions::record_delivery_in        │
//! │                                                    (subscription)      │
//! │  CreditLedger            vouchers and payments                         │
//! │  SubscriptionTracker     activation, deliveries, status                │
//! │  CollectionService       reports and reminders (read-only)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_in` helpers run on a caller's transaction and never lock.

pub mod ledger;
pub mod ordering;
pub mod reporting;
pub mod subscriptions;
