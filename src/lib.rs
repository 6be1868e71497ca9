//! Storefront service
//!
//! Catalog listing, session carts and checkout reconciliation over a
//! relational product store.
//!
//! ## Features
//! - Catalog media normalization (legacy and JSON-encoded image columns)
//! - Search, sort and pagination pipeline for the product listing
//! - Session carts with merge-on-add semantics
//! - Checkout reconciliation against live stock, with a compensating order
//!   delete when the item insert fails mid-flight
//! - Best-effort analytics events (NATS + `user_activity` rows)

pub mod analytics;
pub mod checkout;
pub mod domain;
pub mod storage;
