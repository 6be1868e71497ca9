//! Storage ports
//!
//! Trait seams over the relational backend so the checkout reconciler and
//! handlers can be exercised against in-memory fakes. The Postgres
//! implementations live in [`postgres`].

pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, OrderItem, Product};
use crate::domain::value_objects::LocationType;

/// Postgres error code for "undefined column". Classification happens on
/// this explicit code, never by matching message text.
const UNDEFINED_COLUMN: &str = "42703";

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The preferred query shape referenced a column this backend does not
    /// have. Callers may retry with a narrower known-good shape.
    #[error("unsupported column: {0}")]
    UnsupportedColumn(String),
    /// Catch-all for unexpected backend or network failures.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNDEFINED_COLUMN) {
                return Self::UnsupportedColumn(db.message().to_string());
            }
        }
        Self::Backend(err.to_string())
    }
}

/// Live `{id, name, stock, price}` of one product, fetched for checkout
/// reconciliation.
#[derive(Clone, Debug)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub stock: u32,
    pub price: Decimal,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, StorageError>;
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StorageError>;
    /// Snapshots for the given ids; ids unknown to the backend are simply
    /// absent from the result.
    async fn snapshots(&self, ids: &[Uuid]) -> Result<Vec<ProductSnapshot>, StorageError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the session's cart; a session with no stored lines gets an
    /// empty cart.
    async fn load_cart(&self, session: &str) -> Result<Cart, StorageError>;
    /// Persists the cart wholesale, replacing the stored lines.
    async fn save_cart(&self, session: &str, cart: &Cart) -> Result<(), StorageError>;
    async fn clear_cart(&self, session: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<(), StorageError>;
    async fn insert_items(&self, items: &[OrderItem]) -> Result<(), StorageError>;
    /// Compensating delete; removes the order and any items already written
    /// for it.
    async fn delete_order(&self, order_id: Uuid) -> Result<(), StorageError>;
}

#[async_trait]
pub trait DeliveryChargeStore: Send + Sync {
    /// Override rows present in the backend. Rows with unknown location
    /// types are skipped, not errors.
    async fn delivery_overrides(&self) -> Result<Vec<(LocationType, Decimal)>, StorageError>;
}

/// One `user_activity` row. Written best-effort only.
#[derive(Clone, Debug, Default)]
pub struct ActivityRecord {
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub activity_type: String,
    pub page_path: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn record_activity(&self, record: &ActivityRecord) -> Result<(), StorageError>;
}
