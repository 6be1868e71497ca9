//! Postgres implementations of the storage ports.
//!
//! The products queries use a capability probe: the preferred shape selects
//! the optional `images` and `priority` columns, and an `UnsupportedColumn`
//! classification triggers one retry with the narrow known-good column set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartLine, Order, OrderItem, Product, RawProduct};
use crate::domain::value_objects::LocationType;

use super::{
    ActivityRecord, ActivityStore, CartStore, CatalogStore, DeliveryChargeStore, OrderStore,
    ProductSnapshot, StorageError,
};

const WIDE_PRODUCT_SELECT: &str =
    "SELECT id, name, description, price, stock, image_url, images, priority, created_at FROM products";
const NARROW_PRODUCT_SELECT: &str =
    "SELECT id, name, description, price, stock, image_url, created_at FROM products";

#[derive(Clone)]
pub struct PgStorefront {
    pool: PgPool,
}

impl PgStorefront {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    image_url: Option<String>,
    images: Option<serde_json::Value>,
    priority: Option<i32>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct NarrowProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<NarrowProductRow> for ProductRow {
    fn from(row: NarrowProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            image_url: row.image_url,
            images: None,
            priority: None,
            created_at: row.created_at,
        }
    }
}

impl ProductRow {
    fn into_product(self) -> Product {
        Product::from_raw(RawProduct {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            image_url: self.image_url,
            images: self.images,
            priority: self.priority,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    name: String,
    stock: i32,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: Uuid,
    name: String,
    price: Decimal,
    quantity: i32,
    thumbnail: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ChargeRow {
    location_type: String,
    charge: Decimal,
}

#[async_trait]
impl CatalogStore for PgStorefront {
    async fn list_products(&self) -> Result<Vec<Product>, StorageError> {
        let rows: Vec<ProductRow> = match sqlx::query_as::<_, ProductRow>(WIDE_PRODUCT_SELECT)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)
        {
            Ok(rows) => rows,
            Err(StorageError::UnsupportedColumn(column)) => {
                tracing::warn!(%column, "products query retried with narrow column set");
                sqlx::query_as::<_, NarrowProductRow>(NARROW_PRODUCT_SELECT)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(StorageError::from)?
                    .into_iter()
                    .map(ProductRow::from)
                    .collect()
            }
            Err(other) => return Err(other),
        };
        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, StorageError> {
        let wide = format!("{WIDE_PRODUCT_SELECT} WHERE id = $1");
        let row: Option<ProductRow> = match sqlx::query_as::<_, ProductRow>(&wide)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)
        {
            Ok(row) => row,
            Err(StorageError::UnsupportedColumn(column)) => {
                tracing::warn!(%column, "product query retried with narrow column set");
                let narrow = format!("{NARROW_PRODUCT_SELECT} WHERE id = $1");
                sqlx::query_as::<_, NarrowProductRow>(&narrow)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(StorageError::from)?
                    .map(ProductRow::from)
            }
            Err(other) => return Err(other),
        };
        Ok(row.map(ProductRow::into_product))
    }

    async fn snapshots(&self, ids: &[Uuid]) -> Result<Vec<ProductSnapshot>, StorageError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, name, stock, price FROM products WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| ProductSnapshot {
                id: r.id,
                name: r.name,
                stock: r.stock.max(0) as u32,
                price: r.price,
            })
            .collect())
    }
}

#[async_trait]
impl CartStore for PgStorefront {
    async fn load_cart(&self, session: &str) -> Result<Cart, StorageError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            "SELECT product_id, name, price, quantity, thumbnail FROM cart_lines WHERE session_id = $1 ORDER BY position",
        )
        .bind(session)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        let mut cart = Cart::new();
        for row in rows {
            cart.add_line(CartLine {
                product_id: row.product_id,
                name: row.name,
                price: row.price,
                quantity: row.quantity.max(1) as u32,
                thumbnail: row.thumbnail,
            });
        }
        Ok(cart)
    }

    async fn save_cart(&self, session: &str, cart: &Cart) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        sqlx::query("DELETE FROM cart_lines WHERE session_id = $1")
            .bind(session)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        for (position, line) in cart.lines().iter().enumerate() {
            sqlx::query(
                "INSERT INTO cart_lines (session_id, position, product_id, name, price, quantity, thumbnail) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(session)
            .bind(position as i32)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.price)
            .bind(line.quantity as i32)
            .bind(&line.thumbnail)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn clear_cart(&self, session: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM cart_lines WHERE session_id = $1")
            .bind(session)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStorefront {
    async fn insert_order(&self, order: &Order) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO orders (id, customer_name, phone, address, location_type, total_amount, status, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id())
        .bind(order.customer_name())
        .bind(order.phone().as_str())
        .bind(order.address())
        .bind(order.location_type().as_str())
        .bind(order.total_amount())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn insert_items(&self, items: &[OrderItem]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        for item in items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::now_v7())
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity as i32)
            .bind(item.price)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> Result<(), StorageError> {
        // order_items rows go with it via ON DELETE CASCADE
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryChargeStore for PgStorefront {
    async fn delivery_overrides(&self) -> Result<Vec<(LocationType, Decimal)>, StorageError> {
        let rows = sqlx::query_as::<_, ChargeRow>(
            "SELECT location_type, charge FROM delivery_charges",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match LocationType::parse(&row.location_type) {
                Ok(location) => Some((location, row.charge)),
                Err(_) => {
                    tracing::debug!(location_type = %row.location_type, "skipping unknown delivery charge row");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl ActivityStore for PgStorefront {
    async fn record_activity(&self, record: &ActivityRecord) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO user_activity (session_id, user_agent, ip_address, activity_type, page_path, product_id, product_name, metadata) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&record.session_id)
        .bind(&record.user_agent)
        .bind(&record.ip_address)
        .bind(&record.activity_type)
        .bind(&record.page_path)
        .bind(record.product_id)
        .bind(&record.product_name)
        .bind(&record.metadata)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }
}
