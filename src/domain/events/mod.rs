//! Storefront activity events
//!
//! Best-effort notifications consumed by the analytics sink. Nothing in the
//! checkout or cart flow depends on these being delivered.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorefrontEvent {
    ProductViewed { product_id: Uuid, name: String },
    SearchSubmitted { query: String },
    AddedToCart { product_id: Uuid, name: String, quantity: u32 },
    OrderPlaced { order_id: Uuid, total_amount: Decimal },
}

impl StorefrontEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::ProductViewed { .. } => "storefront.events.product_viewed",
            Self::SearchSubmitted { .. } => "storefront.events.search",
            Self::AddedToCart { .. } => "storefront.events.add_to_cart",
            Self::OrderPlaced { .. } => "storefront.events.order_placed",
        }
    }

    /// `user_activity.activity_type` value for the event.
    pub fn activity_type(&self) -> &'static str {
        match self {
            Self::ProductViewed { .. } => "product_view",
            Self::SearchSubmitted { .. } => "search",
            Self::AddedToCart { .. } => "add_to_cart",
            Self::OrderPlaced { .. } => "order_placed",
        }
    }

    /// Product the event is about, when it is about one.
    pub fn product(&self) -> Option<(Uuid, &str)> {
        match self {
            Self::ProductViewed { product_id, name } => Some((*product_id, name.as_str())),
            Self::AddedToCart { product_id, name, .. } => Some((*product_id, name.as_str())),
            _ => None,
        }
    }
}
