//! Order aggregate
//!
//! Write-only from this service's perspective: orders are created in
//! `pending` and handed to the back office. Monetary snapshots are rounded
//! to two decimals here, at submission time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{LocationType, PhoneNumber};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: Uuid,
    customer_name: String,
    phone: PhoneNumber,
    address: String,
    location_type: LocationType,
    /// Sum of item subtotals plus the delivery charge, 2-decimal rounded.
    total_amount: Decimal,
    status: OrderStatus,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderItem {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    /// Unit price snapshot at submission time, 2-decimal rounded.
    pub price: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }
}

/// One validated line going into an order: live price, requested quantity.
#[derive(Clone, Debug)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl Order {
    /// Builds a `pending` order from validated lines. The item set must be
    /// non-empty; an order that would have no items is never constructed,
    /// so it can never be persisted.
    pub fn place(
        customer_name: impl Into<String>,
        phone: PhoneNumber,
        address: impl Into<String>,
        location_type: LocationType,
        lines: Vec<OrderLineInput>,
        delivery_charge: Decimal,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoItems);
        }
        let id = Uuid::now_v7();
        let items: Vec<OrderItem> = lines
            .into_iter()
            .map(|l| OrderItem {
                order_id: id,
                product_id: l.product_id,
                quantity: l.quantity,
                price: l.unit_price.round_dp(2),
            })
            .collect();
        let subtotal: Decimal = items
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum();
        Ok(Self {
            id,
            customer_name: customer_name.into(),
            phone,
            address: address.into(),
            location_type,
            total_amount: (subtotal + delivery_charge).round_dp(2),
            status: OrderStatus::Pending,
            items,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn customer_name(&self) -> &str { &self.customer_name }
    pub fn phone(&self) -> &PhoneNumber { &self.phone }
    pub fn address(&self) -> &str { &self.address }
    pub fn location_type(&self) -> LocationType { self.location_type }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

#[derive(Debug, Clone, Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> PhoneNumber { PhoneNumber::new("0171-234567").unwrap() }

    #[test]
    fn place_computes_rounded_total_with_delivery() {
        let order = Order::place(
            "Rahim",
            phone(),
            "12 Lake Road",
            LocationType::Inside,
            vec![
                OrderLineInput {
                    product_id: Uuid::new_v4(),
                    quantity: 3,
                    unit_price: Decimal::new(19995, 3), // 19.995 -> 20.00 per unit
                },
                OrderLineInput {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: Decimal::new(505, 2),
                },
            ],
            Decimal::from(60),
        )
        .unwrap();

        // 3 * 20.00 + 5.05 + 60 = 125.05 (banker's rounding on the snapshot)
        assert_eq!(order.total_amount(), Decimal::new(12505, 2));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.items().len(), 2);
        assert!(order.items().iter().all(|i| i.order_id == order.id()));
    }

    #[test]
    fn empty_item_set_is_rejected() {
        let err = Order::place(
            "Rahim",
            phone(),
            "12 Lake Road",
            LocationType::Outside,
            vec![],
            Decimal::from(120),
        )
        .unwrap_err();
        assert!(matches!(err, OrderError::NoItems));
    }
}
