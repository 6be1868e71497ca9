//! Checkout reconciliation
//!
//! Re-checks a session cart against live stock and pricing, then submits
//! the order. The flow is `Validating` ([`Checkout::validate`]) followed by
//! `Submitting` ([`ValidatedCheckout::submit`]); a `ValidatedCheckout` only
//! exists once every line has passed, so an order with zero items can never
//! reach the store. There is no cross-request transaction behind the two
//! inserts, so a failed item insert triggers a compensating delete of the
//! order row.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::{Cart, Order, OrderLineInput};
use crate::domain::value_objects::{LocationType, PhoneNumber};
use crate::storage::{CartStore, CatalogStore, DeliveryChargeStore, OrderStore, StorageError};

/// Built-in delivery charges, used wherever the backend has no override row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryCharges {
    inside: Decimal,
    outside: Decimal,
}

impl Default for DeliveryCharges {
    fn default() -> Self {
        Self { inside: Decimal::from(60), outside: Decimal::from(120) }
    }
}

impl DeliveryCharges {
    pub fn charge(&self, location: LocationType) -> Decimal {
        match location {
            LocationType::Inside => self.inside,
            LocationType::Outside => self.outside,
        }
    }

    pub fn set(&mut self, location: LocationType, charge: Decimal) {
        match location {
            LocationType::Inside => self.inside = charge,
            LocationType::Outside => self.outside = charge,
        }
    }
}

/// Customer-entered checkout form fields.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ContactInfo {
    #[validate(custom = "non_blank")]
    pub customer_name: String,
    #[validate(custom = "permissive_phone")]
    pub phone: String,
    #[validate(custom = "non_blank")]
    pub address: String,
    pub location_type: LocationType,
}

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn permissive_phone(value: &str) -> Result<(), ValidationError> {
    PhoneNumber::new(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("phone"))
}

/// One line the live catalog cannot satisfy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockShortage {
    pub name: String,
    pub available: u32,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid cart line: {0}")]
    InvalidCartLine(String),
    #[error("invalid contact info: {0}")]
    InvalidContactInfo(String),
    /// The named products vanished from the catalog. Their lines have been
    /// removed from the stored cart, so an immediate retry is possible.
    #[error("products no longer available: {}", .0.join(", "))]
    ProductsUnavailable(Vec<String>),
    /// The named products cannot cover the requested quantities. The cart
    /// is left untouched for the customer to adjust.
    #[error("insufficient stock: {}", format_shortages(.0))]
    OutOfStock(Vec<StockShortage>),
    #[error("order could not be created")]
    OrderCreateFailed(#[source] StorageError),
    #[error("order items could not be saved")]
    OrderItemsInsertFailed(#[source] StorageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn format_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| format!("{} ({} left)", s.name, s.available))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Successful submission result.
#[derive(Clone, Debug)]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub total_amount: Decimal,
    pub delivery_charge: Decimal,
}

pub struct Checkout<S> {
    store: Arc<S>,
}

impl<S> Checkout<S>
where
    S: CatalogStore + CartStore + OrderStore + DeliveryChargeStore,
{
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    /// Effective delivery charges: built-in defaults overwritten by whatever
    /// override rows the backend has. An unreachable lookup is not an error;
    /// defaults apply silently.
    pub async fn delivery_charges(&self) -> DeliveryCharges {
        let mut charges = DeliveryCharges::default();
        match self.store.delivery_overrides().await {
            Ok(overrides) => {
                for (location, charge) in overrides {
                    charges.set(location, charge);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "delivery charge lookup failed, using defaults");
            }
        }
        charges
    }

    /// `Validating`: checks cart shape and contact fields, reconciles every
    /// line against live stock and pricing, and prices the order.
    ///
    /// Lines referencing products the catalog no longer has are removed from
    /// the stored cart before the `ProductsUnavailable` rejection is
    /// returned; stock shortfalls reject without mutating the cart.
    pub async fn validate(
        &self,
        session: &str,
        contact: &ContactInfo,
    ) -> Result<ValidatedCheckout<'_, S>, CheckoutError> {
        let mut cart = self.store.load_cart(session).await?;
        check_cart_shape(&cart)?;
        contact
            .validate()
            .map_err(|err| CheckoutError::InvalidContactInfo(err.to_string()))?;
        let phone = PhoneNumber::new(&contact.phone)
            .map_err(|err| CheckoutError::InvalidContactInfo(err.to_string()))?;

        let ids = cart.product_ids();
        let snapshots = self.store.snapshots(&ids).await?;
        let live: HashMap<Uuid, _> = snapshots.into_iter().map(|s| (s.id, s)).collect();

        if live.len() != ids.len() {
            let live_ids: Vec<Uuid> = live.keys().copied().collect();
            let missing = cart.retain_products(&live_ids);
            self.store.save_cart(session, &cart).await?;
            return Err(CheckoutError::ProductsUnavailable(missing));
        }

        let mut shortages = Vec::new();
        let mut lines = Vec::new();
        for line in cart.lines() {
            // live.len() == ids.len() guarantees every line has a snapshot
            let Some(snapshot) = live.get(&line.product_id) else { continue };
            if snapshot.stock < line.quantity {
                shortages.push(StockShortage {
                    name: snapshot.name.clone(),
                    available: snapshot.stock,
                });
                continue;
            }
            lines.push(OrderLineInput {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: snapshot.price,
            });
        }
        if !shortages.is_empty() {
            return Err(CheckoutError::OutOfStock(shortages));
        }

        let delivery_charge = self
            .delivery_charges()
            .await
            .charge(contact.location_type);
        let order = Order::place(
            contact.customer_name.trim(),
            phone,
            contact.address.trim(),
            contact.location_type,
            lines,
            delivery_charge,
        )
        .map_err(|err| CheckoutError::InvalidCartLine(err.to_string()))?;

        Ok(ValidatedCheckout {
            checkout: self,
            session: session.to_string(),
            order,
            delivery_charge,
        })
    }

    /// Full flow: validate then submit.
    pub async fn place_order(
        &self,
        session: &str,
        contact: &ContactInfo,
    ) -> Result<OrderReceipt, CheckoutError> {
        self.validate(session, contact).await?.submit().await
    }
}

/// A checkout that has passed `Validating` and holds the priced order.
pub struct ValidatedCheckout<'a, S> {
    checkout: &'a Checkout<S>,
    session: String,
    order: Order,
    delivery_charge: Decimal,
}

impl<S> ValidatedCheckout<'_, S>
where
    S: CatalogStore + CartStore + OrderStore + DeliveryChargeStore,
{
    pub fn order(&self) -> &Order { &self.order }

    /// `Submitting`: order insert, then item inserts. A failed item insert
    /// deletes the just-created order row so no partial order stays visible;
    /// the cart is only cleared once both inserts succeeded.
    pub async fn submit(self) -> Result<OrderReceipt, CheckoutError> {
        let store = &self.checkout.store;
        store
            .insert_order(&self.order)
            .await
            .map_err(CheckoutError::OrderCreateFailed)?;

        if let Err(err) = store.insert_items(self.order.items()).await {
            if let Err(delete_err) = store.delete_order(self.order.id()).await {
                tracing::error!(
                    order_id = %self.order.id(),
                    error = %delete_err,
                    "compensating order delete failed, orphan order row remains"
                );
            }
            return Err(CheckoutError::OrderItemsInsertFailed(err));
        }

        // The order is committed; a cart that fails to clear is stale but
        // recoverable, so this does not fail the checkout.
        if let Err(err) = store.clear_cart(&self.session).await {
            tracing::warn!(session = %self.session, error = %err, "cart clear after checkout failed");
        }

        tracing::info!(order_id = %self.order.id(), total = %self.order.total_amount(), "order placed");
        Ok(OrderReceipt {
            order_id: self.order.id(),
            total_amount: self.order.total_amount(),
            delivery_charge: self.delivery_charge,
        })
    }
}

fn check_cart_shape(cart: &Cart) -> Result<(), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::InvalidCartLine("cart is empty".into()));
    }
    for line in cart.lines() {
        if line.product_id.is_nil() || line.name.trim().is_empty() {
            return Err(CheckoutError::InvalidCartLine(
                "cart line is missing product identity".into(),
            ));
        }
        if line.quantity == 0 {
            return Err(CheckoutError::InvalidCartLine(format!(
                "{}: quantity must be positive",
                line.name
            )));
        }
        if line.price <= Decimal::ZERO {
            return Err(CheckoutError::InvalidCartLine(format!(
                "{}: price must be positive",
                line.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
