//! Cart aggregate
//!
//! One session's line items. Prices and names are snapshots taken at
//! add-time; reconciliation against live stock happens at checkout, not
//! here. Single logical writer; persistence is the storage layer's concern.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

/// One product entry in the cart with its quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    /// Unit price snapshot at add-time.
    pub price: Decimal,
    pub quantity: u32,
    pub thumbnail: Option<String>,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal { self.price * Decimal::from(self.quantity) }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn line_count(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn product_ids(&self) -> Vec<Uuid> { self.lines.iter().map(|l| l.product_id).collect() }

    /// Exact sum of `price * quantity`; rounding happens only at order
    /// submission.
    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Adds a line. A line for the same product merges by incrementing
    /// quantity; first-insertion order is preserved otherwise.
    pub fn add_line(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.product_id == line.product_id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
    }

    /// Sets a line's quantity; zero removes the line. Stock limits are not
    /// enforced here (the checkout reconciler owns that at submission time).
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        if !self.lines.iter().any(|l| l.product_id == product_id) {
            return Err(CartError::LineNotFound);
        }
        if quantity == 0 {
            self.lines.retain(|l| l.product_id != product_id);
        } else if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    pub fn remove_line(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before {
            return Err(CartError::LineNotFound);
        }
        Ok(())
    }

    /// Drops every line whose product id is not in `live_ids`, returning the
    /// names of the removed lines. Used by the checkout reconciler to
    /// self-heal carts referencing vanished products.
    pub fn retain_products(&mut self, live_ids: &[Uuid]) -> Vec<String> {
        let mut removed = Vec::new();
        self.lines.retain(|l| {
            if live_ids.contains(&l.product_id) {
                true
            } else {
                removed.push(l.name.clone());
                false
            }
        });
        removed
    }

    pub fn clear(&mut self) { self.lines.clear(); }
}

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("cart line not found")]
    LineNotFound,
}
