//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartError, CartLine};
pub use order::{Order, OrderError, OrderItem, OrderLineInput, OrderStatus};
pub use product::{normalize_media, MediaKind, MediaUrl, Product, RawProduct, DEFAULT_PRIORITY};
