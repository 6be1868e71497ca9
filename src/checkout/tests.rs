use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartLine, Order, OrderItem, Product};
use crate::domain::value_objects::LocationType;
use crate::storage::{
    CartStore, CatalogStore, DeliveryChargeStore, OrderStore, ProductSnapshot, StorageError,
};

use super::{Checkout, CheckoutError, ContactInfo};

#[derive(Default)]
struct FakeStore {
    snapshots: Mutex<Vec<ProductSnapshot>>,
    carts: Mutex<HashMap<String, Cart>>,
    orders: Mutex<Vec<(Uuid, Decimal, &'static str)>>,
    items: Mutex<Vec<OrderItem>>,
    overrides: Mutex<Vec<(LocationType, Decimal)>>,
    fail_item_insert: AtomicBool,
    fail_overrides: AtomicBool,
}

#[async_trait]
impl CatalogStore for FakeStore {
    async fn list_products(&self) -> Result<Vec<Product>, StorageError> {
        Ok(vec![])
    }

    async fn product(&self, _id: Uuid) -> Result<Option<Product>, StorageError> {
        Ok(None)
    }

    async fn snapshots(&self, ids: &[Uuid]) -> Result<Vec<ProductSnapshot>, StorageError> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CartStore for FakeStore {
    async fn load_cart(&self, session: &str) -> Result<Cart, StorageError> {
        Ok(self.carts.lock().unwrap().get(session).cloned().unwrap_or_default())
    }

    async fn save_cart(&self, session: &str, cart: &Cart) -> Result<(), StorageError> {
        self.carts.lock().unwrap().insert(session.to_string(), cart.clone());
        Ok(())
    }

    async fn clear_cart(&self, session: &str) -> Result<(), StorageError> {
        self.carts.lock().unwrap().remove(session);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for FakeStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StorageError> {
        self.orders.lock().unwrap().push((
            order.id(),
            order.total_amount(),
            order.status().as_str(),
        ));
        Ok(())
    }

    async fn insert_items(&self, items: &[OrderItem]) -> Result<(), StorageError> {
        if self.fail_item_insert.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("connection reset".into()));
        }
        self.items.lock().unwrap().extend_from_slice(items);
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> Result<(), StorageError> {
        self.orders.lock().unwrap().retain(|(id, _, _)| *id != order_id);
        self.items.lock().unwrap().retain(|i| i.order_id != order_id);
        Ok(())
    }
}

#[async_trait]
impl DeliveryChargeStore for FakeStore {
    async fn delivery_overrides(&self) -> Result<Vec<(LocationType, Decimal)>, StorageError> {
        if self.fail_overrides.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("timeout".into()));
        }
        Ok(self.overrides.lock().unwrap().clone())
    }
}

fn snapshot(id: Uuid, name: &str, stock: u32, price: i64) -> ProductSnapshot {
    ProductSnapshot { id, name: name.into(), stock, price: Decimal::new(price, 2) }
}

fn line(id: Uuid, name: &str, price: i64, quantity: u32) -> CartLine {
    CartLine {
        product_id: id,
        name: name.into(),
        price: Decimal::new(price, 2),
        quantity,
        thumbnail: None,
    }
}

fn contact() -> ContactInfo {
    ContactInfo {
        customer_name: "Karim".into(),
        phone: "+880 171-234567".into(),
        address: "12 Lake Road, Dhanmondi".into(),
        location_type: LocationType::Inside,
    }
}

fn store_with_cart(lines: Vec<CartLine>, snapshots: Vec<ProductSnapshot>) -> Arc<FakeStore> {
    let store = Arc::new(FakeStore::default());
    let mut cart = Cart::new();
    for l in lines {
        cart.add_line(l);
    }
    store.carts.lock().unwrap().insert("s1".into(), cart);
    *store.snapshots.lock().unwrap() = snapshots;
    store
}

#[tokio::test]
async fn out_of_stock_names_only_short_lines_and_keeps_cart() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let store = store_with_cart(
        vec![line(a, "Desk", 10000, 3), line(b, "Lamp", 4500, 3)],
        vec![snapshot(a, "Desk", 5, 10000), snapshot(b, "Lamp", 2, 4500)],
    );
    let checkout = Checkout::new(store.clone());

    let err = checkout.place_order("s1", &contact()).await.unwrap_err();
    match err {
        CheckoutError::OutOfStock(shortages) => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].name, "Lamp");
            assert_eq!(shortages[0].available, 2);
        }
        other => panic!("expected OutOfStock, got {other:?}"),
    }

    // cart untouched for manual adjustment
    let cart = store.carts.lock().unwrap().get("s1").cloned().unwrap();
    assert_eq!(cart.line_count(), 2);
    assert_eq!(cart.lines()[1].quantity, 3);
    assert!(store.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn vanished_product_rejects_and_self_heals_cart() {
    let a = Uuid::new_v4();
    let ghost = Uuid::new_v4();
    let store = store_with_cart(
        vec![line(a, "Desk", 10000, 1), line(ghost, "Old Stool", 2000, 2)],
        vec![snapshot(a, "Desk", 5, 10000)],
    );
    let checkout = Checkout::new(store.clone());

    let err = checkout.place_order("s1", &contact()).await.unwrap_err();
    match err {
        CheckoutError::ProductsUnavailable(names) => {
            assert_eq!(names, vec!["Old Stool".to_string()]);
        }
        other => panic!("expected ProductsUnavailable, got {other:?}"),
    }

    // the stale line is gone, so a retry is immediately possible
    let cart = store.carts.lock().unwrap().get("s1").cloned().unwrap();
    assert_eq!(cart.product_ids(), vec![a]);

    let receipt = checkout.place_order("s1", &contact()).await.unwrap();
    assert_eq!(receipt.total_amount, Decimal::new(16000, 2)); // 100.00 + 60
}

#[tokio::test]
async fn failed_item_insert_deletes_order_and_keeps_cart() {
    let a = Uuid::new_v4();
    let store = store_with_cart(
        vec![line(a, "Desk", 10000, 1)],
        vec![snapshot(a, "Desk", 5, 10000)],
    );
    store.fail_item_insert.store(true, Ordering::SeqCst);
    let checkout = Checkout::new(store.clone());

    let err = checkout.place_order("s1", &contact()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::OrderItemsInsertFailed(_)));

    // compensating delete left no partial order behind
    assert!(store.orders.lock().unwrap().is_empty());
    assert!(store.items.lock().unwrap().is_empty());
    let cart = store.carts.lock().unwrap().get("s1").cloned().unwrap();
    assert_eq!(cart.line_count(), 1);
}

#[tokio::test]
async fn successful_checkout_uses_live_prices_and_clears_cart() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    // cart snapshot price for Desk is stale (90.00); live price is 100.00
    let store = store_with_cart(
        vec![line(a, "Desk", 9000, 2), line(b, "Lamp", 4500, 1)],
        vec![snapshot(a, "Desk", 5, 10000), snapshot(b, "Lamp", 2, 4500)],
    );
    let mut c = contact();
    c.location_type = LocationType::Outside;
    let checkout = Checkout::new(store.clone());

    let receipt = checkout.place_order("s1", &c).await.unwrap();
    // 2 * 100.00 + 45.00 + 120 = 365.00
    assert_eq!(receipt.total_amount, Decimal::new(36500, 2));
    assert_eq!(receipt.delivery_charge, Decimal::from(120));

    let orders = store.orders.lock().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].0, receipt.order_id);
    assert_eq!(orders[0].2, "pending");
    let items = store.items.lock().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.order_id == receipt.order_id));

    assert!(store.carts.lock().unwrap().get("s1").is_none());
}

#[tokio::test]
async fn validate_exposes_priced_order_before_submit() {
    let a = Uuid::new_v4();
    let store = store_with_cart(
        vec![line(a, "Desk", 10000, 2)],
        vec![snapshot(a, "Desk", 5, 10000)],
    );
    let checkout = Checkout::new(store.clone());

    let validated = checkout.validate("s1", &contact()).await.unwrap();
    assert_eq!(validated.order().items().len(), 1);
    assert_eq!(validated.order().total_amount(), Decimal::new(26000, 2)); // 200.00 + 60
    let order_id = validated.order().id();

    // nothing was written during validation
    assert!(store.orders.lock().unwrap().is_empty());

    let receipt = validated.submit().await.unwrap();
    assert_eq!(receipt.order_id, order_id);
    assert_eq!(store.orders.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_cart_and_bad_lines_are_invalid() {
    let store = Arc::new(FakeStore::default());
    let checkout = Checkout::new(store.clone());
    let err = checkout.place_order("s1", &contact()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidCartLine(_)));

    let a = Uuid::new_v4();
    let store = store_with_cart(
        vec![line(a, "Freebie", 0, 1)],
        vec![snapshot(a, "Freebie", 5, 0)],
    );
    let checkout = Checkout::new(store);
    let err = checkout.place_order("s1", &contact()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidCartLine(_)));
}

#[tokio::test]
async fn blank_or_malformed_contact_fields_are_rejected() {
    let a = Uuid::new_v4();
    let store = store_with_cart(
        vec![line(a, "Desk", 10000, 1)],
        vec![snapshot(a, "Desk", 5, 10000)],
    );
    let checkout = Checkout::new(store.clone());

    let mut c = contact();
    c.customer_name = "   ".into();
    let err = checkout.place_order("s1", &c).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidContactInfo(_)));

    let mut c = contact();
    c.phone = "call me maybe".into();
    let err = checkout.place_order("s1", &c).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidContactInfo(_)));

    // rejections left the cart alone
    let cart = store.carts.lock().unwrap().get("s1").cloned().unwrap();
    assert_eq!(cart.line_count(), 1);
}

#[tokio::test]
async fn delivery_defaults_apply_without_overrides() {
    let store = Arc::new(FakeStore::default());
    let checkout = Checkout::new(store);
    let charges = checkout.delivery_charges().await;
    assert_eq!(charges.charge(LocationType::Inside), Decimal::from(60));
    assert_eq!(charges.charge(LocationType::Outside), Decimal::from(120));
}

#[tokio::test]
async fn delivery_overrides_overwrite_their_location_only() {
    let store = Arc::new(FakeStore::default());
    store
        .overrides
        .lock()
        .unwrap()
        .push((LocationType::Inside, Decimal::from(80)));
    let checkout = Checkout::new(store);
    let charges = checkout.delivery_charges().await;
    assert_eq!(charges.charge(LocationType::Inside), Decimal::from(80));
    assert_eq!(charges.charge(LocationType::Outside), Decimal::from(120));
}

#[tokio::test]
async fn unreachable_delivery_lookup_falls_back_silently() {
    let store = Arc::new(FakeStore::default());
    store.fail_overrides.store(true, Ordering::SeqCst);
    let checkout = Checkout::new(store);
    let charges = checkout.delivery_charges().await;
    assert_eq!(charges, super::DeliveryCharges::default());
}
