//! Storefront - catalog, cart and checkout service

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{header, HeaderMap, StatusCode}, routing::{get, post, put}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use storefront::analytics::Analytics;
use storefront::checkout::{Checkout, CheckoutError, ContactInfo};
use storefront::domain::aggregates::{Cart, CartLine, Product};
use storefront::domain::events::StorefrontEvent;
use storefront::domain::listing::{self, CatalogPage, SortKey};
use storefront::domain::value_objects::LocationType;
use storefront::storage::postgres::PgStorefront;
use storefront::storage::{ActivityRecord, ActivityStore, CartStore, CatalogStore, StorageError};

#[derive(Clone)]
struct AppState {
    store: Arc<PgStorefront>,
    checkout: Arc<Checkout<PgStorefront>>,
    analytics: Analytics,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let nats = match std::env::var("NATS_URL").ok() {
        Some(url) => async_nats::connect(&url).await.ok(),
        None => None,
    };
    let store = Arc::new(PgStorefront::new(db));
    let analytics = Analytics::new(nats, Some(store.clone() as Arc<dyn ActivityStore>));
    let state = AppState { store: store.clone(), checkout: Arc::new(Checkout::new(store)), analytics };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/cart/:session", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items/:product_id", put(update_cart_line).delete(remove_cart_line))
        .route("/api/v1/delivery-charges", get(delivery_charges))
        .route("/api/v1/checkout/:session", post(place_order))
        .route("/api/v1/track", post(track))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

fn internal(err: StorageError) -> (StatusCode, String) { (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()) }

#[derive(Debug, Deserialize)] struct ListParams { search: Option<String>, sort: Option<SortKey>, page: Option<usize> }

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<CatalogPage>, (StatusCode, String)> {
    let products = s.store.list_products().await.map_err(internal)?;
    let query = p.search.unwrap_or_default();
    let page = listing::view(&products, &query, p.sort.unwrap_or_default(), p.page.unwrap_or(1).max(1));
    if !query.trim().is_empty() {
        s.analytics.emit(None, StorefrontEvent::SearchSubmitted { query: query.trim().to_string() });
    }
    Ok(Json(page))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>, (StatusCode, String)> {
    let product = s.store.product(id).await.map_err(internal)?.ok_or((StatusCode::NOT_FOUND, "product not found".to_string()))?;
    s.analytics.emit(None, StorefrontEvent::ProductViewed { product_id: product.id, name: product.name.clone() });
    Ok(Json(product))
}

#[derive(Debug, Serialize)] struct CartView { lines: Vec<CartLine>, total_price: Decimal }

fn cart_view(cart: Cart) -> CartView { CartView { total_price: cart.total_price(), lines: cart.lines().to_vec() } }

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>, (StatusCode, String)> {
    let cart = s.store.load_cart(&session).await.map_err(internal)?;
    Ok(Json(cart_view(cart)))
}

#[derive(Debug, Deserialize)] struct AddLineRequest { product_id: Uuid, #[serde(default = "default_quantity")] quantity: u32 }
fn default_quantity() -> u32 { 1 }

async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddLineRequest>) -> Result<(StatusCode, Json<CartView>), (StatusCode, String)> {
    if r.quantity == 0 { return Err((StatusCode::BAD_REQUEST, "quantity must be positive".to_string())); }
    let product = s.store.product(r.product_id).await.map_err(internal)?.ok_or((StatusCode::NOT_FOUND, "product not found".to_string()))?;
    let mut cart = s.store.load_cart(&session).await.map_err(internal)?;
    cart.add_line(CartLine {
        product_id: product.id,
        name: product.name.clone(),
        price: product.price,
        quantity: r.quantity,
        thumbnail: product.cart_thumbnail().map(str::to_string),
    });
    s.store.save_cart(&session, &cart).await.map_err(internal)?;
    s.analytics.emit(Some(session), StorefrontEvent::AddedToCart { product_id: product.id, name: product.name, quantity: r.quantity });
    Ok((StatusCode::CREATED, Json(cart_view(cart))))
}

#[derive(Debug, Deserialize)] struct UpdateQuantityRequest { quantity: u32 }

async fn update_cart_line(State(s): State<AppState>, Path((session, product_id)): Path<(String, Uuid)>, Json(r): Json<UpdateQuantityRequest>) -> Result<Json<CartView>, (StatusCode, String)> {
    let mut cart = s.store.load_cart(&session).await.map_err(internal)?;
    cart.update_quantity(product_id, r.quantity).map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;
    s.store.save_cart(&session, &cart).await.map_err(internal)?;
    Ok(Json(cart_view(cart)))
}

async fn remove_cart_line(State(s): State<AppState>, Path((session, product_id)): Path<(String, Uuid)>) -> Result<Json<CartView>, (StatusCode, String)> {
    let mut cart = s.store.load_cart(&session).await.map_err(internal)?;
    cart.remove_line(product_id).map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;
    s.store.save_cart(&session, &cart).await.map_err(internal)?;
    Ok(Json(cart_view(cart)))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    s.store.clear_cart(&session).await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delivery_charges(State(s): State<AppState>) -> Json<serde_json::Value> {
    let charges = s.checkout.delivery_charges().await;
    Json(serde_json::json!({
        "inside": charges.charge(LocationType::Inside),
        "outside": charges.charge(LocationType::Outside),
    }))
}

async fn place_order(State(s): State<AppState>, Path(session): Path<String>, Json(contact): Json<ContactInfo>) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    match s.checkout.place_order(&session, &contact).await {
        Ok(receipt) => {
            s.analytics.emit(Some(session), StorefrontEvent::OrderPlaced { order_id: receipt.order_id, total_amount: receipt.total_amount });
            Ok((StatusCode::CREATED, Json(serde_json::json!({
                "order_id": receipt.order_id,
                "total_amount": receipt.total_amount,
                "delivery_charge": receipt.delivery_charge,
                "status": "pending",
            }))))
        }
        Err(err) => Err((checkout_status(&err), err.to_string())),
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::InvalidCartLine(_) | CheckoutError::InvalidContactInfo(_) => StatusCode::BAD_REQUEST,
        CheckoutError::ProductsUnavailable(_) | CheckoutError::OutOfStock(_) => StatusCode::CONFLICT,
        CheckoutError::OrderCreateFailed(_) | CheckoutError::OrderItemsInsertFailed(_) | CheckoutError::Storage(_) => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Debug, Deserialize)]
struct TrackRequest {
    session_id: Option<String>,
    activity_type: String,
    page_path: Option<String>,
    product_id: Option<Uuid>,
    product_name: Option<String>,
    metadata: Option<serde_json::Value>,
}

async fn track(State(s): State<AppState>, headers: HeaderMap, Json(r): Json<TrackRequest>) -> StatusCode {
    s.analytics.track(ActivityRecord {
        session_id: r.session_id,
        user_agent: headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()).map(String::from),
        ip_address: None,
        activity_type: r.activity_type,
        page_path: r.page_path,
        product_id: r.product_id,
        product_name: r.product_name,
        metadata: r.metadata,
    });
    StatusCode::ACCEPTED
}
