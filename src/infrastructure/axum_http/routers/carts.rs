use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::usecases::{carts::CartUseCase, checkout::CheckoutError},
    domain::{repositories::carts::CartRepository, value_objects::carts::NewCartItem},
    infrastructure::{
        axum_http::cart_owner,
        postgres::{postgres_connection::PgPoolSquad, repositories::carts::CartPostgres},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let cart_repository = CartPostgres::new(Arc::clone(&db_pool));
    let cart_usecase = CartUseCase::new(Arc::new(cart_repository));

    Router::new()
        .route("/", get(view_cart))
        .route("/items", post(add_item))
        .route("/items/:item_id", patch(update_quantity).delete(remove_item))
        .with_state(Arc::new(cart_usecase))
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub currency: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

pub async fn view_cart<C>(
    State(cart_usecase): State<Arc<CartUseCase<C>>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, CheckoutError>
where
    C: CartRepository + Send + Sync,
{
    let (jar, owner_id) = cart_owner::ensure_owner(jar);
    let baskets = cart_usecase
        .items_by_seller(owner_id)
        .await
        .map_err(CheckoutError::Internal)?;

    Ok((jar, Json(baskets)))
}

pub async fn add_item<C>(
    State(cart_usecase): State<Arc<CartUseCase<C>>>,
    jar: CookieJar,
    Json(request): Json<AddCartItemRequest>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
{
    let (jar, owner_id) = cart_owner::ensure_owner(jar);
    let item = NewCartItem {
        seller_id: request.seller_id,
        product_id: request.product_id,
        product_name: request.product_name,
        unit_price_minor: request.unit_price_minor,
        currency: request.currency,
    };
    let snapshot = cart_usecase.add_item(owner_id, item, request.quantity).await;

    (StatusCode::CREATED, jar, Json(snapshot))
}

pub async fn update_quantity<C>(
    State(cart_usecase): State<Arc<CartUseCase<C>>>,
    jar: CookieJar,
    Path(item_id): Path<Uuid>,
    Json(request): Json<UpdateQuantityRequest>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
{
    let (jar, owner_id) = cart_owner::ensure_owner(jar);
    let snapshot = cart_usecase
        .update_quantity(owner_id, item_id, request.quantity)
        .await;

    (jar, Json(snapshot))
}

pub async fn remove_item<C>(
    State(cart_usecase): State<Arc<CartUseCase<C>>>,
    jar: CookieJar,
    Path(item_id): Path<Uuid>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync,
{
    let (jar, owner_id) = cart_owner::ensure_owner(jar);
    let snapshot = cart_usecase.remove_item(owner_id, item_id).await;

    (jar, Json(snapshot))
}
