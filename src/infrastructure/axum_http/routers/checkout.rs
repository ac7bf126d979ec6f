use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::usecases::{
        carts::CartUseCase,
        checkout::{CheckoutError, CheckoutUseCase},
        confirmation::{PollerSettings, Sleeper, TokioSleeper},
        order_intake::OrderIntakeUseCase,
        payment_dispatch::PaymentDispatchUseCase,
        settlement::{SettlementNotifier, SettlementUseCase, TracingNotifier},
    },
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{
            carts::CartRepository, catalog::CatalogRepository, orders::OrderRepository,
            payment_attempts::PaymentAttemptRepository,
            payment_intents::PaymentIntentRepository,
        },
        value_objects::{enums::payment_methods::PaymentMethod, orders::BuyerInfo},
    },
    infrastructure::{
        axum_http::cart_owner,
        payments::GatewayRegistry,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                carts::CartPostgres, catalog::CatalogPostgres, orders::OrderPostgres,
                payment_attempts::PaymentAttemptPostgres, payment_intents::PaymentIntentPostgres,
            },
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let cart_repository = Arc::new(CartPostgres::new(Arc::clone(&db_pool)));
    let order_repository = Arc::new(OrderPostgres::new(Arc::clone(&db_pool)));
    let catalog_repository = Arc::new(CatalogPostgres::new(Arc::clone(&db_pool)));
    let intent_repository = Arc::new(PaymentIntentPostgres::new(Arc::clone(&db_pool)));
    let attempt_repository = Arc::new(PaymentAttemptPostgres::new(Arc::clone(&db_pool)));

    let gateways = Arc::new(GatewayRegistry::from_config(&config.payment_provider));
    let settlement = Arc::new(SettlementUseCase::new(
        Arc::clone(&order_repository),
        Arc::clone(&cart_repository),
        Arc::new(TracingNotifier),
    ));

    let checkout_usecase = CheckoutUseCase::new(
        Arc::new(CartUseCase::new(Arc::clone(&cart_repository))),
        Arc::new(OrderIntakeUseCase::new(
            Arc::clone(&order_repository),
            Arc::clone(&catalog_repository),
        )),
        Arc::new(PaymentDispatchUseCase::new(
            Arc::clone(&intent_repository),
            Arc::clone(&gateways),
        )),
        settlement,
        order_repository,
        intent_repository,
        attempt_repository,
        gateways,
        Arc::new(TokioSleeper),
        PollerSettings {
            interval: Duration::from_secs(config.poller.interval_secs),
            max_attempts: config.poller.max_attempts,
        },
    );

    Router::new()
        .route("/", post(submit))
        .route("/orders/:order_id/pay", post(retry_payment))
        .route("/orders/:order_id/status", get(order_status))
        .with_state(Arc::new(checkout_usecase))
}

#[derive(Debug, Deserialize)]
pub struct SubmitCheckoutRequest {
    pub seller_id: Uuid,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct RetryPaymentRequest {
    pub payment_method: PaymentMethod,
}

pub async fn submit<C, O, K, I, A, N, Z>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<C, O, K, I, A, N, Z>>>,
    jar: CookieJar,
    Json(request): Json<SubmitCheckoutRequest>,
) -> Result<impl IntoResponse, CheckoutError>
where
    C: CartRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    K: CatalogRepository + Send + Sync + 'static,
    I: PaymentIntentRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    N: SettlementNotifier + 'static,
    Z: Sleeper + 'static,
{
    let (jar, owner_id) = cart_owner::ensure_owner(jar);
    let buyer = BuyerInfo {
        name: request.buyer_name,
        phone: request.buyer_phone,
    };
    let receipt = checkout_usecase
        .submit(owner_id, request.seller_id, buyer, request.payment_method)
        .await?;

    Ok((StatusCode::CREATED, jar, Json(receipt)))
}

pub async fn retry_payment<C, O, K, I, A, N, Z>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<C, O, K, I, A, N, Z>>>,
    jar: CookieJar,
    Path(order_id): Path<Uuid>,
    Json(request): Json<RetryPaymentRequest>,
) -> Result<impl IntoResponse, CheckoutError>
where
    C: CartRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    K: CatalogRepository + Send + Sync + 'static,
    I: PaymentIntentRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    N: SettlementNotifier + 'static,
    Z: Sleeper + 'static,
{
    let (jar, owner_id) = cart_owner::ensure_owner(jar);
    let receipt = checkout_usecase
        .retry_payment(owner_id, order_id, request.payment_method)
        .await?;

    Ok((jar, Json(receipt)))
}

pub async fn order_status<C, O, K, I, A, N, Z>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<C, O, K, I, A, N, Z>>>,
    jar: CookieJar,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, CheckoutError>
where
    C: CartRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    K: CatalogRepository + Send + Sync + 'static,
    I: PaymentIntentRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    N: SettlementNotifier + 'static,
    Z: Sleeper + 'static,
{
    let owner_id = cart_owner::existing_owner(&jar);
    let status = checkout_usecase.order_status(owner_id, order_id).await?;

    Ok(Json(status))
}
