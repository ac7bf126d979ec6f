use std::sync::Arc;

use anyhow::anyhow;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::orders::{OrderEntity, OrderItemEntity},
    repositories::{
        carts::CartRepository, catalog::CatalogRepository, orders::OrderRepository,
        payment_attempts::PaymentAttemptRepository, payment_intents::PaymentIntentRepository,
    },
    value_objects::{
        enums::{
            intent_statuses::IntentStatus, order_statuses::OrderStatus,
            payment_methods::PaymentMethod, payment_statuses::PaymentStatus,
            provider_statuses::ProviderStatus,
        },
        orders::{BuyerInfo, OrderLineModel, OrderModel},
        payments::{CheckoutReceiptDto, OrderPaymentStatusDto},
    },
};
use crate::infrastructure::payments::{GatewayRegistry, gateway::GatewayError};

use super::{
    carts::CartUseCase,
    confirmation::{CancelHandle, ConfirmationPoller, PollerSettings, Sleeper},
    order_intake::{OrderIntakeUseCase, submission_key},
    payment_dispatch::{DispatchedIntent, PaymentDispatchUseCase},
    settlement::{SettlementNotifier, SettlementOutcome, SettlementUseCase},
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("the cart has no items for this seller")]
    EmptyBasket,
    #[error("a buyer phone number is required")]
    MissingBuyerContact,
    #[error("cart items for this seller use more than one currency")]
    MixedCurrencies,
    #[error("product {product_id} is no longer available")]
    ItemUnavailable { product_id: Uuid },
    #[error("payment was declined: {0}")]
    ProviderRejected(String),
    #[error("order not found")]
    OrderNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::EmptyBasket
            | CheckoutError::MissingBuyerContact
            | CheckoutError::MixedCurrencies => 400,
            CheckoutError::ItemUnavailable { .. } => 409,
            CheckoutError::ProviderRejected(_) => 402,
            CheckoutError::OrderNotFound => 404,
            CheckoutError::Internal(_) => 500,
        }
    }
}

/// Front door of the pipeline: places the order, dispatches payment and
/// hands confirmation to a background poller. The status read doubles as
/// the reconciliation path for polls that died with the process.
pub struct CheckoutUseCase<C, O, K, I, A, N, Z>
where
    C: CartRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    K: CatalogRepository + Send + Sync + 'static,
    I: PaymentIntentRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    N: SettlementNotifier + 'static,
    Z: Sleeper + 'static,
{
    cart_usecase: Arc<CartUseCase<C>>,
    order_intake: Arc<OrderIntakeUseCase<O, K>>,
    dispatcher: Arc<PaymentDispatchUseCase<I>>,
    settlement: Arc<SettlementUseCase<O, C, N>>,
    order_repo: Arc<O>,
    intent_repo: Arc<I>,
    attempt_repo: Arc<A>,
    gateways: Arc<GatewayRegistry>,
    sleeper: Arc<Z>,
    poller_settings: PollerSettings,
}

impl<C, O, K, I, A, N, Z> CheckoutUseCase<C, O, K, I, A, N, Z>
where
    C: CartRepository + Send + Sync + 'static,
    O: OrderRepository + Send + Sync + 'static,
    K: CatalogRepository + Send + Sync + 'static,
    I: PaymentIntentRepository + Send + Sync + 'static,
    A: PaymentAttemptRepository + Send + Sync + 'static,
    N: SettlementNotifier + 'static,
    Z: Sleeper + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cart_usecase: Arc<CartUseCase<C>>,
        order_intake: Arc<OrderIntakeUseCase<O, K>>,
        dispatcher: Arc<PaymentDispatchUseCase<I>>,
        settlement: Arc<SettlementUseCase<O, C, N>>,
        order_repo: Arc<O>,
        intent_repo: Arc<I>,
        attempt_repo: Arc<A>,
        gateways: Arc<GatewayRegistry>,
        sleeper: Arc<Z>,
        poller_settings: PollerSettings,
    ) -> Self {
        Self {
            cart_usecase,
            order_intake,
            dispatcher,
            settlement,
            order_repo,
            intent_repo,
            attempt_repo,
            gateways,
            sleeper,
            poller_settings,
        }
    }

    /// Checks out the owner's basket for one seller. Returns once the
    /// provider has acknowledged the payment request; confirmation runs in
    /// the background and lands through the idempotent settlement path.
    pub async fn submit(
        &self,
        owner_id: Uuid,
        seller_id: Uuid,
        buyer: BuyerInfo,
        method: PaymentMethod,
    ) -> Result<CheckoutReceiptDto, CheckoutError> {
        let basket = self
            .cart_usecase
            .seller_basket(owner_id, seller_id)
            .await
            .map_err(CheckoutError::Internal)?
            .ok_or(CheckoutError::EmptyBasket)?;

        // A replay of the same logical submission must not create a
        // sibling order; it converges on the one already placed.
        let key = submission_key(owner_id, &basket);
        if let Some(existing) = self
            .order_repo
            .find_by_submission_key(key.clone())
            .await
            .map_err(CheckoutError::Internal)?
        {
            info!(
                order_id = %existing.id,
                "checkout: duplicate submission converging on existing order"
            );
            let items = self
                .order_repo
                .find_order_items(existing.id)
                .await
                .map_err(CheckoutError::Internal)?;
            let order = order_model(existing, items).map_err(CheckoutError::Internal)?;
            return self.dispatch_and_confirm(&order, owner_id, method).await;
        }

        let order = self.order_intake.create_order(&basket, buyer, key).await?;
        self.dispatch_and_confirm(&order, owner_id, method).await
    }

    /// Re-submits payment for an already placed order, e.g. after a failed
    /// or expired attempt. An active intent is returned as-is so replays
    /// converge on the same ids instead of charging twice.
    pub async fn retry_payment(
        &self,
        owner_id: Uuid,
        order_id: Uuid,
        method: PaymentMethod,
    ) -> Result<CheckoutReceiptDto, CheckoutError> {
        let order = self
            .order_repo
            .find_order(order_id)
            .await
            .map_err(CheckoutError::Internal)?
            .ok_or(CheckoutError::OrderNotFound)?;

        if PaymentStatus::from_str(&order.payment_status) == Some(PaymentStatus::Paid) {
            let intent = self
                .intent_repo
                .find_latest_by_order(order_id)
                .await
                .map_err(CheckoutError::Internal)?
                .ok_or_else(|| anyhow!("paid order {order_id} has no payment intent"))?;
            return Ok(CheckoutReceiptDto {
                order_id,
                payment_intent_id: intent.id,
                provider_reference: intent.provider_reference,
            });
        }

        let items = self
            .order_repo
            .find_order_items(order_id)
            .await
            .map_err(CheckoutError::Internal)?;
        let order = order_model(order, items).map_err(CheckoutError::Internal)?;
        self.dispatch_and_confirm(&order, owner_id, method).await
    }

    async fn dispatch_and_confirm(
        &self,
        order: &OrderModel,
        owner_id: Uuid,
        method: PaymentMethod,
    ) -> Result<CheckoutReceiptDto, CheckoutError> {
        let DispatchedIntent {
            intent,
            newly_dispatched,
        } = self.dispatcher.initiate(order, method).await?;

        if newly_dispatched {
            self.order_repo
                .set_payment_status(order.id, PaymentStatus::Pending)
                .await
                .map_err(CheckoutError::Internal)?;
            if intent.provider_reference.is_some() {
                self.spawn_confirmation(intent.clone(), order.seller_id, owner_id, method);
            }
        }

        Ok(CheckoutReceiptDto {
            order_id: order.id,
            payment_intent_id: intent.id,
            provider_reference: intent.provider_reference,
        })
    }

    fn spawn_confirmation(
        &self,
        intent: crate::domain::entities::payment_intents::PaymentIntentEntity,
        seller_id: Uuid,
        owner_id: Uuid,
        method: PaymentMethod,
    ) {
        let poller = ConfirmationPoller::new(
            Arc::clone(&self.intent_repo),
            Arc::clone(&self.attempt_repo),
            Arc::clone(&self.settlement),
            self.gateways.for_method(method),
            Arc::clone(&self.sleeper),
            self.poller_settings.clone(),
            CancelHandle::default(),
        );
        tokio::spawn(async move {
            if let Err(err) = poller.run(&intent, seller_id, Some(owner_id)).await {
                error!(
                    order_id = %intent.order_id,
                    intent_id = %intent.id,
                    poll_error = ?err,
                    "checkout: confirmation polling aborted"
                );
            }
        });
    }

    /// Read-only order view for the buyer. When the process lost the
    /// background poll, a single provider check here brings the order back
    /// in sync through the same idempotent settlement.
    pub async fn order_status(
        &self,
        owner_id: Option<Uuid>,
        order_id: Uuid,
    ) -> Result<OrderPaymentStatusDto, CheckoutError> {
        let order = self
            .order_repo
            .find_order(order_id)
            .await
            .map_err(CheckoutError::Internal)?
            .ok_or(CheckoutError::OrderNotFound)?;
        let mut payment_status = PaymentStatus::from_str(&order.payment_status)
            .ok_or_else(|| anyhow!("order {order_id} has unknown payment status"))
            .map_err(CheckoutError::Internal)?;

        let intent = self
            .intent_repo
            .find_latest_by_order(order_id)
            .await
            .map_err(CheckoutError::Internal)?;
        let mut intent_status = match &intent {
            Some(intent) => Some(
                IntentStatus::from_str(&intent.status)
                    .ok_or_else(|| anyhow!("intent {} has unknown status", intent.id))
                    .map_err(CheckoutError::Internal)?,
            ),
            None => None,
        };
        let provider_reference = intent
            .as_ref()
            .and_then(|intent| intent.provider_reference.clone());

        let needs_reconciliation = payment_status != PaymentStatus::Paid
            && intent_status.is_some_and(|status| !status.is_terminal())
            && provider_reference.is_some();

        if needs_reconciliation {
            if let Some(intent) = &intent {
                if let Some((reconciled_payment, reconciled_intent)) = self
                    .reconcile(intent, order.seller_id, owner_id)
                    .await?
                {
                    payment_status = reconciled_payment;
                    intent_status = Some(reconciled_intent);
                }
            }
        }

        Ok(OrderPaymentStatusDto {
            order_id,
            payment_status,
            intent_status,
            provider_reference,
        })
    }

    /// One-shot provider check for an intent whose poll never concluded.
    /// Returns the statuses to serve when the check was definitive.
    async fn reconcile(
        &self,
        intent: &crate::domain::entities::payment_intents::PaymentIntentEntity,
        seller_id: Uuid,
        owner_id: Option<Uuid>,
    ) -> Result<Option<(PaymentStatus, IntentStatus)>, CheckoutError> {
        let Some(method) = PaymentMethod::from_str(&intent.method) else {
            warn!(
                intent_id = %intent.id,
                method = %intent.method,
                "checkout: cannot reconcile intent with unknown payment method"
            );
            return Ok(None);
        };
        let Some(reference) = intent.provider_reference.as_deref() else {
            return Ok(None);
        };

        let gateway = self.gateways.for_method(method);
        match gateway.check_status(reference).await {
            Ok(ProviderStatus::Paid) => {
                self.settlement
                    .settle(intent.order_id, seller_id, owner_id, SettlementOutcome::Paid)
                    .await
                    .map_err(CheckoutError::Internal)?;
                self.intent_repo
                    .update_status(intent.id, IntentStatus::Succeeded, None)
                    .await
                    .map_err(CheckoutError::Internal)?;
                info!(
                    order_id = %intent.order_id,
                    "checkout: reconciliation found the payment settled at the provider"
                );
                Ok(Some((PaymentStatus::Paid, IntentStatus::Succeeded)))
            }
            Ok(ProviderStatus::Failed) => {
                self.settlement
                    .settle(
                        intent.order_id,
                        seller_id,
                        owner_id,
                        SettlementOutcome::Failed,
                    )
                    .await
                    .map_err(CheckoutError::Internal)?;
                self.intent_repo
                    .update_status(intent.id, IntentStatus::Failed, None)
                    .await
                    .map_err(CheckoutError::Internal)?;
                Ok(Some((PaymentStatus::Failed, IntentStatus::Failed)))
            }
            Err(GatewayError::Rejected(reason)) => {
                self.settlement
                    .settle(
                        intent.order_id,
                        seller_id,
                        owner_id,
                        SettlementOutcome::Failed,
                    )
                    .await
                    .map_err(CheckoutError::Internal)?;
                self.intent_repo
                    .update_status(intent.id, IntentStatus::Failed, Some(reason))
                    .await
                    .map_err(CheckoutError::Internal)?;
                Ok(Some((PaymentStatus::Failed, IntentStatus::Failed)))
            }
            Ok(ProviderStatus::Pending) => Ok(None),
            Err(GatewayError::Unreachable(reason)) => {
                // Serve the stored view; the next visit retries the check.
                warn!(
                    order_id = %intent.order_id,
                    reason = %reason,
                    "checkout: provider unreachable during reconciliation"
                );
                Ok(None)
            }
            Err(GatewayError::Internal(err)) => Err(CheckoutError::Internal(err)),
        }
    }
}

fn order_model(order: OrderEntity, items: Vec<OrderItemEntity>) -> anyhow::Result<OrderModel> {
    let status = OrderStatus::from_str(&order.status)
        .ok_or_else(|| anyhow!("order {} has unknown status {}", order.id, order.status))?;
    let payment_status = PaymentStatus::from_str(&order.payment_status).ok_or_else(|| {
        anyhow!(
            "order {} has unknown payment status {}",
            order.id,
            order.payment_status
        )
    })?;

    Ok(OrderModel {
        id: order.id,
        seller_id: order.seller_id,
        buyer: BuyerInfo {
            name: order.buyer_name,
            phone: order.buyer_phone,
        },
        currency: order.currency,
        total_minor: order.total_minor,
        status,
        payment_status,
        lines: items
            .into_iter()
            .map(|item| OrderLineModel {
                product_id: item.product_id,
                product_name: item.product_name,
                unit_price_minor: item.unit_price_minor,
                quantity: item.quantity,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::usecases::payment_dispatch::idempotency_key;
    use crate::application::usecases::settlement::MockSettlementNotifier;
    use crate::domain::entities::payment_intents::PaymentIntentEntity;
    use crate::domain::repositories::{
        carts::MockCartRepository, catalog::MockCatalogRepository, orders::MockOrderRepository,
        payment_attempts::MockPaymentAttemptRepository,
        payment_intents::MockPaymentIntentRepository,
    };
    use crate::domain::value_objects::carts::{CartSnapshot, NewCartItem};
    use crate::domain::value_objects::catalog::PriceQuote;
    use crate::infrastructure::payments::gateway::{MockPaymentGateway, PaymentGateway};
    use crate::application::usecases::confirmation::MockSleeper;
    use chrono::Utc;
    use mockall::predicate::eq;
    use std::time::Duration;

    struct Mocks {
        cart_repo: MockCartRepository,
        order_repo: MockOrderRepository,
        catalog_repo: MockCatalogRepository,
        intent_repo: MockPaymentIntentRepository,
        attempt_repo: MockPaymentAttemptRepository,
        notifier: MockSettlementNotifier,
        gateway: MockPaymentGateway,
        sleeper: MockSleeper,
    }

    type TestCheckout = CheckoutUseCase<
        MockCartRepository,
        MockOrderRepository,
        MockCatalogRepository,
        MockPaymentIntentRepository,
        MockPaymentAttemptRepository,
        MockSettlementNotifier,
        MockSleeper,
    >;

    impl Mocks {
        fn new() -> Self {
            Self {
                cart_repo: MockCartRepository::new(),
                order_repo: MockOrderRepository::new(),
                catalog_repo: MockCatalogRepository::new(),
                intent_repo: MockPaymentIntentRepository::new(),
                attempt_repo: MockPaymentAttemptRepository::new(),
                notifier: MockSettlementNotifier::new(),
                gateway: MockPaymentGateway::new(),
                sleeper: MockSleeper::new(),
            }
        }

        fn into_usecase(self) -> TestCheckout {
            let cart_repo = Arc::new(self.cart_repo);
            let order_repo = Arc::new(self.order_repo);
            let intent_repo = Arc::new(self.intent_repo);
            let gateway: Arc<dyn PaymentGateway> = Arc::new(self.gateway);
            let gateways = Arc::new(GatewayRegistry::new(
                Arc::clone(&gateway),
                Arc::clone(&gateway),
                gateway,
            ));
            let settlement = Arc::new(SettlementUseCase::new(
                Arc::clone(&order_repo),
                Arc::clone(&cart_repo),
                Arc::new(self.notifier),
            ));

            CheckoutUseCase::new(
                Arc::new(CartUseCase::new(Arc::clone(&cart_repo))),
                Arc::new(OrderIntakeUseCase::new(
                    Arc::clone(&order_repo),
                    Arc::new(self.catalog_repo),
                )),
                Arc::new(PaymentDispatchUseCase::new(
                    Arc::clone(&intent_repo),
                    Arc::clone(&gateways),
                )),
                settlement,
                order_repo,
                intent_repo,
                Arc::new(self.attempt_repo),
                gateways,
                Arc::new(self.sleeper),
                PollerSettings {
                    interval: Duration::from_secs(3),
                    max_attempts: 2,
                },
            )
        }
    }

    fn buyer() -> BuyerInfo {
        BuyerInfo {
            name: "Asha".to_string(),
            phone: "+256700000000".to_string(),
        }
    }

    fn snapshot_with(seller_id: Uuid, product_id: Uuid) -> CartSnapshot {
        let mut cart = CartSnapshot::default();
        cart.add_item(
            NewCartItem {
                seller_id,
                product_id,
                product_name: "thing".to_string(),
                unit_price_minor: 500,
                currency: "UGX".to_string(),
            },
            1,
        );
        cart
    }

    fn order_entity(order_id: Uuid, seller_id: Uuid, payment_status: &str) -> OrderEntity {
        OrderEntity {
            id: order_id,
            seller_id,
            buyer_name: "Asha".to_string(),
            buyer_phone: "+256700000000".to_string(),
            currency: "UGX".to_string(),
            total_minor: 500,
            submission_key: "submission-key".to_string(),
            status: "placed".to_string(),
            payment_status: payment_status.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn intent_entity(order_id: Uuid, status: &str, reference: Option<&str>) -> PaymentIntentEntity {
        PaymentIntentEntity {
            id: Uuid::new_v4(),
            order_id,
            provider: "momo".to_string(),
            method: "mobile_money".to_string(),
            amount_minor: 500,
            currency: "UGX".to_string(),
            status: status.to_string(),
            idempotency_key: idempotency_key(Uuid::new_v4(), order_id),
            provider_reference: reference.map(|value| value.to_string()),
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_checked_out() {
        let owner_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();

        let mut mocks = Mocks::new();
        mocks.cart_repo.expect_load_snapshot().returning(|_| Ok(None));
        mocks.order_repo.expect_create_order_with_items().times(0);

        let checkout = mocks.into_usecase();
        let result = checkout
            .submit(owner_id, seller_id, buyer(), PaymentMethod::MobileMoney)
            .await;

        assert!(matches!(result, Err(CheckoutError::EmptyBasket)));
    }

    #[tokio::test]
    async fn submit_places_order_and_dispatches_payment() {
        let owner_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();

        let mut mocks = Mocks::new();
        let snapshot = snapshot_with(seller_id, product_id);
        mocks
            .cart_repo
            .expect_load_snapshot()
            .returning(move |_| Ok(Some(snapshot.clone())));
        mocks
            .order_repo
            .expect_find_by_submission_key()
            .returning(|_| Ok(None));
        mocks
            .catalog_repo
            .expect_price_quote()
            .with(eq(product_id))
            .returning(|id| {
                Ok(Some(PriceQuote {
                    product_id: id,
                    product_name: "thing".to_string(),
                    unit_price_minor: 500,
                    currency: "UGX".to_string(),
                }))
            });
        mocks
            .order_repo
            .expect_create_order_with_items()
            .times(1)
            .returning(|order, _| Ok(order.id));
        mocks
            .intent_repo
            .expect_find_active_by_order()
            .returning(|_| Ok(None));
        mocks.intent_repo.expect_create_idempotent().returning(|insert| {
            Ok(PaymentIntentEntity {
                id: insert.id,
                order_id: insert.order_id,
                provider: insert.provider,
                method: insert.method,
                amount_minor: insert.amount_minor,
                currency: insert.currency,
                status: insert.status,
                idempotency_key: insert.idempotency_key,
                provider_reference: None,
                last_error: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        });
        mocks
            .intent_repo
            .expect_set_provider_reference()
            .returning(|_, _| Ok(()));
        mocks
            .gateway
            .expect_provider_name()
            .return_const("momo");
        mocks
            .gateway
            .expect_request_to_pay()
            .times(1)
            .returning(|_| Ok("ref-9".to_string()));
        mocks
            .order_repo
            .expect_set_payment_status()
            .returning(|_, _| Ok(()));
        // The background confirmation may or may not get scheduled before
        // the test ends; its collaborators are therefore unconstrained.
        mocks
            .gateway
            .expect_check_status()
            .returning(|_| Ok(ProviderStatus::Paid));
        mocks
            .intent_repo
            .expect_update_status()
            .returning(|_, _, _| Ok(()));
        mocks
            .attempt_repo
            .expect_record_attempt()
            .returning(|_| Ok(Uuid::new_v4()));
        mocks.order_repo.expect_mark_paid().returning(|_| Ok(true));
        mocks
            .cart_repo
            .expect_clear_seller_items()
            .returning(|_, _| Ok(()));
        mocks
            .notifier
            .expect_payment_succeeded()
            .returning(|_, _| ());

        let checkout = mocks.into_usecase();
        let receipt = checkout
            .submit(owner_id, seller_id, buyer(), PaymentMethod::MobileMoney)
            .await
            .unwrap();

        assert_eq!(receipt.provider_reference.as_deref(), Some("ref-9"));
    }

    #[tokio::test]
    async fn duplicate_submission_returns_the_same_receipt() {
        use std::sync::Mutex;

        let owner_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();

        let placed_order: Arc<Mutex<Option<OrderEntity>>> = Arc::new(Mutex::new(None));
        let placed_intent: Arc<Mutex<Option<PaymentIntentEntity>>> = Arc::new(Mutex::new(None));

        let mut mocks = Mocks::new();
        let snapshot = snapshot_with(seller_id, product_id);
        mocks
            .cart_repo
            .expect_load_snapshot()
            .returning(move |_| Ok(Some(snapshot.clone())));
        mocks.catalog_repo.expect_price_quote().returning(|id| {
            Ok(Some(PriceQuote {
                product_id: id,
                product_name: "thing".to_string(),
                unit_price_minor: 500,
                currency: "UGX".to_string(),
            }))
        });

        mocks.order_repo.expect_find_by_submission_key().returning({
            let placed_order = Arc::clone(&placed_order);
            move |_| Ok(placed_order.lock().unwrap().clone())
        });
        // The second identical submission must not create a sibling order.
        mocks
            .order_repo
            .expect_create_order_with_items()
            .times(1)
            .returning({
                let placed_order = Arc::clone(&placed_order);
                move |order, _| {
                    let order_id = order.id;
                    *placed_order.lock().unwrap() = Some(OrderEntity {
                        id: order.id,
                        seller_id: order.seller_id,
                        buyer_name: order.buyer_name,
                        buyer_phone: order.buyer_phone,
                        currency: order.currency,
                        total_minor: order.total_minor,
                        submission_key: order.submission_key,
                        status: order.status,
                        payment_status: order.payment_status,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    });
                    Ok(order_id)
                }
            });
        mocks
            .order_repo
            .expect_find_order_items()
            .returning(|_| Ok(vec![]));
        mocks
            .order_repo
            .expect_set_payment_status()
            .returning(|_, _| Ok(()));

        mocks.intent_repo.expect_find_active_by_order().returning({
            let placed_intent = Arc::clone(&placed_intent);
            move |_| Ok(placed_intent.lock().unwrap().clone())
        });
        mocks
            .intent_repo
            .expect_create_idempotent()
            .times(1)
            .returning({
                let placed_intent = Arc::clone(&placed_intent);
                move |insert| {
                    let entity = PaymentIntentEntity {
                        id: insert.id,
                        order_id: insert.order_id,
                        provider: insert.provider,
                        method: insert.method,
                        amount_minor: insert.amount_minor,
                        currency: insert.currency,
                        status: insert.status,
                        idempotency_key: insert.idempotency_key,
                        provider_reference: None,
                        last_error: None,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    };
                    *placed_intent.lock().unwrap() = Some(entity.clone());
                    Ok(entity)
                }
            });
        mocks
            .intent_repo
            .expect_set_provider_reference()
            .times(1)
            .returning({
                let placed_intent = Arc::clone(&placed_intent);
                move |_, reference| {
                    if let Some(intent) = placed_intent.lock().unwrap().as_mut() {
                        intent.provider_reference = Some(reference);
                    }
                    Ok(())
                }
            });

        mocks.gateway.expect_provider_name().return_const("momo");
        // One logical submission, exactly one charge.
        mocks
            .gateway
            .expect_request_to_pay()
            .times(1)
            .returning(|_| Ok("ref-9".to_string()));

        // Background confirmation collaborators, unconstrained: the
        // spawned poll may or may not get scheduled before the test ends.
        mocks
            .gateway
            .expect_check_status()
            .returning(|_| Ok(ProviderStatus::Paid));
        mocks
            .intent_repo
            .expect_update_status()
            .returning(|_, _, _| Ok(()));
        mocks
            .attempt_repo
            .expect_record_attempt()
            .returning(|_| Ok(Uuid::new_v4()));
        mocks.order_repo.expect_mark_paid().returning(|_| Ok(true));
        mocks
            .cart_repo
            .expect_clear_seller_items()
            .returning(|_, _| Ok(()));
        mocks
            .notifier
            .expect_payment_succeeded()
            .returning(|_, _| ());

        let checkout = mocks.into_usecase();
        let first = checkout
            .submit(owner_id, seller_id, buyer(), PaymentMethod::MobileMoney)
            .await
            .unwrap();
        let second = checkout
            .submit(owner_id, seller_id, buyer(), PaymentMethod::MobileMoney)
            .await
            .unwrap();

        assert_eq!(first.order_id, second.order_id);
        assert_eq!(first.payment_intent_id, second.payment_intent_id);
        assert_eq!(second.provider_reference.as_deref(), Some("ref-9"));
    }

    #[tokio::test]
    async fn payment_retry_converges_on_the_active_intent() {
        let owner_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let existing = intent_entity(order_id, "polling", Some("ref-1"));
        let existing_id = existing.id;

        let mut mocks = Mocks::new();
        mocks
            .order_repo
            .expect_find_order()
            .with(eq(order_id))
            .returning(move |id| Ok(Some(order_entity(id, seller_id, "pending"))));
        mocks
            .order_repo
            .expect_find_order_items()
            .returning(|_| Ok(vec![]));
        mocks
            .intent_repo
            .expect_find_active_by_order()
            .returning(move |_| Ok(Some(existing.clone())));
        mocks.gateway.expect_request_to_pay().times(0);
        mocks.order_repo.expect_set_payment_status().times(0);

        let checkout = mocks.into_usecase();
        let receipt = checkout
            .retry_payment(owner_id, order_id, PaymentMethod::MobileMoney)
            .await
            .unwrap();

        assert_eq!(receipt.order_id, order_id);
        assert_eq!(receipt.payment_intent_id, existing_id);
        assert_eq!(receipt.provider_reference.as_deref(), Some("ref-1"));
    }

    #[tokio::test]
    async fn status_read_reconciles_an_orphaned_poll() {
        let owner_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let intent = intent_entity(order_id, "polling", Some("ref-1"));
        let intent_id = intent.id;

        let mut mocks = Mocks::new();
        mocks
            .order_repo
            .expect_find_order()
            .returning(move |id| Ok(Some(order_entity(id, seller_id, "pending"))));
        mocks
            .intent_repo
            .expect_find_latest_by_order()
            .with(eq(order_id))
            .returning(move |_| Ok(Some(intent.clone())));
        mocks
            .gateway
            .expect_check_status()
            .withf(|reference| reference == "ref-1")
            .times(1)
            .returning(|_| Ok(ProviderStatus::Paid));
        mocks
            .order_repo
            .expect_mark_paid()
            .with(eq(order_id))
            .times(1)
            .returning(|_| Ok(true));
        mocks
            .cart_repo
            .expect_clear_seller_items()
            .with(eq(owner_id), eq(seller_id))
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .notifier
            .expect_payment_succeeded()
            .times(1)
            .returning(|_, _| ());
        mocks
            .intent_repo
            .expect_update_status()
            .with(eq(intent_id), eq(IntentStatus::Succeeded), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let checkout = mocks.into_usecase();
        let status = checkout.order_status(Some(owner_id), order_id).await.unwrap();

        assert_eq!(status.payment_status, PaymentStatus::Paid);
        assert_eq!(status.intent_status, Some(IntentStatus::Succeeded));
    }

    #[tokio::test]
    async fn status_read_leaves_pending_when_provider_is_unreachable() {
        let owner_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let intent = intent_entity(order_id, "polling", Some("ref-1"));

        let mut mocks = Mocks::new();
        mocks
            .order_repo
            .expect_find_order()
            .returning(move |id| Ok(Some(order_entity(id, seller_id, "pending"))));
        mocks
            .intent_repo
            .expect_find_latest_by_order()
            .returning(move |_| Ok(Some(intent.clone())));
        mocks
            .gateway
            .expect_check_status()
            .returning(|_| Err(GatewayError::Unreachable("connection reset".to_string())));
        mocks.order_repo.expect_mark_paid().times(0);
        mocks.intent_repo.expect_update_status().times(0);

        let checkout = mocks.into_usecase();
        let status = checkout.order_status(Some(owner_id), order_id).await.unwrap();

        assert_eq!(status.payment_status, PaymentStatus::Pending);
        assert_eq!(status.intent_status, Some(IntentStatus::Polling));
    }

    #[tokio::test]
    async fn status_read_for_terminal_intent_skips_the_provider() {
        let order_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let intent = intent_entity(order_id, "succeeded", Some("ref-1"));

        let mut mocks = Mocks::new();
        mocks
            .order_repo
            .expect_find_order()
            .returning(move |id| Ok(Some(order_entity(id, seller_id, "paid"))));
        mocks
            .intent_repo
            .expect_find_latest_by_order()
            .returning(move |_| Ok(Some(intent.clone())));
        mocks.gateway.expect_check_status().times(0);

        let checkout = mocks.into_usecase();
        let status = checkout.order_status(None, order_id).await.unwrap();

        assert_eq!(status.payment_status, PaymentStatus::Paid);
        assert_eq!(status.intent_status, Some(IntentStatus::Succeeded));
    }

    #[tokio::test]
    async fn unknown_order_is_a_not_found() {
        let mut mocks = Mocks::new();
        mocks.order_repo.expect_find_order().returning(|_| Ok(None));

        let checkout = mocks.into_usecase();
        let result = checkout.order_status(None, Uuid::new_v4()).await;

        assert!(matches!(result, Err(CheckoutError::OrderNotFound)));
    }
}
