use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::{
        payment_attempts::InsertPaymentAttemptEntity, payment_intents::PaymentIntentEntity,
    },
    repositories::{
        carts::CartRepository, orders::OrderRepository,
        payment_attempts::PaymentAttemptRepository, payment_intents::PaymentIntentRepository,
    },
    value_objects::enums::{
        intent_statuses::IntentStatus, provider_statuses::ProviderStatus,
    },
};
use crate::infrastructure::payments::gateway::{GatewayError, PaymentGateway};

use super::settlement::{SettlementNotifier, SettlementOutcome, SettlementUseCase};

/// Terminal result of one polling run. No transition leaves any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Paid,
    Failed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Cooperative cancellation shared between the poller and whoever owns
/// the checkout view. Cancelling never interrupts an in-flight check; it
/// only prevents its result from being applied.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Timer seam so tests drive the loop without real delays.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded-retry confirmation loop. Status checks are strictly
/// sequential within one instance; concurrent pollers for the same order
/// are harmless because settlement itself is idempotent.
pub struct ConfirmationPoller<I, A, O, C, N, Z>
where
    I: PaymentIntentRepository + Send + Sync,
    A: PaymentAttemptRepository + Send + Sync,
    O: OrderRepository + Send + Sync,
    C: CartRepository + Send + Sync,
    N: SettlementNotifier,
    Z: Sleeper,
{
    intent_repo: Arc<I>,
    attempt_repo: Arc<A>,
    settlement: Arc<SettlementUseCase<O, C, N>>,
    gateway: Arc<dyn PaymentGateway>,
    sleeper: Arc<Z>,
    settings: PollerSettings,
    cancel: CancelHandle,
}

impl<I, A, O, C, N, Z> ConfirmationPoller<I, A, O, C, N, Z>
where
    I: PaymentIntentRepository + Send + Sync,
    A: PaymentAttemptRepository + Send + Sync,
    O: OrderRepository + Send + Sync,
    C: CartRepository + Send + Sync,
    N: SettlementNotifier,
    Z: Sleeper,
{
    pub fn new(
        intent_repo: Arc<I>,
        attempt_repo: Arc<A>,
        settlement: Arc<SettlementUseCase<O, C, N>>,
        gateway: Arc<dyn PaymentGateway>,
        sleeper: Arc<Z>,
        settings: PollerSettings,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            intent_repo,
            attempt_repo,
            settlement,
            gateway,
            sleeper,
            settings,
            cancel,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub async fn run(
        &self,
        intent: &PaymentIntentEntity,
        seller_id: Uuid,
        cart_owner: Option<Uuid>,
    ) -> Result<PollOutcome> {
        let Some(reference) = intent.provider_reference.clone() else {
            bail!("payment intent {} has no provider reference", intent.id);
        };

        self.intent_repo
            .update_status(intent.id, IntentStatus::Polling, None)
            .await?;

        let mut attempt_no: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                info!(
                    order_id = %intent.order_id,
                    "confirmation: polling cancelled before next check"
                );
                return Ok(PollOutcome::Cancelled);
            }

            attempt_no += 1;
            let checked = self.gateway.check_status(&reference).await;
            self.record_attempt(intent.id, attempt_no, &checked).await;

            match checked {
                Ok(ProviderStatus::Paid) => {
                    if self.cancel.is_cancelled() {
                        // Cancellation wins over a late result; a later
                        // reconciliation pass settles it against current
                        // order state instead.
                        info!(
                            order_id = %intent.order_id,
                            "confirmation: discarding paid result observed after cancel"
                        );
                        return Ok(PollOutcome::Cancelled);
                    }
                    self.settlement
                        .settle(intent.order_id, seller_id, cart_owner, SettlementOutcome::Paid)
                        .await?;
                    self.intent_repo
                        .update_status(intent.id, IntentStatus::Succeeded, None)
                        .await?;
                    info!(
                        order_id = %intent.order_id,
                        attempts = attempt_no,
                        "confirmation: provider confirmed payment"
                    );
                    return Ok(PollOutcome::Paid);
                }
                Ok(ProviderStatus::Failed) => {
                    if self.cancel.is_cancelled() {
                        return Ok(PollOutcome::Cancelled);
                    }
                    self.settlement
                        .settle(
                            intent.order_id,
                            seller_id,
                            cart_owner,
                            SettlementOutcome::Failed,
                        )
                        .await?;
                    self.intent_repo
                        .update_status(intent.id, IntentStatus::Failed, None)
                        .await?;
                    info!(
                        order_id = %intent.order_id,
                        attempts = attempt_no,
                        "confirmation: provider reported failure"
                    );
                    return Ok(PollOutcome::Failed);
                }
                Err(GatewayError::Rejected(reason)) => {
                    if self.cancel.is_cancelled() {
                        return Ok(PollOutcome::Cancelled);
                    }
                    self.settlement
                        .settle(
                            intent.order_id,
                            seller_id,
                            cart_owner,
                            SettlementOutcome::Failed,
                        )
                        .await?;
                    self.intent_repo
                        .update_status(intent.id, IntentStatus::Failed, Some(reason.clone()))
                        .await?;
                    warn!(
                        order_id = %intent.order_id,
                        reason = %reason,
                        "confirmation: provider rejected the status check"
                    );
                    return Ok(PollOutcome::Failed);
                }
                Ok(ProviderStatus::Pending) => {}
                Err(GatewayError::Unreachable(reason)) => {
                    // Transient; consumes an attempt but is not terminal.
                    warn!(
                        order_id = %intent.order_id,
                        attempt = attempt_no,
                        reason = %reason,
                        "confirmation: provider unreachable during status check"
                    );
                }
                Err(GatewayError::Internal(err)) => return Err(err),
            }

            if attempt_no >= self.settings.max_attempts {
                self.settlement
                    .settle(
                        intent.order_id,
                        seller_id,
                        cart_owner,
                        SettlementOutcome::TimedOut,
                    )
                    .await?;
                self.intent_repo
                    .update_status(intent.id, IntentStatus::Expired, None)
                    .await?;
                info!(
                    order_id = %intent.order_id,
                    attempts = attempt_no,
                    "confirmation: retry budget exhausted without a definitive answer"
                );
                return Ok(PollOutcome::TimedOut);
            }

            self.sleeper.sleep(self.settings.interval).await;
        }
    }

    async fn record_attempt(
        &self,
        intent_id: Uuid,
        attempt_no: u32,
        checked: &Result<ProviderStatus, GatewayError>,
    ) {
        let (provider_status, raw_status) = match checked {
            Ok(status) => (status.as_str().to_string(), status.as_str().to_string()),
            Err(err) => ("unreachable".to_string(), err.to_string()),
        };

        let attempt = InsertPaymentAttemptEntity {
            payment_intent_id: intent_id,
            attempt_no: attempt_no as i32,
            provider_status,
            raw_status,
        };

        // Audit only; a write failure must not break the poll loop.
        if let Err(err) = self.attempt_repo.record_attempt(attempt).await {
            warn!(
                %intent_id,
                attempt = attempt_no,
                db_error = ?err,
                "confirmation: failed to record payment attempt"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{
        carts::MockCartRepository, orders::MockOrderRepository,
        payment_attempts::MockPaymentAttemptRepository,
        payment_intents::MockPaymentIntentRepository,
    };
    use crate::infrastructure::payments::gateway::MockPaymentGateway;
    use crate::application::usecases::settlement::MockSettlementNotifier;
    use chrono::Utc;
    use mockall::predicate::{always, eq};

    fn intent(order_id: Uuid) -> PaymentIntentEntity {
        PaymentIntentEntity {
            id: Uuid::new_v4(),
            order_id,
            provider: "momo".to_string(),
            method: "mobile_money".to_string(),
            amount_minor: 800,
            currency: "UGX".to_string(),
            status: "requires_confirmation".to_string(),
            idempotency_key: "key".to_string(),
            provider_reference: Some("ref-1".to_string()),
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn settings(max_attempts: u32) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_secs(3),
            max_attempts,
        }
    }

    struct Mocks {
        intent_repo: MockPaymentIntentRepository,
        attempt_repo: MockPaymentAttemptRepository,
        order_repo: MockOrderRepository,
        cart_repo: MockCartRepository,
        notifier: MockSettlementNotifier,
        gateway: MockPaymentGateway,
        sleeper: MockSleeper,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                intent_repo: MockPaymentIntentRepository::new(),
                attempt_repo: MockPaymentAttemptRepository::new(),
                order_repo: MockOrderRepository::new(),
                cart_repo: MockCartRepository::new(),
                notifier: MockSettlementNotifier::new(),
                gateway: MockPaymentGateway::new(),
                sleeper: MockSleeper::new(),
            }
        }

        fn into_poller(
            self,
            settings: PollerSettings,
            cancel: CancelHandle,
        ) -> ConfirmationPoller<
            MockPaymentIntentRepository,
            MockPaymentAttemptRepository,
            MockOrderRepository,
            MockCartRepository,
            MockSettlementNotifier,
            MockSleeper,
        > {
            let settlement = Arc::new(SettlementUseCase::new(
                Arc::new(self.order_repo),
                Arc::new(self.cart_repo),
                Arc::new(self.notifier),
            ));
            ConfirmationPoller::new(
                Arc::new(self.intent_repo),
                Arc::new(self.attempt_repo),
                settlement,
                Arc::new(self.gateway),
                Arc::new(self.sleeper),
                settings,
                cancel,
            )
        }
    }

    #[tokio::test]
    async fn always_pending_times_out_after_exact_budget() {
        let order_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let intent = intent(order_id);

        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_check_status()
            .withf(|reference| reference == "ref-1")
            .times(3)
            .returning(|_| Ok(ProviderStatus::Pending));
        mocks
            .sleeper
            .expect_sleep()
            .times(2)
            .returning(|_| ());
        mocks
            .attempt_repo
            .expect_record_attempt()
            .times(3)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .intent_repo
            .expect_update_status()
            .with(eq(intent.id), eq(IntentStatus::Polling), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .intent_repo
            .expect_update_status()
            .with(eq(intent.id), eq(IntentStatus::Expired), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .order_repo
            .expect_set_payment_status()
            .with(eq(order_id), always())
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .notifier
            .expect_payment_pending()
            .times(1)
            .returning(|_| ());

        let poller = mocks.into_poller(settings(3), CancelHandle::default());
        let outcome = poller.run(&intent, seller_id, None).await.unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
    }

    #[tokio::test]
    async fn paid_on_third_check_settles_exactly_once() {
        let order_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let intent = intent(order_id);

        let mut mocks = Mocks::new();
        let mut calls = 0u32;
        mocks
            .gateway
            .expect_check_status()
            .times(3)
            .returning(move |_| {
                calls += 1;
                if calls < 3 {
                    Ok(ProviderStatus::Pending)
                } else {
                    Ok(ProviderStatus::Paid)
                }
            });
        mocks.sleeper.expect_sleep().times(2).returning(|_| ());
        mocks
            .attempt_repo
            .expect_record_attempt()
            .times(3)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .intent_repo
            .expect_update_status()
            .with(eq(intent.id), eq(IntentStatus::Polling), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .intent_repo
            .expect_update_status()
            .with(eq(intent.id), eq(IntentStatus::Succeeded), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));
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

        let poller = mocks.into_poller(settings(5), CancelHandle::default());
        let outcome = poller.run(&intent, seller_id, Some(owner_id)).await.unwrap();

        assert_eq!(outcome, PollOutcome::Paid);
    }

    #[tokio::test]
    async fn cancellation_wins_over_late_paid_result() {
        let order_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let intent = intent(order_id);
        let cancel = CancelHandle::default();

        let mut mocks = Mocks::new();
        let handle = cancel.clone();
        // The check is already in flight when the caller cancels; its
        // result must be discarded, not applied.
        mocks
            .gateway
            .expect_check_status()
            .times(1)
            .returning(move |_| {
                handle.cancel();
                Ok(ProviderStatus::Paid)
            });
        mocks
            .attempt_repo
            .expect_record_attempt()
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .intent_repo
            .expect_update_status()
            .with(eq(intent.id), eq(IntentStatus::Polling), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks.order_repo.expect_mark_paid().times(0);
        mocks.cart_repo.expect_clear_seller_items().times(0);

        let poller = mocks.into_poller(settings(5), cancel);
        let outcome = poller.run(&intent, seller_id, None).await.unwrap();

        assert_eq!(outcome, PollOutcome::Cancelled);
    }

    #[tokio::test]
    async fn unreachable_check_consumes_an_attempt() {
        let order_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let intent = intent(order_id);

        let mut mocks = Mocks::new();
        let mut calls = 0u32;
        mocks
            .gateway
            .expect_check_status()
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(GatewayError::Unreachable("connection reset".to_string()))
                } else {
                    Ok(ProviderStatus::Paid)
                }
            });
        mocks.sleeper.expect_sleep().times(1).returning(|_| ());
        mocks
            .attempt_repo
            .expect_record_attempt()
            .times(2)
            .returning(|_| Ok(Uuid::new_v4()));
        mocks
            .intent_repo
            .expect_update_status()
            .returning(|_, _, _| Ok(()));
        mocks
            .order_repo
            .expect_mark_paid()
            .times(1)
            .returning(|_| Ok(true));
        mocks
            .notifier
            .expect_payment_succeeded()
            .times(1)
            .returning(|_, _| ());

        let poller = mocks.into_poller(settings(2), CancelHandle::default());
        let outcome = poller.run(&intent, seller_id, None).await.unwrap();

        assert_eq!(outcome, PollOutcome::Paid);
    }
}
