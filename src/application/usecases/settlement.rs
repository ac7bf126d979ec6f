use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{
    repositories::{carts::CartRepository, orders::OrderRepository},
    value_objects::enums::payment_statuses::PaymentStatus,
};

/// Terminal payment outcome handed over by the poller or the
/// reconciliation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Paid,
    Failed,
    TimedOut,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementNotifier: Send + Sync {
    async fn payment_succeeded(&self, order_id: Uuid, seller_id: Uuid);
    async fn payment_pending(&self, order_id: Uuid);
    async fn payment_failed(&self, order_id: Uuid);
}

/// Notifier that only writes to the log stream. Buyer-facing channels
/// hang off the same port in deployments that have them.
pub struct TracingNotifier;

#[async_trait]
impl SettlementNotifier for TracingNotifier {
    async fn payment_succeeded(&self, order_id: Uuid, seller_id: Uuid) {
        info!(%order_id, %seller_id, "settlement: payment confirmed");
    }

    async fn payment_pending(&self, order_id: Uuid) {
        info!(%order_id, "settlement: payment still pending, buyer told to check back");
    }

    async fn payment_failed(&self, order_id: Uuid) {
        info!(%order_id, "settlement: payment failed");
    }
}

pub struct SettlementUseCase<O, C, N>
where
    O: OrderRepository + Send + Sync,
    C: CartRepository + Send + Sync,
    N: SettlementNotifier,
{
    order_repo: Arc<O>,
    cart_repo: Arc<C>,
    notifier: Arc<N>,
}

impl<O, C, N> SettlementUseCase<O, C, N>
where
    O: OrderRepository + Send + Sync,
    C: CartRepository + Send + Sync,
    N: SettlementNotifier,
{
    pub fn new(order_repo: Arc<O>, cart_repo: Arc<C>, notifier: Arc<N>) -> Self {
        Self {
            order_repo,
            cart_repo,
            notifier,
        }
    }

    /// Applies a terminal outcome to the order. Idempotent: a repeated
    /// terminal observation is a no-op, never an error. Returns whether
    /// this call actually applied the side effects.
    pub async fn settle(
        &self,
        order_id: Uuid,
        seller_id: Uuid,
        cart_owner: Option<Uuid>,
        outcome: SettlementOutcome,
    ) -> Result<bool> {
        match outcome {
            SettlementOutcome::Paid => {
                let applied = self.order_repo.mark_paid(order_id).await?;
                if !applied {
                    info!(%order_id, "settlement: order already paid, duplicate observation ignored");
                    return Ok(false);
                }

                if let Some(owner_id) = cart_owner {
                    if let Err(err) = self.cart_repo.clear_seller_items(owner_id, seller_id).await
                    {
                        // The order is paid either way; the stale cart lines
                        // are cosmetic and the buyer can remove them.
                        error!(
                            %order_id,
                            %owner_id,
                            db_error = ?err,
                            "settlement: failed to clear seller items from cart"
                        );
                    }
                }

                self.notifier.payment_succeeded(order_id, seller_id).await;
                info!(%order_id, %seller_id, "settlement: paid outcome applied");
                Ok(true)
            }
            SettlementOutcome::Failed => {
                self.order_repo
                    .set_payment_status(order_id, PaymentStatus::Failed)
                    .await?;
                // Cart is deliberately kept so the buyer can retry checkout
                // without re-adding items.
                self.notifier.payment_failed(order_id).await;
                info!(%order_id, "settlement: failed outcome applied");
                Ok(true)
            }
            SettlementOutcome::TimedOut => {
                self.order_repo
                    .set_payment_status(order_id, PaymentStatus::Pending)
                    .await?;
                self.notifier.payment_pending(order_id).await;
                info!(%order_id, "settlement: timeout outcome applied, charge may still resolve");
                Ok(true)
            }
        }
    }
}
