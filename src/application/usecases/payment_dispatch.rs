use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::payment_intents::{InsertPaymentIntentEntity, PaymentIntentEntity},
    repositories::payment_intents::PaymentIntentRepository,
    value_objects::enums::{intent_statuses::IntentStatus, payment_methods::PaymentMethod},
    value_objects::orders::OrderModel,
};
use crate::infrastructure::payments::{
    GatewayRegistry,
    gateway::{GatewayError, RequestToPay},
};

use super::checkout::CheckoutError;

#[derive(Debug, Clone)]
pub struct DispatchedIntent {
    pub intent: PaymentIntentEntity,
    /// False when an earlier submission already dispatched this intent;
    /// the caller must not start a second confirmation loop for it.
    pub newly_dispatched: bool,
}

/// Derived server-side from order identity so client retries reuse the
/// same intent. Never taken from the request.
pub fn idempotency_key(seller_id: Uuid, order_id: Uuid) -> String {
    let digest = Sha256::digest(format!("{seller_id}:{order_id}").as_bytes());
    hex::encode(digest)
}

pub struct PaymentDispatchUseCase<I>
where
    I: PaymentIntentRepository + Send + Sync,
{
    intent_repo: Arc<I>,
    gateways: Arc<GatewayRegistry>,
}

impl<I> PaymentDispatchUseCase<I>
where
    I: PaymentIntentRepository + Send + Sync,
{
    pub fn new(intent_repo: Arc<I>, gateways: Arc<GatewayRegistry>) -> Self {
        Self {
            intent_repo,
            gateways,
        }
    }

    pub async fn initiate(
        &self,
        order: &OrderModel,
        method: PaymentMethod,
    ) -> Result<DispatchedIntent, CheckoutError> {
        let existing = self
            .intent_repo
            .find_active_by_order(order.id)
            .await
            .map_err(CheckoutError::Internal)?;

        let intent = match existing {
            Some(existing) if existing.provider_reference.is_some() => {
                info!(
                    order_id = %order.id,
                    intent_id = %existing.id,
                    "dispatch: reusing active payment intent for duplicate submission"
                );
                return Ok(DispatchedIntent {
                    intent: existing,
                    newly_dispatched: false,
                });
            }
            Some(existing) => {
                // A prior dispatch died between the insert and storing the
                // provider reference. Re-issue the request under the stored
                // key; the provider deduplicates on its side.
                info!(
                    order_id = %order.id,
                    intent_id = %existing.id,
                    "dispatch: resuming payment intent that never reached the provider"
                );
                existing
            }
            None => {
                let gateway = self.gateways.for_method(method);
                let insert = InsertPaymentIntentEntity {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    provider: gateway.provider_name().to_string(),
                    method: method.to_string(),
                    amount_minor: order.total_minor,
                    currency: order.currency.clone(),
                    status: IntentStatus::RequiresConfirmation.to_string(),
                    idempotency_key: idempotency_key(order.seller_id, order.id),
                    provider_reference: None,
                    last_error: None,
                };

                let intent = self
                    .intent_repo
                    .create_idempotent(insert)
                    .await
                    .map_err(CheckoutError::Internal)?;

                // Lost the unique-key race or the client replayed the HTTP
                // call after dispatch: the winning row already carries a
                // reference.
                if intent.provider_reference.is_some() {
                    info!(
                        order_id = %order.id,
                        intent_id = %intent.id,
                        "dispatch: intent already dispatched under the same idempotency key"
                    );
                    return Ok(DispatchedIntent {
                        intent,
                        newly_dispatched: false,
                    });
                }
                intent
            }
        };

        // A resumed intent keeps the method it was created with.
        let method = PaymentMethod::from_str(&intent.method).unwrap_or(method);
        let gateway = self.gateways.for_method(method);
        let request = RequestToPay {
            amount_minor: order.total_minor,
            currency: order.currency.clone(),
            payer_phone: order.buyer.phone.clone(),
            idempotency_key: intent.idempotency_key.clone(),
        };

        match gateway.request_to_pay(request).await {
            Ok(reference) => {
                self.intent_repo
                    .set_provider_reference(intent.id, reference.clone())
                    .await
                    .map_err(CheckoutError::Internal)?;
                info!(
                    order_id = %order.id,
                    intent_id = %intent.id,
                    provider = gateway.provider_name(),
                    provider_reference = %reference,
                    "dispatch: provider acknowledged request to pay"
                );
                let mut intent = intent;
                intent.provider_reference = Some(reference);
                Ok(DispatchedIntent {
                    intent,
                    newly_dispatched: true,
                })
            }
            Err(GatewayError::Rejected(reason)) => {
                self.intent_repo
                    .update_status(intent.id, IntentStatus::Failed, Some(reason.clone()))
                    .await
                    .map_err(CheckoutError::Internal)?;
                warn!(
                    order_id = %order.id,
                    intent_id = %intent.id,
                    reason = %reason,
                    "dispatch: provider rejected request to pay"
                );
                Err(CheckoutError::ProviderRejected(reason))
            }
            Err(GatewayError::Unreachable(reason)) => Err(CheckoutError::Internal(
                anyhow::anyhow!("payment provider unreachable during initiate: {reason}"),
            )),
            Err(GatewayError::Internal(err)) => Err(CheckoutError::Internal(err)),
        }
    }
}
