use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payment_intents::{InsertPaymentIntentEntity, PaymentIntentEntity},
    value_objects::enums::intent_statuses::IntentStatus,
};

#[automock]
#[async_trait]
pub trait PaymentIntentRepository {
    /// The latest intent for the order that has not reached a terminal
    /// status, if any.
    async fn find_active_by_order(&self, order_id: Uuid) -> Result<Option<PaymentIntentEntity>>;

    async fn find_latest_by_order(&self, order_id: Uuid) -> Result<Option<PaymentIntentEntity>>;

    /// Inserts under the unique idempotency key and returns the winning
    /// row. Two concurrent submissions with the same key converge on the
    /// same intent instead of erroring.
    async fn create_idempotent(
        &self,
        intent: InsertPaymentIntentEntity,
    ) -> Result<PaymentIntentEntity>;

    async fn set_provider_reference(&self, intent_id: Uuid, reference: String) -> Result<()>;

    async fn update_status(
        &self,
        intent_id: Uuid,
        status: IntentStatus,
        last_error: Option<String>,
    ) -> Result<()>;
}
