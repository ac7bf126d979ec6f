use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payment_attempts::InsertPaymentAttemptEntity;

#[automock]
#[async_trait]
pub trait PaymentAttemptRepository {
    async fn record_attempt(&self, attempt: InsertPaymentAttemptEntity) -> Result<Uuid>;
}
