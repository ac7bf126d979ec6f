use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::payment_intents::{InsertPaymentIntentEntity, PaymentIntentEntity},
        repositories::payment_intents::PaymentIntentRepository,
        value_objects::enums::intent_statuses::IntentStatus,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::payment_intents},
};

pub struct PaymentIntentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentIntentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

const TERMINAL_STATUSES: [&str; 3] = ["succeeded", "failed", "expired"];

#[async_trait]
impl PaymentIntentRepository for PaymentIntentPostgres {
    async fn find_active_by_order(&self, order_id: Uuid) -> Result<Option<PaymentIntentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let intent = payment_intents::table
            .filter(payment_intents::order_id.eq(order_id))
            .filter(payment_intents::status.ne_all(TERMINAL_STATUSES))
            .order(payment_intents::created_at.desc())
            .select(PaymentIntentEntity::as_select())
            .first::<PaymentIntentEntity>(&mut conn)
            .optional()?;

        Ok(intent)
    }

    async fn find_latest_by_order(&self, order_id: Uuid) -> Result<Option<PaymentIntentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let intent = payment_intents::table
            .filter(payment_intents::order_id.eq(order_id))
            .order(payment_intents::created_at.desc())
            .select(PaymentIntentEntity::as_select())
            .first::<PaymentIntentEntity>(&mut conn)
            .optional()?;

        Ok(intent)
    }

    async fn create_idempotent(
        &self,
        intent: InsertPaymentIntentEntity,
    ) -> Result<PaymentIntentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let idempotency_key = intent.idempotency_key.clone();

        // The unique key makes concurrent duplicate submissions converge:
        // the loser's insert is a no-op and both read back the same row.
        insert_into(payment_intents::table)
            .values(&intent)
            .on_conflict(payment_intents::idempotency_key)
            .do_nothing()
            .execute(&mut conn)?;

        let winner = payment_intents::table
            .filter(payment_intents::idempotency_key.eq(&idempotency_key))
            .select(PaymentIntentEntity::as_select())
            .first::<PaymentIntentEntity>(&mut conn)
            .with_context(|| {
                format!("payment intent missing after idempotent insert: {idempotency_key}")
            })?;

        Ok(winner)
    }

    async fn set_provider_reference(&self, intent_id: Uuid, reference: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payment_intents::table)
            .filter(payment_intents::id.eq(intent_id))
            .set((
                payment_intents::provider_reference.eq(Some(reference)),
                payment_intents::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_status(
        &self,
        intent_id: Uuid,
        status: IntentStatus,
        last_error: Option<String>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Terminal intents stay terminal even if a late poller reports in.
        update(payment_intents::table)
            .filter(payment_intents::id.eq(intent_id))
            .filter(payment_intents::status.ne_all(TERMINAL_STATUSES))
            .set((
                payment_intents::status.eq(status.to_string()),
                payment_intents::last_error.eq(last_error),
                payment_intents::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
