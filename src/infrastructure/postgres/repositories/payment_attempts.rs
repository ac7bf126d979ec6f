use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::payment_attempts::InsertPaymentAttemptEntity,
        repositories::payment_attempts::PaymentAttemptRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::payment_attempts},
};

pub struct PaymentAttemptPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentAttemptPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentAttemptRepository for PaymentAttemptPostgres {
    async fn record_attempt(&self, attempt: InsertPaymentAttemptEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let attempt_id = insert_into(payment_attempts::table)
            .values(&attempt)
            .returning(payment_attempts::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(attempt_id)
    }
}
