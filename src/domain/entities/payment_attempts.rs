use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payment_attempts;

/// Append-only audit row for one provider status check. Never updated.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_attempts)]
pub struct PaymentAttemptEntity {
    pub id: Uuid,
    pub payment_intent_id: Uuid,
    pub attempt_no: i32,
    pub provider_status: String,
    pub raw_status: String,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_attempts)]
pub struct InsertPaymentAttemptEntity {
    pub payment_intent_id: Uuid,
    pub attempt_no: i32,
    pub provider_status: String,
    pub raw_status: String,
}
