use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::carts;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = carts, primary_key(owner_id))]
pub struct CartEntity {
    pub owner_id: Uuid,
    pub snapshot: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = carts)]
pub struct UpsertCartEntity {
    pub owner_id: Uuid,
    pub snapshot: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
