use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::{order_items, orders};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = orders)]
pub struct OrderEntity {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub currency: String,
    pub total_minor: i64,
    pub submission_key: String,
    pub status: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct InsertOrderEntity {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub currency: String,
    pub total_minor: i64,
    pub submission_key: String,
    pub status: String,
    pub payment_status: String,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Associations)]
#[diesel(table_name = order_items, belongs_to(OrderEntity, foreign_key = order_id))]
pub struct OrderItemEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = order_items)]
pub struct InsertOrderItemEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub quantity: i32,
}
