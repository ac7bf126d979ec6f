use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    order_statuses::OrderStatus, payment_statuses::PaymentStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuyerInfo {
    pub name: String,
    pub phone: String,
}

/// A frozen order line. Prices are copied at creation time and are never
/// recomputed from live catalog data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineModel {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderModel {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub buyer: BuyerInfo,
    pub currency: String,
    pub total_minor: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub lines: Vec<OrderLineModel>,
}
