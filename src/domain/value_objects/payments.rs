use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    intent_statuses::IntentStatus, payment_statuses::PaymentStatus,
};

/// Returned by the checkout submission endpoint. A duplicate submission
/// for the same order receives the same ids back.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutReceiptDto {
    pub order_id: Uuid,
    pub payment_intent_id: Uuid,
    pub provider_reference: Option<String>,
}

/// Normalized view served by the read-only status endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderPaymentStatusDto {
    pub order_id: Uuid,
    pub payment_status: PaymentStatus,
    pub intent_status: Option<IntentStatus>,
    pub provider_reference: Option<String>,
}
