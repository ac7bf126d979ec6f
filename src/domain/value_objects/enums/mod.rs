pub mod intent_statuses;
pub mod order_statuses;
pub mod payment_methods;
pub mod payment_statuses;
pub mod provider_statuses;
