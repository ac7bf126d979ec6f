pub mod carts;
pub mod catalog;
pub mod orders;
pub mod payment_attempts;
pub mod payment_intents;
