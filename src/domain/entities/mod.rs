pub mod carts;
pub mod orders;
pub mod payment_attempts;
pub mod payment_intents;
pub mod products;
