pub mod carts;
pub mod checkout;
pub mod confirmation;
pub mod order_intake;
pub mod payment_dispatch;
pub mod settlement;
