pub mod carts;
pub mod checkout;
