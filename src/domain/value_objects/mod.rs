pub mod carts;
pub mod catalog;
pub mod enums;
pub mod orders;
pub mod payments;
