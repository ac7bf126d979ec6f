use uuid::Uuid;

/// Authoritative price read from the catalog at order creation. The cart's
/// own price is a display cache and is never trusted transactionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub currency: String,
}
