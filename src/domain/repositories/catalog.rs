use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::catalog::PriceQuote;

/// Read side of the catalog/pricing collaborator. Returns the current
/// authoritative price, or None when the product is gone or inactive.
#[automock]
#[async_trait]
pub trait CatalogRepository {
    async fn price_quote(&self, product_id: Uuid) -> Result<Option<PriceQuote>>;
}
