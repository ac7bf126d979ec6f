use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::carts::CartSnapshot;

/// Persistence boundary for the owner-scoped cart snapshot. Read once at
/// cart load, written in full on every mutation.
#[automock]
#[async_trait]
pub trait CartRepository {
    async fn load_snapshot(&self, owner_id: Uuid) -> Result<Option<CartSnapshot>>;
    async fn save_snapshot(&self, owner_id: Uuid, snapshot: CartSnapshot) -> Result<()>;
    async fn clear_seller_items(&self, owner_id: Uuid, seller_id: Uuid) -> Result<()>;
}
