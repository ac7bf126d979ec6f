use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    repositories::carts::CartRepository,
    value_objects::carts::{CartSnapshot, NewCartItem, SellerBasket},
};

pub struct CartUseCase<C>
where
    C: CartRepository + Send + Sync,
{
    cart_repo: Arc<C>,
}

impl<C> CartUseCase<C>
where
    C: CartRepository + Send + Sync,
{
    pub fn new(cart_repo: Arc<C>) -> Self {
        Self { cart_repo }
    }

    /// Cart mutations never fail towards the browser: a load error starts
    /// from an empty cart, a save error keeps the in-memory result and is
    /// only logged. The returned snapshot is what the buyer sees.
    pub async fn add_item(
        &self,
        owner_id: Uuid,
        item: NewCartItem,
        quantity: i32,
    ) -> CartSnapshot {
        let mut snapshot = self.load_or_default(owner_id).await;
        // A currency mismatch within one seller is kept in the cart; it
        // only blocks checkout of that seller's basket.
        if let Some(line) = snapshot.items.iter().find(|line| {
            line.seller_id == item.seller_id && line.currency != item.currency
        }) {
            warn!(
                %owner_id,
                seller_id = %item.seller_id,
                cart_currency = %line.currency,
                item_currency = %item.currency,
                "cart: item currency differs from existing lines of this seller"
            );
        }
        let line_id = snapshot.add_item(item, quantity.max(1));
        info!(%owner_id, %line_id, "cart: item added");
        self.persist(owner_id, snapshot).await
    }

    pub async fn update_quantity(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> CartSnapshot {
        let mut snapshot = self.load_or_default(owner_id).await;
        snapshot.update_quantity(item_id, quantity);
        self.persist(owner_id, snapshot).await
    }

    pub async fn remove_item(&self, owner_id: Uuid, item_id: Uuid) -> CartSnapshot {
        let mut snapshot = self.load_or_default(owner_id).await;
        snapshot.remove_item(item_id);
        self.persist(owner_id, snapshot).await
    }

    pub async fn items_by_seller(&self, owner_id: Uuid) -> Result<Vec<SellerBasket>> {
        let snapshot = self
            .cart_repo
            .load_snapshot(owner_id)
            .await?
            .unwrap_or_default();
        Ok(snapshot.by_seller())
    }

    pub async fn seller_basket(
        &self,
        owner_id: Uuid,
        seller_id: Uuid,
    ) -> Result<Option<SellerBasket>> {
        let snapshot = self
            .cart_repo
            .load_snapshot(owner_id)
            .await?
            .unwrap_or_default();
        Ok(snapshot.seller_basket(seller_id))
    }

    async fn load_or_default(&self, owner_id: Uuid) -> CartSnapshot {
        match self.cart_repo.load_snapshot(owner_id).await {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(err) => {
                error!(%owner_id, db_error = ?err, "cart: load failed, starting from empty cart");
                CartSnapshot::default()
            }
        }
    }

    async fn persist(&self, owner_id: Uuid, snapshot: CartSnapshot) -> CartSnapshot {
        if let Err(err) = self
            .cart_repo
            .save_snapshot(owner_id, snapshot.clone())
            .await
        {
            error!(%owner_id, db_error = ?err, "cart: save failed, returning unpersisted snapshot");
        }
        snapshot
    }
}
