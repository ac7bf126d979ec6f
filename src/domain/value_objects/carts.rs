use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cart line. `unit_price_minor` here is a display cache only; the
/// authoritative price is re-read from the catalog at order creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItemModel {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub currency: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCartItem {
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub currency: String,
}

/// The full persisted cart of one owner. This is the single canonical
/// mutation surface; groupings are always re-derived from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartSnapshot {
    pub items: Vec<CartItemModel>,
}

impl CartSnapshot {
    /// Merges into an existing line for the same product and seller, or
    /// appends a new line. Returns the id of the affected line.
    pub fn add_item(&mut self, item: NewCartItem, quantity: i32) -> Uuid {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id && line.seller_id == item.seller_id)
        {
            line.quantity += quantity;
            return line.id;
        }

        let line = CartItemModel {
            id: Uuid::new_v4(),
            seller_id: item.seller_id,
            product_id: item.product_id,
            product_name: item.product_name,
            unit_price_minor: item.unit_price_minor,
            currency: item.currency,
            quantity,
        };
        let id = line.id;
        self.items.push(line);
        id
    }

    /// Sets the quantity of a line; a quantity of zero or less removes it.
    pub fn update_quantity(&mut self, item_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            self.remove_item(item_id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|line| line.id == item_id) {
            line.quantity = quantity;
        }
    }

    pub fn remove_item(&mut self, item_id: Uuid) {
        self.items.retain(|line| line.id != item_id);
    }

    pub fn remove_seller_items(&mut self, seller_id: Uuid) {
        self.items.retain(|line| line.seller_id != seller_id);
    }

    /// Read-only projection grouped per seller, ordered by seller id so
    /// repeated renders are stable. Never persisted.
    pub fn by_seller(&self) -> Vec<SellerBasket> {
        let mut seller_ids: Vec<Uuid> = self.items.iter().map(|line| line.seller_id).collect();
        seller_ids.sort();
        seller_ids.dedup();

        seller_ids
            .into_iter()
            .map(|seller_id| {
                let items: Vec<CartItemModel> = self
                    .items
                    .iter()
                    .filter(|line| line.seller_id == seller_id)
                    .cloned()
                    .collect();
                SellerBasket::new(seller_id, items)
            })
            .collect()
    }

    pub fn seller_basket(&self, seller_id: Uuid) -> Option<SellerBasket> {
        self.by_seller()
            .into_iter()
            .find(|basket| basket.seller_id == seller_id)
    }
}

/// The subset of a cart belonging to one seller; the unit of checkout.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SellerBasket {
    pub seller_id: Uuid,
    pub items: Vec<CartItemModel>,
    pub subtotal_minor: i64,
}

impl SellerBasket {
    fn new(seller_id: Uuid, items: Vec<CartItemModel>) -> Self {
        let subtotal_minor = items
            .iter()
            .map(|line| line.unit_price_minor * i64::from(line.quantity))
            .sum();
        Self {
            seller_id,
            items,
            subtotal_minor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The basket currency, provided every line agrees on it.
    pub fn uniform_currency(&self) -> Option<String> {
        let first = self.items.first()?.currency.clone();
        if self.items.iter().all(|line| line.currency == first) {
            Some(first)
        } else {
            None
        }
    }
}
