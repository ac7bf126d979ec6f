use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    entities::orders::{InsertOrderEntity, InsertOrderItemEntity},
    repositories::{catalog::CatalogRepository, orders::OrderRepository},
    value_objects::{
        carts::SellerBasket,
        enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
        orders::{BuyerInfo, OrderLineModel, OrderModel},
    },
};

use super::checkout::CheckoutError;

/// Content fingerprint of one logical submission: owner, seller and the
/// basket lines. Retries of the same checkout produce the same key, so
/// they land on the same order row instead of creating a sibling.
pub fn submission_key(owner_id: Uuid, basket: &SellerBasket) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner_id.as_bytes());
    hasher.update(basket.seller_id.as_bytes());

    let mut lines: Vec<(Uuid, i32)> = basket
        .items
        .iter()
        .map(|item| (item.product_id, item.quantity))
        .collect();
    lines.sort();
    for (product_id, quantity) in lines {
        hasher.update(product_id.as_bytes());
        hasher.update(quantity.to_be_bytes());
    }

    hex::encode(hasher.finalize())
}

pub struct OrderIntakeUseCase<O, K>
where
    O: OrderRepository + Send + Sync,
    K: CatalogRepository + Send + Sync,
{
    order_repo: Arc<O>,
    catalog_repo: Arc<K>,
}

impl<O, K> OrderIntakeUseCase<O, K>
where
    O: OrderRepository + Send + Sync,
    K: CatalogRepository + Send + Sync,
{
    pub fn new(order_repo: Arc<O>, catalog_repo: Arc<K>) -> Self {
        Self {
            order_repo,
            catalog_repo,
        }
    }

    /// Creates an order from one seller basket with a frozen price
    /// snapshot. Prices are re-read from the catalog because the cart's
    /// copy is a display cache; any unavailable item aborts the whole
    /// creation.
    pub async fn create_order(
        &self,
        basket: &SellerBasket,
        buyer: BuyerInfo,
        submission_key: String,
    ) -> Result<OrderModel, CheckoutError> {
        if basket.is_empty() {
            return Err(CheckoutError::EmptyBasket);
        }
        if buyer.phone.trim().is_empty() {
            return Err(CheckoutError::MissingBuyerContact);
        }
        let currency = basket
            .uniform_currency()
            .ok_or(CheckoutError::MixedCurrencies)?;

        let mut lines: Vec<OrderLineModel> = Vec::with_capacity(basket.items.len());
        let mut total_minor: i64 = 0;
        for item in &basket.items {
            let quote = self
                .catalog_repo
                .price_quote(item.product_id)
                .await
                .map_err(CheckoutError::Internal)?
                .ok_or(CheckoutError::ItemUnavailable {
                    product_id: item.product_id,
                })?;

            if quote.currency != currency {
                warn!(
                    product_id = %item.product_id,
                    basket_currency = %currency,
                    quote_currency = %quote.currency,
                    "intake: catalog currency no longer matches basket"
                );
                return Err(CheckoutError::ItemUnavailable {
                    product_id: item.product_id,
                });
            }

            total_minor += quote.unit_price_minor * i64::from(item.quantity);
            lines.push(OrderLineModel {
                product_id: quote.product_id,
                product_name: quote.product_name,
                unit_price_minor: quote.unit_price_minor,
                quantity: item.quantity,
            });
        }

        let order_id = Uuid::new_v4();
        let order = InsertOrderEntity {
            id: order_id,
            seller_id: basket.seller_id,
            buyer_name: buyer.name.clone(),
            buyer_phone: buyer.phone.clone(),
            currency: currency.clone(),
            total_minor,
            submission_key,
            status: OrderStatus::Placed.to_string(),
            payment_status: PaymentStatus::Unpaid.to_string(),
        };
        let items = lines
            .iter()
            .map(|line| InsertOrderItemEntity {
                id: Uuid::new_v4(),
                order_id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                unit_price_minor: line.unit_price_minor,
                quantity: line.quantity,
            })
            .collect();

        let created_id = self
            .order_repo
            .create_order_with_items(order, items)
            .await
            .map_err(CheckoutError::Internal)?;

        info!(
            order_id = %created_id,
            seller_id = %basket.seller_id,
            total_minor,
            currency = %currency,
            "intake: order placed with frozen price snapshot"
        );

        Ok(OrderModel {
            id: created_id,
            seller_id: basket.seller_id,
            buyer,
            currency,
            total_minor,
            status: OrderStatus::Placed,
            payment_status: PaymentStatus::Unpaid,
            lines,
        })
    }
}
