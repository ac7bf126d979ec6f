use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::orders::{InsertOrderEntity, InsertOrderItemEntity, OrderEntity, OrderItemEntity},
    value_objects::enums::payment_statuses::PaymentStatus,
};

#[automock]
#[async_trait]
pub trait OrderRepository {
    /// Inserts the order and its frozen line items in one transaction.
    /// The submission key is unique: a concurrent duplicate loses the
    /// insert and gets the winner's order id back instead.
    async fn create_order_with_items(
        &self,
        order: InsertOrderEntity,
        items: Vec<InsertOrderItemEntity>,
    ) -> Result<Uuid>;

    async fn find_order(&self, order_id: Uuid) -> Result<Option<OrderEntity>>;

    /// The order previously created for this exact submission, if any.
    async fn find_by_submission_key(&self, submission_key: String)
    -> Result<Option<OrderEntity>>;

    async fn find_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemEntity>>;

    /// Guarded transition to paid. Returns true only for the write that
    /// actually changed the row, so settlement can be applied exactly once.
    async fn mark_paid(&self, order_id: Uuid) -> Result<bool>;

    /// Sets the payment status without ever downgrading a paid order.
    async fn set_payment_status(&self, order_id: Uuid, status: PaymentStatus) -> Result<()>;
}
