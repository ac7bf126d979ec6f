use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::orders::{
            InsertOrderEntity, InsertOrderItemEntity, OrderEntity, OrderItemEntity,
        },
        repositories::orders::OrderRepository,
        value_objects::enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{order_items, orders},
    },
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn create_order_with_items(
        &self,
        order: InsertOrderEntity,
        items: Vec<InsertOrderItemEntity>,
    ) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order_id = conn.transaction::<_, anyhow::Error, _>(|conn| {
            let submission_key = order.submission_key.clone();
            let inserted = insert_into(orders::table)
                .values(&order)
                .on_conflict(orders::submission_key)
                .do_nothing()
                .returning(orders::id)
                .get_result::<Uuid>(conn)
                .optional()?;

            match inserted {
                Some(order_id) => {
                    insert_into(order_items::table)
                        .values(&items)
                        .execute(conn)?;
                    Ok(order_id)
                }
                None => {
                    // A simultaneous duplicate submission won the insert;
                    // converge on its order instead of erroring.
                    let order_id = orders::table
                        .filter(orders::submission_key.eq(&submission_key))
                        .select(orders::id)
                        .first::<Uuid>(conn)?;
                    Ok(order_id)
                }
            }
        })?;

        Ok(order_id)
    }

    async fn find_by_submission_key(
        &self,
        submission_key: String,
    ) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::submission_key.eq(submission_key))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(order)
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .find(order_id)
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(order)
    }

    async fn find_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let items = order_items::table
            .filter(order_items::order_id.eq(order_id))
            .select(OrderItemEntity::as_select())
            .load::<OrderItemEntity>(&mut conn)?;

        Ok(items)
    }

    async fn mark_paid(&self, order_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::payment_status.ne(PaymentStatus::Paid.to_string()))
            .set((
                orders::payment_status.eq(PaymentStatus::Paid.to_string()),
                orders::status.eq(OrderStatus::Paid.to_string()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(affected > 0)
    }

    async fn set_payment_status(&self, order_id: Uuid, status: PaymentStatus) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // A paid order never moves backward.
        update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::payment_status.ne(PaymentStatus::Paid.to_string()))
            .set((
                orders::payment_status.eq(status.to_string()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
