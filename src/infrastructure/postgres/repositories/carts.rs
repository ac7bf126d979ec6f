use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::carts::{CartEntity, UpsertCartEntity},
        repositories::carts::CartRepository,
        value_objects::carts::CartSnapshot,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::carts},
};

pub struct CartPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CartPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn write_snapshot(
        conn: &mut PgConnection,
        owner_id: Uuid,
        snapshot: &CartSnapshot,
    ) -> Result<()> {
        let row = UpsertCartEntity {
            owner_id,
            snapshot: serde_json::to_value(snapshot)?,
            updated_at: Utc::now(),
        };

        insert_into(carts::table)
            .values(&row)
            .on_conflict(carts::owner_id)
            .do_update()
            .set((
                carts::snapshot.eq(&row.snapshot),
                carts::updated_at.eq(row.updated_at),
            ))
            .execute(conn)?;

        Ok(())
    }
}

#[async_trait]
impl CartRepository for CartPostgres {
    async fn load_snapshot(&self, owner_id: Uuid) -> Result<Option<CartSnapshot>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entity = carts::table
            .find(owner_id)
            .select(CartEntity::as_select())
            .first::<CartEntity>(&mut conn)
            .optional()?;

        match entity {
            Some(entity) => Ok(Some(serde_json::from_value(entity.snapshot)?)),
            None => Ok(None),
        }
    }

    async fn save_snapshot(&self, owner_id: Uuid, snapshot: CartSnapshot) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        Self::write_snapshot(&mut conn, owner_id, &snapshot)
    }

    async fn clear_seller_items(&self, owner_id: Uuid, seller_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Read-modify-write inside one transaction so settlement does not
        // race a concurrent cart mutation from the same owner.
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            let entity = carts::table
                .find(owner_id)
                .select(CartEntity::as_select())
                .first::<CartEntity>(conn)
                .optional()?;

            let Some(entity) = entity else {
                return Ok(());
            };

            let mut snapshot: CartSnapshot = serde_json::from_value(entity.snapshot)?;
            snapshot.remove_seller_items(seller_id);
            Self::write_snapshot(conn, owner_id, &snapshot)
        })?;

        Ok(())
    }
}
