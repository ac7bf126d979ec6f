use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::products::ProductEntity, repositories::catalog::CatalogRepository,
        value_objects::catalog::PriceQuote,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::products},
};

pub struct CatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CatalogRepository for CatalogPostgres {
    async fn price_quote(&self, product_id: Uuid) -> Result<Option<PriceQuote>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let product = products::table
            .find(product_id)
            .filter(products::is_active.eq(true))
            .select(ProductEntity::as_select())
            .first::<ProductEntity>(&mut conn)
            .optional()?;

        Ok(product.map(|product| PriceQuote {
            product_id: product.id,
            product_name: product.name,
            unit_price_minor: product.unit_price_minor,
            currency: product.currency,
        }))
    }
}
