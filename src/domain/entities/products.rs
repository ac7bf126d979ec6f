use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::products;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = products)]
pub struct ProductEntity {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub unit_price_minor: i64,
    pub currency: String,
    pub is_active: bool,
}
