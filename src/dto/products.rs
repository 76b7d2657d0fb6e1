use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

/// Create and full-replacement update payload.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ProductRequest {
    #[serde(default)]
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub purchase_price: i64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DecreaseStockRequest {
    pub amount: i32,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
