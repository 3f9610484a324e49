use crate::entities::product_entity as products;
use crate::models::CategoryResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub fullname: Option<String>,
    pub serial: String,
    pub price: i64,
    pub cost_price: Option<i64>,
    pub market_price: Option<i64>,
    pub stock: i32,
    pub description: Option<String>,
    pub status: i32,
    pub categories: Vec<CategoryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductResponse {
    pub fn new(product: products::Model, categories: Vec<CategoryResponse>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            fullname: product.fullname,
            serial: product.serial,
            price: product.price,
            cost_price: product.cost_price,
            market_price: product.market_price,
            stock: product.stock,
            description: product.description,
            status: product.status,
            categories,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductsQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Matches name, fullname or serial (LIKE).
    pub q: Option<String>,
    pub category_id: Option<i32>,
    pub order_by: Option<String>,
    pub order_sort: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub fullname: Option<String>,
    pub serial: String,
    pub price: i64,
    pub cost_price: Option<i64>,
    pub market_price: Option<i64>,
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub status: Option<i32>,
    pub category_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub fullname: Option<String>,
    pub serial: Option<String>,
    pub price: Option<i64>,
    pub cost_price: Option<i64>,
    pub market_price: Option<i64>,
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub status: Option<i32>,
    /// Replaces the whole association set when present.
    pub category_ids: Option<Vec<i32>>,
}
