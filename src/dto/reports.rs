use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Transaction;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct MonthlySummary {
    /// Calendar month as `YYYY-MM` (UTC).
    pub month: String,
    pub total: i64,
    pub transactions: i64,
    pub total_purchase_price: i64,
    pub margin: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct CategorySummary {
    pub name: String,
    pub products: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardReport {
    pub total_revenue: i64,
    pub total_purchase_price: i64,
    pub total_margin: i64,
    pub margin_percentage: f64,
    pub transaction_count: i64,
    pub product_count: i64,
    pub low_stock_count: i64,
    pub recent_transactions: Vec<Transaction>,
    pub monthly: Vec<MonthlySummary>,
    pub categories: Vec<CategorySummary>,
}
