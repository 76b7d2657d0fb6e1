use std::collections::BTreeMap;

use sea_orm::{EntityTrait, QueryOrder};

use crate::{
    dto::reports::{CategorySummary, DashboardReport, MonthlySummary},
    entity::{
        categories::Entity as Categories,
        products::{Column as ProdCol, Entity as Products},
        transactions::{Column as TxCol, Entity as Transactions},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, Transaction},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MONTHS_SHOWN: usize = 6;
pub const RECENT_SHOWN: usize = 5;
pub const LOW_STOCK_BELOW: i32 = 10;
pub const UNCATEGORIZED: &str = "Uncategorized";

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardReport>> {
    ensure_admin(user)?;

    let transactions: Vec<Transaction> = Transactions::find()
        .order_by_desc(TxCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Transaction::from)
        .collect();

    let products: Vec<Product> = Products::find()
        .find_also_related(Categories)
        .order_by_asc(ProdCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(p, c)| Product::from_entity(p, c))
        .collect();

    Ok(ApiResponse::success(
        "Dashboard",
        build_dashboard(&transactions, &products),
        Some(Meta::empty()),
    ))
}

/// Margin as a percentage of revenue; 0 when there is no revenue.
pub fn margin_percentage(revenue: i64, purchase: i64) -> f64 {
    if revenue > 0 {
        revenue.saturating_sub(purchase) as f64 * 100.0 / revenue as f64
    } else {
        0.0
    }
}

pub fn build_dashboard(transactions: &[Transaction], products: &[Product]) -> DashboardReport {
    let total_revenue = transactions
        .iter()
        .fold(0_i64, |acc, t| acc.saturating_add(t.total));
    let total_purchase_price = transactions
        .iter()
        .fold(0_i64, |acc, t| acc.saturating_add(t.total_purchase_price));

    let mut recent = transactions.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(RECENT_SHOWN);

    DashboardReport {
        total_revenue,
        total_purchase_price,
        total_margin: total_revenue.saturating_sub(total_purchase_price),
        margin_percentage: margin_percentage(total_revenue, total_purchase_price),
        transaction_count: transactions.len() as i64,
        product_count: products.len() as i64,
        low_stock_count: products
            .iter()
            .filter(|p| p.stock < LOW_STOCK_BELOW)
            .count() as i64,
        recent_transactions: recent,
        monthly: monthly_summary(transactions, MONTHS_SHOWN),
        categories: category_summary(products),
    }
}

/// Group by calendar month, oldest first, keeping the `months` latest
/// months that have at least one transaction. Empty months are absent.
pub fn monthly_summary(transactions: &[Transaction], months: usize) -> Vec<MonthlySummary> {
    let mut by_month: BTreeMap<String, MonthlySummary> = BTreeMap::new();
    for t in transactions {
        let key = t.created_at.format("%Y-%m").to_string();
        let entry = by_month.entry(key.clone()).or_insert_with(|| MonthlySummary {
            month: key,
            total: 0,
            transactions: 0,
            total_purchase_price: 0,
            margin: 0,
        });
        entry.total = entry.total.saturating_add(t.total);
        entry.transactions += 1;
        entry.total_purchase_price = entry.total_purchase_price.saturating_add(t.total_purchase_price);
        entry.margin = entry.total.saturating_sub(entry.total_purchase_price);
    }

    let skip = by_month.len().saturating_sub(months);
    by_month.into_values().skip(skip).collect()
}

pub fn category_summary(products: &[Product]) -> Vec<CategorySummary> {
    let mut by_name: BTreeMap<&str, i64> = BTreeMap::new();
    for p in products {
        let name = p
            .category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or(UNCATEGORIZED);
        *by_name.entry(name).or_default() += 1;
    }
    by_name
        .into_iter()
        .map(|(name, products)| CategorySummary {
            name: name.to_string(),
            products,
        })
        .collect()
}
