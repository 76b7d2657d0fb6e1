use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    Logout,
    Checkout,
    StockDecrease,
    CategoryCreate,
    CategoryUpdate,
    CategoryDelete,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    UserCreate,
    UserUpdate,
    UserDelete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "user_login",
            AuditAction::Logout => "user_logout",
            AuditAction::Checkout => "checkout",
            AuditAction::StockDecrease => "stock_decrease",
            AuditAction::CategoryCreate => "category_create",
            AuditAction::CategoryUpdate => "category_update",
            AuditAction::CategoryDelete => "category_delete",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductUpdate => "product_update",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::UserCreate => "user_create",
            AuditAction::UserUpdate => "user_update",
            AuditAction::UserDelete => "user_delete",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::Login | AuditAction::Logout => "auth_sessions",
            AuditAction::Checkout => "transactions",
            AuditAction::StockDecrease
            | AuditAction::ProductCreate
            | AuditAction::ProductUpdate
            | AuditAction::ProductDelete => "products",
            AuditAction::CategoryCreate
            | AuditAction::CategoryUpdate
            | AuditAction::CategoryDelete => "categories",
            AuditAction::UserCreate | AuditAction::UserUpdate | AuditAction::UserDelete => "users",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write an audit row; a failure is logged and otherwise ignored.
pub async fn record(pool: &DbPool, user_id: Option<Uuid>, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, user_id, action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
