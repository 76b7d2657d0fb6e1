use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    categories::Model as CategoryModel, products::Model as ProductModel,
    transaction_items::Model as TransactionItemModel, transactions::Model as TransactionModel,
    users::Model as UserModel,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "kasir")]
    Kasir,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Kasir => "kasir",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "kasir" => Ok(Role::Kasir),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "qris")]
    Qris,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Qris => "qris",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub purchase_price: i64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub category: Option<CategoryRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub total: i64,
    pub total_purchase_price: i64,
    pub payment_method: PaymentMethod,
    pub postage: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TransactionItem {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub price: i64,
    pub purchase_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub auth_user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryModel> for Category {
    fn from(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl Product {
    pub fn from_entity(model: ProductModel, category: Option<CategoryModel>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            purchase_price: model.purchase_price,
            stock: model.stock,
            category_id: model.category_id,
            category: category.map(|c| CategoryRef {
                id: c.id,
                name: c.name,
            }),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<TransactionModel> for Transaction {
    fn from(model: TransactionModel) -> Self {
        Self {
            id: model.id,
            total: model.total,
            total_purchase_price: model.total_purchase_price,
            payment_method: model.payment_method,
            postage: model.postage,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<TransactionItemModel> for TransactionItem {
    fn from(model: TransactionItemModel) -> Self {
        Self {
            id: model.id,
            transaction_id: model.transaction_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            purchase_price: model.purchase_price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            auth_user_id: model.auth_user_id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" kasir ".parse::<Role>(), Ok(Role::Kasir));
        assert!("owner".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn payment_method_uses_lowercase_wire_names() {
        let json = serde_json::to_string(&PaymentMethod::Qris).unwrap();
        assert_eq!(json, "\"qris\"");
        let parsed: PaymentMethod = serde_json::from_str("\"card\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Card);
        assert!(serde_json::from_str::<PaymentMethod>("\"transfer\"").is_err());
    }
}
