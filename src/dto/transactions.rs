use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{PaymentMethod, Transaction};

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct CheckoutLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutLineRequest>,
    pub payment_method: PaymentMethod,
    pub postage: Option<i64>,
    /// Cash handed over by the customer; required for `cash`.
    pub cash_received: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionList {
    pub items: Vec<Transaction>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ProductRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionItemDetail {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub price: i64,
    pub purchase_price: i64,
    pub subtotal: i64,
    /// `None` once the product has been deleted.
    pub product: Option<ProductRef>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetail {
    pub transaction: Transaction,
    pub items: Vec<TransactionItemDetail>,
}
