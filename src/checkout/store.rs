use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, Set, Statement,
};
use uuid::Uuid;

use crate::{
    entity::{
        transaction_items::{ActiveModel as ItemActive, Entity as TransactionItems},
        transactions::ActiveModel as TransactionActive,
    },
    models::{PaymentMethod, Transaction, TransactionItem},
};

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub id: Uuid,
    pub total: i64,
    pub total_purchase_price: i64,
    pub payment_method: PaymentMethod,
    pub postage: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransactionItem {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
    pub purchase_price: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&NewTransactionItem> for TransactionItem {
    fn from(item: &NewTransactionItem) -> Self {
        Self {
            id: item.id,
            transaction_id: item.transaction_id,
            product_id: Some(item.product_id),
            quantity: item.quantity,
            price: item.price,
            purchase_price: item.purchase_price,
            created_at: item.created_at,
        }
    }
}

/// The three writes a checkout performs. Each call is one persistence
/// round-trip; none of them is retried.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn insert_transaction(&self, draft: &NewTransaction) -> Result<Transaction, DbErr>;

    /// Insert all lines in a single call.
    async fn insert_items(&self, items: &[NewTransactionItem])
    -> Result<Vec<TransactionItem>, DbErr>;

    /// Returns the stock the store reports after the decrement.
    async fn decrease_stock(&self, product_id: Uuid, amount: i32) -> Result<i32, DbErr>;
}

/// Store backed by any SeaORM connection: the plain connection for
/// step-by-step commits, or a `DatabaseTransaction` for all-or-nothing.
pub struct SeaCheckoutStore<'a, C> {
    conn: &'a C,
}

impl<'a, C> SeaCheckoutStore<'a, C>
where
    C: ConnectionTrait,
{
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> CheckoutStore for SeaCheckoutStore<'_, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn insert_transaction(&self, draft: &NewTransaction) -> Result<Transaction, DbErr> {
        let model = TransactionActive {
            id: Set(draft.id),
            total: Set(draft.total),
            total_purchase_price: Set(draft.total_purchase_price),
            payment_method: Set(draft.payment_method),
            postage: Set(draft.postage),
            created_at: Set(draft.created_at.into()),
        }
        .insert(self.conn)
        .await?;
        Ok(model.into())
    }

    async fn insert_items(
        &self,
        items: &[NewTransactionItem],
    ) -> Result<Vec<TransactionItem>, DbErr> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let rows = items.iter().map(|item| ItemActive {
            id: Set(item.id),
            transaction_id: Set(item.transaction_id),
            product_id: Set(Some(item.product_id)),
            quantity: Set(item.quantity),
            price: Set(item.price),
            purchase_price: Set(item.purchase_price),
            created_at: Set(item.created_at.into()),
        });
        TransactionItems::insert_many(rows)
            .exec_without_returning(self.conn)
            .await?;

        Ok(items.iter().map(TransactionItem::from).collect())
    }

    async fn decrease_stock(&self, product_id: Uuid, amount: i32) -> Result<i32, DbErr> {
        decrease_stock(self.conn, product_id, amount).await
    }
}

/// Call the store-side `decrease_stock` procedure. Its errors (unknown
/// product, insufficient stock) come back untouched.
pub async fn decrease_stock<C>(conn: &C, product_id: Uuid, amount: i32) -> Result<i32, DbErr>
where
    C: ConnectionTrait,
{
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT decrease_stock($1, $2) AS stock",
        [product_id.into(), amount.into()],
    );
    let row = conn
        .query_one(stmt)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("decrease_stock returned no row".into()))?;
    row.try_get::<i32>("", "stock")
}
