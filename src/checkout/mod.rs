//! Turning a cart into a persisted sale.
//!
//! The procedure performs three dependent writes in a fixed order: the
//! transaction row, its item rows, then one stock decrement per line. The
//! writes are not compensated. A failure part-way through leaves whatever was
//! already written in place and reports how far the procedure got.

pub mod cart;
pub mod store;

use chrono::Utc;
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{PaymentMethod, Transaction, TransactionItem},
};

pub use cart::{Cart, CartError, CartLine, CartTotals, ProductSnapshot};
pub use store::{CheckoutStore, NewTransaction, NewTransactionItem, SeaCheckoutStore};

/// A validated cart ready to be persisted.
#[derive(Debug, Clone)]
pub struct CheckoutOrder {
    lines: Vec<CartLine>,
    payment_method: PaymentMethod,
    postage: i64,
    totals: CartTotals,
    grand_total: i64,
    change: i64,
}

impl CheckoutOrder {
    pub fn new(
        cart: Cart,
        payment_method: PaymentMethod,
        postage: Option<i64>,
        cash_received: Option<i64>,
    ) -> Result<Self, AppError> {
        if cart.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".into()));
        }

        let postage = postage.unwrap_or(0);
        if postage < 0 {
            return Err(AppError::BadRequest("Postage must not be negative".into()));
        }

        let totals = cart
            .totals()
            .ok_or_else(|| AppError::BadRequest("Cart total is too large".into()))?;
        let grand_total = totals
            .total
            .checked_add(postage)
            .ok_or_else(|| AppError::BadRequest("Cart total is too large".into()))?;

        let change = match (payment_method, cash_received) {
            (PaymentMethod::Cash, Some(cash)) if cash >= grand_total => cash
                .checked_sub(grand_total)
                .ok_or_else(|| AppError::BadRequest("Cart total is too large".into()))?,
            (PaymentMethod::Cash, Some(_)) => {
                return Err(AppError::BadRequest("Cash received is not enough".into()));
            }
            (PaymentMethod::Cash, None) => {
                return Err(AppError::BadRequest(
                    "Cash received is required for cash payments".into(),
                ));
            }
            _ => 0,
        };

        Ok(Self {
            lines: cart.into_lines(),
            payment_method,
            postage,
            totals,
            grand_total,
            change,
        })
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn totals(&self) -> CartTotals {
        self.totals
    }

    pub fn grand_total(&self) -> i64 {
        self.grand_total
    }

    /// Change owed to the customer; zero for non-cash payments.
    pub fn change(&self) -> i64 {
        self.change
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "line", rename_all = "snake_case")]
pub enum CheckoutStage {
    Idle,
    TransactionInserted,
    ItemsInserted,
    /// Decrementing stock for the line at this index.
    StockAdjusting(usize),
    Complete,
}

/// How far a checkout got before it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutProgress {
    #[serde(flatten)]
    pub stage: CheckoutStage,
    pub transaction_id: Option<Uuid>,
    pub items_inserted: bool,
    pub adjusted_products: Vec<Uuid>,
    /// Set when the writes ran in one store transaction that was rolled back.
    pub rolled_back: bool,
}

impl CheckoutProgress {
    fn new() -> Self {
        Self {
            stage: CheckoutStage::Idle,
            transaction_id: None,
            items_inserted: false,
            adjusted_products: Vec::new(),
            rolled_back: false,
        }
    }

    fn fail(&self, source: DbErr) -> CheckoutFailure {
        tracing::error!(
            stage = ?self.stage,
            transaction_id = ?self.transaction_id,
            adjusted = self.adjusted_products.len(),
            error = %source,
            "checkout stopped part-way"
        );
        CheckoutFailure {
            progress: self.clone(),
            source,
        }
    }
}

#[derive(Debug, Error)]
#[error("{source}")]
pub struct CheckoutFailure {
    progress: CheckoutProgress,
    source: DbErr,
}

impl CheckoutFailure {
    pub fn progress(&self) -> CheckoutProgress {
        self.progress.clone()
    }

    pub fn stage(&self) -> CheckoutStage {
        self.progress.stage
    }

    pub fn rolled_back(mut self) -> Self {
        self.progress.rolled_back = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub stock: i32,
}

/// Everything an invoice needs.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutReceipt {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
    pub grand_total: i64,
    pub change: i64,
    pub remaining_stock: Vec<StockLevel>,
}

pub async fn run<S>(store: &S, order: &CheckoutOrder) -> Result<CheckoutReceipt, CheckoutFailure>
where
    S: CheckoutStore + ?Sized,
{
    let mut progress = CheckoutProgress::new();
    let now = Utc::now();
    let totals = order.totals();

    let draft = NewTransaction {
        id: Uuid::new_v4(),
        total: totals.total,
        total_purchase_price: totals.total_purchase_price,
        payment_method: order.payment_method,
        postage: order.postage,
        created_at: now,
    };
    let transaction = store
        .insert_transaction(&draft)
        .await
        .map_err(|e| progress.fail(e))?;
    progress.stage = CheckoutStage::TransactionInserted;
    progress.transaction_id = Some(transaction.id);
    tracing::debug!(transaction_id = %transaction.id, "transaction inserted");

    let drafts: Vec<NewTransactionItem> = order
        .lines()
        .iter()
        .map(|line| NewTransactionItem {
            id: Uuid::new_v4(),
            transaction_id: transaction.id,
            product_id: line.product.id,
            quantity: line.quantity,
            price: line.product.price,
            purchase_price: line.product.purchase_price,
            created_at: now,
        })
        .collect();
    let items = store
        .insert_items(&drafts)
        .await
        .map_err(|e| progress.fail(e))?;
    progress.stage = CheckoutStage::ItemsInserted;
    progress.items_inserted = true;
    tracing::debug!(transaction_id = %transaction.id, count = items.len(), "items inserted");

    let mut remaining_stock = Vec::with_capacity(order.lines().len());
    for (index, line) in order.lines().iter().enumerate() {
        progress.stage = CheckoutStage::StockAdjusting(index);
        let stock = store
            .decrease_stock(line.product.id, line.quantity)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.adjusted_products.push(line.product.id);
        remaining_stock.push(StockLevel {
            product_id: line.product.id,
            stock,
        });
    }
    progress.stage = CheckoutStage::Complete;
    tracing::debug!(transaction_id = %transaction.id, "checkout complete");

    Ok(CheckoutReceipt {
        transaction,
        items,
        grand_total: order.grand_total(),
        change: order.change(),
        remaining_stock,
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;

    use super::{cart::tests::snapshot, *};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum FailAt {
        Transaction,
        Items,
        /// Fail the decrement for the n-th call (0-based).
        Stock(usize),
    }

    #[derive(Default)]
    struct FakeStore {
        transactions: Mutex<Vec<NewTransaction>>,
        items: Mutex<Vec<NewTransactionItem>>,
        stock: Mutex<HashMap<Uuid, i32>>,
        decrement_calls: Mutex<usize>,
        fail_at: Option<FailAt>,
    }

    impl FakeStore {
        fn with_stock(products: &[&ProductSnapshot]) -> Self {
            let store = FakeStore::default();
            {
                let mut stock = store.stock.lock().unwrap();
                for p in products {
                    stock.insert(p.id, p.stock);
                }
            }
            store
        }

        fn failing(mut self, at: FailAt) -> Self {
            self.fail_at = Some(at);
            self
        }

        fn stock_of(&self, id: Uuid) -> i32 {
            self.stock.lock().unwrap()[&id]
        }
    }

    #[async_trait]
    impl CheckoutStore for FakeStore {
        async fn insert_transaction(&self, draft: &NewTransaction) -> Result<Transaction, DbErr> {
            if self.fail_at == Some(FailAt::Transaction) {
                return Err(DbErr::Custom("transactions insert failed".into()));
            }
            self.transactions.lock().unwrap().push(draft.clone());
            Ok(Transaction {
                id: draft.id,
                total: draft.total,
                total_purchase_price: draft.total_purchase_price,
                payment_method: draft.payment_method,
                postage: draft.postage,
                created_at: draft.created_at,
            })
        }

        async fn insert_items(
            &self,
            items: &[NewTransactionItem],
        ) -> Result<Vec<TransactionItem>, DbErr> {
            if self.fail_at == Some(FailAt::Items) {
                return Err(DbErr::Custom("transaction_items insert failed".into()));
            }
            self.items.lock().unwrap().extend(items.iter().cloned());
            Ok(items.iter().map(TransactionItem::from).collect())
        }

        async fn decrease_stock(&self, product_id: Uuid, amount: i32) -> Result<i32, DbErr> {
            let call = {
                let mut calls = self.decrement_calls.lock().unwrap();
                let call = *calls;
                *calls += 1;
                call
            };
            if self.fail_at == Some(FailAt::Stock(call)) {
                return Err(DbErr::Custom(format!(
                    "insufficient stock for product {product_id}"
                )));
            }
            let mut stock = self.stock.lock().unwrap();
            let current = stock
                .get_mut(&product_id)
                .ok_or_else(|| DbErr::Custom(format!("product {product_id} not found")))?;
            *current -= amount;
            Ok(*current)
        }
    }

    fn two_line_cart() -> (Cart, ProductSnapshot, ProductSnapshot) {
        let a = snapshot("A", 10_000, 6_000, 5);
        let b = snapshot("B", 5_000, 3_000, 4);
        let mut cart = Cart::new();
        cart.add_quantity(a.clone(), 2).unwrap();
        cart.add_quantity(b.clone(), 1).unwrap();
        (cart, a, b)
    }

    #[test]
    fn empty_cart_is_refused_before_any_write() {
        let err = CheckoutOrder::new(Cart::new(), PaymentMethod::Card, None, None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Cart is empty"));
    }

    #[test]
    fn negative_postage_is_refused() {
        let (cart, _, _) = two_line_cart();
        let err = CheckoutOrder::new(cart, PaymentMethod::Qris, Some(-1), None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn cash_must_cover_total_plus_postage() {
        let (cart, _, _) = two_line_cart();
        let err = CheckoutOrder::new(cart.clone(), PaymentMethod::Cash, Some(5_000), Some(29_999))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Cash received is not enough"));

        let order = CheckoutOrder::new(cart.clone(), PaymentMethod::Cash, Some(5_000), Some(50_000))
            .unwrap();
        assert_eq!(order.grand_total(), 30_000);
        assert_eq!(order.change(), 20_000);

        assert!(CheckoutOrder::new(cart, PaymentMethod::Cash, None, None).is_err());
    }

    #[test]
    fn change_that_does_not_fit_is_rejected_before_any_write() {
        let mut cart = Cart::new();
        cart.add(snapshot("Refund", -1, 0, 5)).unwrap();

        let err = CheckoutOrder::new(cart, PaymentMethod::Cash, None, Some(i64::MAX)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Cart total is too large"));
    }

    #[test]
    fn non_cash_payments_have_no_change() {
        let (cart, _, _) = two_line_cart();
        let order = CheckoutOrder::new(cart, PaymentMethod::Card, None, Some(100_000)).unwrap();
        assert_eq!(order.change(), 0);
    }

    #[tokio::test]
    async fn successful_checkout_writes_all_three_steps() {
        let (cart, a, b) = two_line_cart();
        let store = FakeStore::with_stock(&[&a, &b]);
        let order = CheckoutOrder::new(cart, PaymentMethod::Cash, None, Some(30_000)).unwrap();

        let receipt = run(&store, &order).await.unwrap();

        assert_eq!(receipt.transaction.total, 25_000);
        assert_eq!(receipt.transaction.total_purchase_price, 15_000);
        assert_eq!(
            receipt.transaction.total - receipt.transaction.total_purchase_price,
            10_000
        );
        assert_eq!(receipt.change, 5_000);
        assert_eq!(receipt.items.len(), 2);
        assert!(
            receipt
                .items
                .iter()
                .all(|i| i.transaction_id == receipt.transaction.id)
        );
        assert_eq!(receipt.items[0].price, 10_000);
        assert_eq!(receipt.items[0].quantity, 2);

        assert_eq!(store.stock_of(a.id), 3);
        assert_eq!(store.stock_of(b.id), 3);
        assert_eq!(
            receipt.remaining_stock,
            vec![
                StockLevel {
                    product_id: a.id,
                    stock: 3
                },
                StockLevel {
                    product_id: b.id,
                    stock: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn failed_transaction_insert_persists_nothing() {
        let (cart, a, b) = two_line_cart();
        let store = FakeStore::with_stock(&[&a, &b]).failing(FailAt::Transaction);
        let order = CheckoutOrder::new(cart, PaymentMethod::Card, None, None).unwrap();

        let failure = run(&store, &order).await.unwrap_err();

        assert_eq!(failure.stage(), CheckoutStage::Idle);
        assert_eq!(failure.to_string(), "Custom Error: transactions insert failed");
        assert!(store.transactions.lock().unwrap().is_empty());
        assert!(store.items.lock().unwrap().is_empty());
        assert_eq!(store.stock_of(a.id), 5);
    }

    #[tokio::test]
    async fn failed_item_insert_leaves_orphan_transaction() {
        let (cart, a, b) = two_line_cart();
        let store = FakeStore::with_stock(&[&a, &b]).failing(FailAt::Items);
        let order = CheckoutOrder::new(cart, PaymentMethod::Card, None, None).unwrap();

        let failure = run(&store, &order).await.unwrap_err();
        let progress = failure.progress();

        assert_eq!(progress.stage, CheckoutStage::TransactionInserted);
        assert_eq!(store.transactions.lock().unwrap().len(), 1);
        assert_eq!(
            progress.transaction_id,
            Some(store.transactions.lock().unwrap()[0].id)
        );
        assert!(!progress.items_inserted);
        assert!(store.items.lock().unwrap().is_empty());
        assert_eq!(store.stock_of(a.id), 5);
        assert_eq!(store.stock_of(b.id), 4);
    }

    #[tokio::test]
    async fn failed_decrement_keeps_prefix_and_surfaces_message() {
        let (cart, a, b) = two_line_cart();
        let store = FakeStore::with_stock(&[&a, &b]).failing(FailAt::Stock(1));
        let order = CheckoutOrder::new(cart, PaymentMethod::Qris, None, None).unwrap();

        let failure = run(&store, &order).await.unwrap_err();
        let progress = failure.progress();

        assert_eq!(progress.stage, CheckoutStage::StockAdjusting(1));
        assert!(progress.items_inserted);
        assert_eq!(progress.adjusted_products, vec![a.id]);
        assert_eq!(
            failure.to_string(),
            format!("Custom Error: insufficient stock for product {}", b.id)
        );
        // no compensation: the first decrement stays applied
        assert_eq!(store.stock_of(a.id), 3);
        assert_eq!(store.stock_of(b.id), 4);
        assert_eq!(store.items.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn progress_serializes_with_stage_and_line() {
        let (cart, a, b) = two_line_cart();
        let store = FakeStore::with_stock(&[&a, &b]).failing(FailAt::Stock(0));
        let order = CheckoutOrder::new(cart, PaymentMethod::Qris, None, None).unwrap();

        let failure = run(&store, &order).await.unwrap_err().rolled_back();
        let json = serde_json::to_value(failure.progress()).unwrap();

        assert_eq!(json["stage"], "stock_adjusting");
        assert_eq!(json["line"], 0);
        assert_eq!(json["rolled_back"], true);
    }
}
