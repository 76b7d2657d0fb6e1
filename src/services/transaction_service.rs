use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    checkout::{self, Cart, CheckoutOrder, CheckoutReceipt, ProductSnapshot, SeaCheckoutStore},
    dto::transactions::{
        CheckoutRequest, ProductRef, TransactionDetail, TransactionItemDetail, TransactionList,
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        transaction_items::{Column as ItemCol, Entity as TransactionItems},
        transactions::{Column, Entity as Transactions},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Transaction,
    response::{ApiResponse, Meta},
    routes::params::{TransactionListQuery, contains_pattern},
    state::AppState,
};

/// Price the requested lines against current catalog rows.
async fn build_cart(state: &AppState, payload: &CheckoutRequest) -> AppResult<Cart> {
    let ids: Vec<Uuid> = payload.items.iter().map(|l| l.product_id).collect();
    let products: HashMap<Uuid, ProductSnapshot> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, ProductSnapshot::from(p)))
        .collect();

    let mut cart = Cart::new();
    for line in &payload.items {
        let product = products
            .get(&line.product_id)
            .cloned()
            .ok_or_else(|| AppError::BadRequest(format!("Product {} not found", line.product_id)))?;
        cart.add_quantity(product, line.quantity)?;
    }
    Ok(cart)
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutReceipt>> {
    let cart = build_cart(state, &payload).await?;
    let order = CheckoutOrder::new(
        cart,
        payload.payment_method,
        payload.postage,
        payload.cash_received,
    )?;

    let receipt = if state.config.checkout_atomic {
        let txn = state.orm.begin().await?;
        let outcome = checkout::run(&SeaCheckoutStore::new(&txn), &order).await;
        match outcome {
            Ok(receipt) => {
                txn.commit().await?;
                receipt
            }
            Err(failure) => {
                if let Err(err) = txn.rollback().await {
                    tracing::error!(error = %err, "checkout rollback failed");
                }
                return Err(failure.rolled_back().into());
            }
        }
    } else {
        checkout::run(&SeaCheckoutStore::new(&state.orm), &order).await?
    };

    state.invalidation.bump("checkout");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::Checkout,
        serde_json::json!({
            "transaction_id": receipt.transaction.id,
            "total": receipt.transaction.total,
            "payment_method": receipt.transaction.payment_method,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Transaction completed",
        receipt,
        Some(Meta::empty()),
    ))
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn history_filter(query: &TransactionListQuery) -> AppResult<Condition> {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::cust_with_values(
                    r#"CAST("transactions"."id" AS TEXT) ILIKE ?"#,
                    [pattern.clone()],
                ))
                .add(Expr::col(Column::PaymentMethod).ilike(pattern)),
        );
    }

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::BadRequest(
                "start_date must not be after end_date".into(),
            ));
        }
    }
    if let Some(start) = query.start_date {
        condition = condition.add(Column::CreatedAt.gte(start_of(start)));
    }
    if let Some(end) = query.end_date {
        let next = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::BadRequest("end_date is out of range".into()))?;
        condition = condition.add(Column::CreatedAt.lt(start_of(next)));
    }
    Ok(condition)
}

pub async fn list_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    ensure_admin(user)?;
    let (page, per_page, offset) = query.pagination().normalize();

    let finder = Transactions::find()
        .filter(history_filter(&query)?)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(per_page as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Transaction::from)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        TransactionList { items },
        Some(Meta::new(page, per_page, total)),
    ))
}

pub async fn get_transaction(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<TransactionDetail>> {
    ensure_admin(user)?;

    let transaction = Transactions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = TransactionItems::find()
        .filter(ItemCol::TransactionId.eq(id))
        .find_also_related(Products)
        .order_by_asc(ItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(item, product)| TransactionItemDetail {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            purchase_price: item.purchase_price,
            subtotal: item.price.saturating_mul(i64::from(item.quantity)),
            product: product.map(|p| ProductRef {
                id: p.id,
                name: p.name,
            }),
        })
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        TransactionDetail {
            transaction: transaction.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}
