use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    checkout::CheckoutReceipt,
    dto::transactions::{CheckoutRequest, TransactionDetail, TransactionList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::TransactionListQuery,
    services::transaction_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_transaction))
}

#[utoipa::path(
    post,
    path = "/api/transactions/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Sale recorded", body = ApiResponse<CheckoutReceipt>),
        (status = 400, description = "Empty cart, unknown product, not enough stock or cash"),
        (status = 500, description = "A write failed; data.progress tells how far checkout got")
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutReceipt>>> {
    let resp = transaction_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Transactions, newest first", body = ApiResponse<TransactionList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = transaction_service::list_transactions(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction with its items", body = ApiResponse<TransactionDetail>),
        (status = 404, description = "Transaction not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TransactionDetail>>> {
    let resp = transaction_service::get_transaction(&state, &user, id).await?;
    Ok(Json(resp))
}
