use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{response::ApiResponse, state::AppState};

pub mod auth;
pub mod categories;
pub mod doc;
pub mod health;
pub mod params;
pub mod products;
pub mod reports;
pub mod revision;
pub mod transactions;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/transactions", transactions::router())
        .nest("/reports", reports::router())
        .nest("/users", users::router())
        .route("/revision", get(revision::current_revision))
}

/// Routes, docs and the JSON 404 fallback, bound to `state`. Middleware
/// layers are added by the server binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::failure(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
