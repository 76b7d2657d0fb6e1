use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::reports::DashboardReport,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[utoipa::path(
    get,
    path = "/api/reports/dashboard",
    responses(
        (status = 200, description = "Sales dashboard", body = ApiResponse<DashboardReport>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardReport>>> {
    let resp = report_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}
