use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevisionData {
    pub revision: u64,
}

#[utoipa::path(
    get,
    path = "/api/revision",
    responses(
        (status = 200, description = "Current data revision", body = ApiResponse<RevisionData>),
    ),
    tag = "Health"
)]
pub async fn current_revision(State(state): State<AppState>) -> Json<ApiResponse<RevisionData>> {
    Json(ApiResponse::success(
        "Revision",
        RevisionData {
            revision: state.invalidation.current(),
        },
        Some(Meta::empty()),
    ))
}
