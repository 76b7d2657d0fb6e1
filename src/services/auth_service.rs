use sea_orm::EntityTrait;

use crate::{
    audit::{self, AuditAction},
    dto::auth::{LoginRequest, LoginResponse},
    entity::users::Entity as Users,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User},
    response::{ApiResponse, Meta},
    services::identity_service,
    state::AppState,
};

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let signed_in = identity_service::sign_in(state, email, &password).await?;
    let user = User::from(signed_in.profile);
    let home = match user.role {
        Role::Admin => "/admin",
        Role::Kasir => "/",
    };

    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::Login,
        serde_json::json!({ "session_id": signed_in.session.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: signed_in.token,
            user,
            home: home.to_string(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn logout_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    identity_service::sign_out(state, user.session_id).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::Logout,
        serde_json::json!({ "session_id": user.session_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged out",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let profile = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Current user", User::from(profile), None))
}
