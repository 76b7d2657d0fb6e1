//! User administration. Every query here goes through the privileged
//! connection, including the check on the acting user.

use sea_orm::{
    ActiveModelTrait, EntityTrait, QueryOrder, Set, TransactionTrait, ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::users::{CreateUserRequest, UpdateUserRequest, UserList},
    entity::users::{ActiveModel, Column, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User},
    response::{ApiResponse, Meta},
    services::identity_service,
    state::AppState,
};

const ALL_FIELDS_REQUIRED: &str = "All fields are required";
const SELF_DELETE: &str = "You cannot delete your own account";

/// Re-read the acting user's role instead of trusting the session's copy.
async fn require_admin(state: &AppState, user: &AuthUser) -> AppResult<()> {
    let acting = Users::find_by_id(user.user_id)
        .one(&state.admin_orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User profile not found".into()))?;
    if acting.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only admin users can manage users".into(),
        ));
    }
    Ok(())
}

fn required(value: &str) -> AppResult<&str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(ALL_FIELDS_REQUIRED.into()));
    }
    Ok(value)
}

fn parse_role(value: &str) -> AppResult<Role> {
    required(value)?.parse::<Role>().map_err(AppError::BadRequest)
}

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    require_admin(state, user).await?;

    let items: Vec<User> = Users::find()
        .order_by_desc(Column::CreatedAt)
        .all(&state.admin_orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    require_admin(state, user).await?;

    let email = required(&payload.email)?;
    // passwords are taken as typed
    if payload.password.is_empty() {
        return Err(AppError::BadRequest(ALL_FIELDS_REQUIRED.into()));
    }
    let full_name = required(&payload.full_name)?;
    let role = parse_role(&payload.role)?;

    let txn = state.admin_orm.begin().await?;
    let account = identity_service::create_account(&txn, email, &payload.password).await?;
    let profile = ActiveModel {
        id: Set(Uuid::new_v4()),
        auth_user_id: Set(account.id),
        email: Set(account.email.clone()),
        full_name: Set(full_name.to_string()),
        role: Set(role),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    state.invalidation.bump("user created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::UserCreate,
        serde_json::json!({ "target_user_id": profile.id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        User::from(profile),
        Some(Meta::empty()),
    ))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    require_admin(state, user).await?;

    let full_name = required(&payload.full_name)?;
    let role = parse_role(&payload.role)?;

    let existing = Users::find_by_id(id)
        .one(&state.admin_orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.full_name = Set(full_name.to_string());
    active.role = Set(role);
    active.updated_at = Set(chrono::Utc::now().into());
    let updated = active.update(&state.admin_orm).await?;

    state.invalidation.bump("user updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::UserUpdate,
        serde_json::json!({ "target_user_id": id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if id == user.user_id {
        return Err(AppError::Conflict(SELF_DELETE.into()));
    }
    require_admin(state, user).await?;

    let target = Users::find_by_id(id)
        .one(&state.admin_orm)
        .await?
        .ok_or(AppError::NotFound)?;
    identity_service::delete_account(&state.admin_orm, target.auth_user_id).await?;

    state.invalidation.bump("user deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::UserDelete,
        serde_json::json!({ "target_user_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
