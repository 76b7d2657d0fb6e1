use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set, ActiveValue::NotSet};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    db::DbPool,
    dto::categories::{CategoryList, CategoryRequest},
    entity::categories::{ActiveModel, Column, Entity as Categories},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

const EMPTY_NAME: &str = "Category name must not be empty";
const IN_USE: &str = "Category cannot be deleted because it is still used by products";

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let name = payload
        .validated_name()
        .ok_or_else(|| AppError::BadRequest(EMPTY_NAME.into()))?;

    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    state.invalidation.bump("category created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::CategoryCreate,
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let name = payload
        .validated_name()
        .ok_or_else(|| AppError::BadRequest(EMPTY_NAME.into()))?;

    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    let category = active.update(&state.orm).await?;

    state.invalidation.bump("category updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::CategoryUpdate,
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category updated",
        Category::from(category),
        Some(Meta::empty()),
    ))
}

/// Whether any product still points at the category.
pub async fn category_in_use(pool: &DbPool, id: Uuid) -> AppResult<bool> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE category_id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if category_in_use(&state.pool, id).await? {
        return Err(AppError::Conflict(IN_USE.into()));
    }

    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    state.invalidation.bump("category deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::CategoryDelete,
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
