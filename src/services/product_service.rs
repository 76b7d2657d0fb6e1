use sea_orm::{
    ActiveModelTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set, ActiveValue::NotSet,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    checkout::{StockLevel, store::decrease_stock},
    dto::products::{DecreaseStockRequest, ProductList, ProductRequest},
    entity::{
        categories::{Column as CatCol, Entity as Categories},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, contains_pattern},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Products, Column::Name)).ilike(pattern.clone()))
                .add(Expr::col((Categories, CatCol::Name)).ilike(pattern)),
        );
    }

    let items: Vec<Product> = Products::find()
        .find_also_related(Categories)
        .filter(condition)
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(p, c)| Product::from_entity(p, c))
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let (product, category) = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Product",
        Product::from_entity(product, category),
        None,
    ))
}

fn validated_name(payload: &ProductRequest) -> AppResult<String> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name must not be empty".into()));
    }
    Ok(name.to_string())
}

async fn with_category(state: &AppState, id: Uuid) -> AppResult<Product> {
    let (product, category) = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Product::from_entity(product, category))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: ProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let name = validated_name(&payload)?;
    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        price: Set(payload.price),
        purchase_price: Set(payload.purchase_price),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    state.invalidation.bump("product created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        with_category(state, product.id).await?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let name = validated_name(&payload)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.price = Set(payload.price);
    active.purchase_price = Set(payload.purchase_price);
    active.stock = Set(payload.stock);
    active.category_id = Set(payload.category_id);
    let product = active.update(&state.orm).await?;

    state.invalidation.bump("product updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductUpdate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        with_category(state, product.id).await?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    state.invalidation.bump("product deleted");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Run the stock decrement procedure directly and report what it returned.
pub async fn decrease_product_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: DecreaseStockRequest,
) -> AppResult<ApiResponse<StockLevel>> {
    let stock = decrease_stock(&state.orm, id, payload.amount).await?;

    state.invalidation.bump("stock decreased");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::StockDecrease,
        serde_json::json!({ "product_id": id, "amount": payload.amount, "stock": stock }),
    )
    .await;

    Ok(ApiResponse::success(
        "Stock updated",
        StockLevel {
            product_id: id,
            stock,
        },
        Some(Meta::empty()),
    ))
}
