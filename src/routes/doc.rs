use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    checkout::{CheckoutReceipt, StockLevel},
    dto::{
        auth::{LoginRequest, LoginResponse},
        categories::{CategoryList, CategoryRequest},
        products::{DecreaseStockRequest, ProductList, ProductRequest},
        reports::{CategorySummary, DashboardReport, MonthlySummary},
        transactions::{
            CheckoutLineRequest, CheckoutRequest, ProductRef, TransactionDetail,
            TransactionItemDetail, TransactionList,
        },
        users::{CreateUserRequest, UpdateUserRequest, UserList},
    },
    models::{Category, CategoryRef, PaymentMethod, Product, Role, Transaction, TransactionItem, User},
    response::{ApiResponse, Meta},
    routes::{
        auth, categories, health, params, products as product_routes, reports, revision,
        transactions, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        revision::current_revision,
        auth::login,
        auth::logout,
        auth::me,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::decrease_stock,
        transactions::checkout,
        transactions::list_transactions,
        transactions::get_transaction,
        reports::dashboard,
        users::list_users,
        users::create_user,
        users::update_user,
        users::delete_user
    ),
    components(
        schemas(
            User,
            Role,
            Category,
            CategoryRef,
            Product,
            PaymentMethod,
            Transaction,
            TransactionItem,
            LoginRequest,
            LoginResponse,
            CategoryRequest,
            CategoryList,
            ProductRequest,
            ProductList,
            DecreaseStockRequest,
            StockLevel,
            CheckoutLineRequest,
            CheckoutRequest,
            CheckoutReceipt,
            TransactionList,
            TransactionDetail,
            TransactionItemDetail,
            ProductRef,
            DashboardReport,
            MonthlySummary,
            CategorySummary,
            CreateUserRequest,
            UpdateUserRequest,
            UserList,
            health::HealthData,
            revision::RevisionData,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CheckoutReceipt>,
            ApiResponse<TransactionList>,
            ApiResponse<DashboardReport>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health and revision endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Transactions", description = "Checkout and sales history"),
        (name = "Reports", description = "Admin dashboard"),
        (name = "Users", description = "User administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
