pub mod auth_service;
pub mod category_service;
pub mod identity_service;
pub mod product_service;
pub mod report_service;
pub mod transaction_service;
pub mod user_service;
