pub mod auth;
pub mod categories;
pub mod products;
pub mod reports;
pub mod transactions;
pub mod users;
