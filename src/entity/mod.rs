pub mod audit_logs;
pub mod auth_accounts;
pub mod auth_sessions;
pub mod categories;
pub mod products;
pub mod transaction_items;
pub mod transactions;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use auth_accounts::Entity as AuthAccounts;
pub use auth_sessions::Entity as AuthSessions;
pub use categories::Entity as Categories;
pub use products::Entity as Products;
pub use transaction_items::Entity as TransactionItems;
pub use transactions::Entity as Transactions;
pub use users::Entity as Users;
