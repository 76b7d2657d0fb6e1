use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::User;

#[derive(Debug, Deserialize, Serialize, ToSchema, Default)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    /// `admin` or `kasir`.
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Default)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}
