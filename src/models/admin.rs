// src/models/admin.rs

use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'admins' table in the database.
/// Students never log in; only dashboard users have accounts.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i64,

    pub username: String,

    /// Argon2 password hash.
    pub password: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
