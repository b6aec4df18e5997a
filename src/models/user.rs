use chrono::{DateTime, Utc};
use serde::Serialize;

/// Row of `users`. Never serialized directly: it carries the password hash.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

pub const USER_COLUMNS: &str = r#""id", "username", "email", "password", "first_name", "last_name", "is_active", "is_staff", "date_joined", "last_login""#;

/// Public user fields nested inside entries, history and profiles.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}
