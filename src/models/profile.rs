use crate::settings::Settings;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Profile joined with its user and the computed counters.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
    pub bio: String,
    pub avatar: Option<String>,
    pub location: String,
    pub website: String,
    pub entry_count: i64,
    pub favorite_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PROFILE_SELECT: &str = r#"
    SELECT p."id", p."user_id", u."username", u."email", u."first_name", u."last_name", u."date_joined",
           p."bio", p."avatar", p."location", p."website",
           (SELECT COUNT(*) FROM "entries" e WHERE e."author_id" = u."id") AS "entry_count",
           (SELECT COUNT(*) FROM "favorites" f WHERE f."user_id" = u."id") AS "favorite_count",
           p."created_at", p."updated_at"
    FROM "user_profiles" p
    JOIN "users" u ON u."id" = p."user_id"
    WHERE p."user_id" = $1
"#;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
    pub bio: String,
    /// Public URL of the avatar, if one was uploaded.
    pub avatar: Option<String>,
    pub location: String,
    pub website: String,
    pub entry_count: i64,
    pub favorite_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn new(row: ProfileRow, settings: &Settings) -> Self {
        ProfileView {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            date_joined: row.date_joined,
            bio: row.bio,
            avatar: row
                .avatar
                .filter(|a| !a.is_empty())
                .map(|a| settings.media_url_for(&a)),
            location: row.location,
            website: row.website,
            entry_count: row.entry_count,
            favorite_count: row.favorite_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
