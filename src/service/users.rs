//! Accounts, tokens and profiles.

use crate::auth::{generate_key, hash_password, verify_password};
use crate::error::{AppError, FieldErrors};
use crate::models::profile::PROFILE_SELECT;
use crate::models::user::USER_COLUMNS;
use crate::models::{ProfileRow, ProfileView, User};
use crate::service::validation::{str_field, Format, RequestValidator, ValidationRule};
use crate::settings::Settings;
use crate::sql::{update_by_id, Assignment};
use serde_json::{Map, Value};
use sqlx::PgPool;

const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterInput {
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, AppError> {
        let rules = [
            (
                "username",
                ValidationRule::string().required().max_length(150).pattern(USERNAME_PATTERN),
            ),
            ("email", ValidationRule::string().blank().max_length(254).format(Format::Email)),
            ("password", ValidationRule::string().required().min_length(MIN_PASSWORD_LENGTH)),
            ("password_confirm", ValidationRule::string().required()),
            ("first_name", ValidationRule::string().blank().max_length(150)),
            ("last_name", ValidationRule::string().blank().max_length(150)),
        ];
        RequestValidator::validate(body, &rules)?;
        let password = str_field(body, "password").unwrap_or_default();
        if Some(&password) != str_field(body, "password_confirm").as_ref() {
            return Err(AppError::Validation(FieldErrors::non_field("passwords do not match")));
        }
        Ok(RegisterInput {
            username: str_field(body, "username").unwrap_or_default().trim().to_string(),
            email: str_field(body, "email").unwrap_or_default(),
            password,
            first_name: str_field(body, "first_name").unwrap_or_default(),
            last_name: str_field(body, "last_name").unwrap_or_default(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, AppError> {
        let username = str_field(body, "username").filter(|s| !s.is_empty());
        let password = str_field(body, "password").filter(|s| !s.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok(LoginInput { username, password }),
            _ => Err(AppError::Validation(FieldErrors::non_field(
                "username and password are required",
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordInput {
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, AppError> {
        let rules = [
            ("old_password", ValidationRule::string().required()),
            ("new_password", ValidationRule::string().required().min_length(MIN_PASSWORD_LENGTH)),
            ("new_password_confirm", ValidationRule::string().required()),
        ];
        RequestValidator::validate(body, &rules)?;
        let new_password = str_field(body, "new_password").unwrap_or_default();
        if Some(&new_password) != str_field(body, "new_password_confirm").as_ref() {
            return Err(AppError::Validation(FieldErrors::non_field("new passwords do not match")));
        }
        Ok(ChangePasswordInput {
            old_password: str_field(body, "old_password").unwrap_or_default(),
            new_password,
        })
    }
}

/// Writable profile fields; user fields in the body are ignored.
pub fn profile_assignments(body: &Map<String, Value>) -> Result<Vec<Assignment>, AppError> {
    let rules = [
        ("bio", ValidationRule::string().blank().max_length(500)),
        ("location", ValidationRule::string().blank().max_length(100)),
        ("website", ValidationRule::string().blank().max_length(200).format(Format::Url)),
    ];
    RequestValidator::validate_partial(body, &rules)?;
    Ok(rules
        .iter()
        .filter_map(|(field, _)| {
            str_field(body, field).map(|v| Assignment::new(*field, "text", Value::String(v)))
        })
        .collect())
}

pub struct UserService;

impl UserService {
    pub async fn by_token(pool: &PgPool, key: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM "users" WHERE "id" = (SELECT "user_id" FROM "auth_tokens" WHERE "key" = $1)"#,
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql).bind(key).fetch_optional(pool).await?)
    }

    pub async fn by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!(r#"SELECT {} FROM "users" WHERE "username" = $1"#, USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(username).fetch_optional(pool).await?)
    }

    /// Create the user, its profile and its token in one transaction. Returns the user and token key.
    pub async fn register(pool: &PgPool, input: &RegisterInput) -> Result<(User, String), AppError> {
        if Self::by_username(pool, &input.username).await?.is_some() {
            return Err(AppError::field("username", "a user with that username already exists"));
        }
        let hash = hash_password(&input.password).await?;
        let mut tx = pool.begin().await?;
        let sql = format!(
            r#"INSERT INTO "users" ("username", "email", "password", "first_name", "last_name")
               VALUES ($1, $2, $3, $4, $5) RETURNING {}"#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::Db(e).unique_violation_on("username", "a user with that username already exists"))?;
        sqlx::query(r#"INSERT INTO "user_profiles" ("user_id") VALUES ($1)"#)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        let key = generate_key();
        sqlx::query(r#"INSERT INTO "auth_tokens" ("key", "user_id") VALUES ($1, $2)"#)
            .bind(&key)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok((user, key))
    }

    /// Check credentials; failures are reported as validation errors, like any bad form input.
    pub async fn authenticate(pool: &PgPool, input: &LoginInput) -> Result<User, AppError> {
        let invalid = || AppError::Validation(FieldErrors::non_field("invalid username or password"));
        let user = match Self::by_username(pool, &input.username).await? {
            Some(u) => u,
            None => {
                tracing::info!(username = %input.username, "login for unknown user");
                return Err(invalid());
            }
        };
        if !verify_password(&input.password, &user.password).await? {
            tracing::info!(user_id = user.id, "login with wrong password");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(AppError::Validation(FieldErrors::non_field("user account is disabled")));
        }
        sqlx::query(r#"UPDATE "users" SET "last_login" = NOW() WHERE "id" = $1"#)
            .bind(user.id)
            .execute(pool)
            .await?;
        Ok(user)
    }

    pub async fn get_or_create_token(pool: &PgPool, user_id: i64) -> Result<String, AppError> {
        sqlx::query(r#"INSERT INTO "auth_tokens" ("key", "user_id") VALUES ($1, $2) ON CONFLICT ("user_id") DO NOTHING"#)
            .bind(generate_key())
            .bind(user_id)
            .execute(pool)
            .await?;
        let key: String = sqlx::query_scalar(r#"SELECT "key" FROM "auth_tokens" WHERE "user_id" = $1"#)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok(key)
    }

    /// Revoke the caller's token.
    pub async fn logout(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
        sqlx::query(r#"DELETE FROM "auth_tokens" WHERE "user_id" = $1"#)
            .bind(user_id)
            .execute(pool)
            .await?;
        tracing::info!(user_id, "user logged out");
        Ok(())
    }

    pub async fn change_password(pool: &PgPool, user: &User, input: &ChangePasswordInput) -> Result<(), AppError> {
        if !verify_password(&input.old_password, &user.password).await? {
            return Err(AppError::field("old_password", "old password is incorrect"));
        }
        let hash = hash_password(&input.new_password).await?;
        sqlx::query(r#"UPDATE "users" SET "password" = $1 WHERE "id" = $2"#)
            .bind(&hash)
            .bind(user.id)
            .execute(pool)
            .await?;
        tracing::info!(user_id = user.id, "password changed");
        Ok(())
    }

    /// Profile of `user_id`, created on the fly if the user somehow has none.
    pub async fn profile(pool: &PgPool, settings: &Settings, user_id: i64) -> Result<ProfileView, AppError> {
        Ok(ProfileView::new(Self::profile_row(pool, user_id).await?, settings))
    }

    async fn profile_row(pool: &PgPool, user_id: i64) -> Result<ProfileRow, AppError> {
        sqlx::query(r#"INSERT INTO "user_profiles" ("user_id") VALUES ($1) ON CONFLICT ("user_id") DO NOTHING"#)
            .bind(user_id)
            .execute(pool)
            .await?;
        let row = sqlx::query_as::<_, ProfileRow>(PROFILE_SELECT)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile of user {}", user_id)))?;
        Ok(row)
    }

    pub async fn update_profile(
        pool: &PgPool,
        settings: &Settings,
        user_id: i64,
        body: &Map<String, Value>,
    ) -> Result<ProfileView, AppError> {
        let assignments = profile_assignments(body)?;
        let row = Self::profile_row(pool, user_id).await?;
        if !assignments.is_empty() {
            if let Some(q) = update_by_id("user_profiles", row.id, &assignments, Some("updated_at")) {
                q.query().execute(pool).await?;
            }
        }
        Self::profile(pool, settings, user_id).await
    }

    /// Point the profile at a newly stored avatar. Returns the path it replaced, if any.
    pub async fn set_avatar(pool: &PgPool, user_id: i64, path: &str) -> Result<Option<String>, AppError> {
        let row = Self::profile_row(pool, user_id).await?;
        sqlx::query(r#"UPDATE "user_profiles" SET "avatar" = $1, "updated_at" = NOW() WHERE "id" = $2"#)
            .bind(path)
            .bind(row.id)
            .execute(pool)
            .await?;
        Ok(row.avatar.filter(|a| !a.is_empty()))
    }
}
