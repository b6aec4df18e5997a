//! Per-user favorites.

use crate::error::{AppError, FieldErrors};
use crate::models::entry::{ENTRY_COLUMNS, ENTRY_FROM};
use crate::models::favorite::FAVORITE_COLUMNS;
use crate::models::{FavoriteRow, FavoriteView};
use crate::service::validation::{int_field, RequestValidator, ValidationRule};
use serde_json::{Map, Value};
use sqlx::PgPool;

pub const ALREADY_FAVORITED: &str = "entry already favorited";

/// Entry id from a favorite create body.
pub fn entry_from_body(body: &Map<String, Value>) -> Result<i64, AppError> {
    RequestValidator::validate(body, &[("entry", ValidationRule::integer().required())])?;
    int_field(body, "entry").ok_or_else(|| AppError::field("entry", "A valid integer is required."))
}

fn select(where_clause: &str) -> String {
    format!(
        r#"SELECT {}, {} FROM "favorites" f JOIN ({}) ON e."id" = f."entry_id" {}"#,
        FAVORITE_COLUMNS, ENTRY_COLUMNS, ENTRY_FROM, where_clause
    )
}

pub struct FavoriteService;

impl FavoriteService {
    /// The user's favorites, newest first, with the total count.
    pub async fn list(
        pool: &PgPool,
        user_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<FavoriteView>, i64), AppError> {
        let sql = select(r#"WHERE f."user_id" = $1 ORDER BY f."created_at" DESC, f."id" DESC LIMIT $2 OFFSET $3"#);
        let rows = sqlx::query_as::<_, FavoriteRow>(&sql)
            .bind(user_id)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(pool)
            .await?;
        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "favorites" WHERE "user_id" = $1"#)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok((rows.iter().map(FavoriteView::from).collect(), total))
    }

    pub async fn get(pool: &PgPool, user_id: i64, id: i64) -> Result<FavoriteView, AppError> {
        let sql = select(r#"WHERE f."id" = $1 AND f."user_id" = $2"#);
        let row = sqlx::query_as::<_, FavoriteRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("favorite {}", id)))?;
        Ok(FavoriteView::from(&row))
    }

    pub async fn create(pool: &PgPool, user_id: i64, entry_id: i64) -> Result<(), AppError> {
        let exists: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM "entries" WHERE "id" = $1)"#)
            .bind(entry_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::field(
                "entry",
                format!("invalid pk \"{}\": entry does not exist", entry_id),
            ));
        }
        let inserted = sqlx::query(
            r#"INSERT INTO "favorites" ("user_id", "entry_id") VALUES ($1, $2)
               ON CONFLICT ("user_id", "entry_id") DO NOTHING"#,
        )
        .bind(user_id)
        .bind(entry_id)
        .execute(pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(AppError::Validation(FieldErrors::non_field(ALREADY_FAVORITED)));
        }
        tracing::info!(user_id, entry_id, "entry favorited");
        Ok(())
    }

    pub async fn delete(pool: &PgPool, user_id: i64, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(r#"DELETE FROM "favorites" WHERE "id" = $1 AND "user_id" = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("favorite {}", id)));
        }
        Ok(())
    }

    pub async fn check(pool: &PgPool, user_id: i64, entry_id: i64) -> Result<bool, AppError> {
        crate::service::EntryService::is_favorited(pool, user_id, entry_id).await
    }
}
