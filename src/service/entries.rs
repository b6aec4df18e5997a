//! Entries: listing, detail with view counting, create, update with edit history, likes, images.

use crate::error::{AppError, FieldErrors};
use crate::models::entry::{ENTRY_COLUMNS, ENTRY_FROM};
use crate::models::{EntryDetail, EntryImage, EntryImageView, EntryListItem, EntryRow, HistoryItem, HistoryRow};
use crate::service::categories::CategoryService;
use crate::service::validation::{bool_field, int_field, str_field, RequestValidator, ValidationRule};
use crate::settings::Settings;
use crate::sql::{count_entries, select_entries, update_by_id, Assignment, EntryFilter};
use serde_json::{Map, Value};
use sqlx::PgPool;

pub const EDIT_SUMMARY: &str = "Updated entry content";
const DUPLICATE_TITLE: &str = "an entry with this title already exists";

fn rules() -> [(&'static str, ValidationRule); 5] {
    [
        ("title", ValidationRule::string().required().max_length(200)),
        ("content", ValidationRule::string().required()),
        ("summary", ValidationRule::string().blank().max_length(500)),
        ("category", ValidationRule::integer().nullable()),
        ("is_published", ValidationRule::boolean()),
    ]
}

/// Validated writable entry fields. On partial updates absent fields are None;
/// `category: Some(None)` clears the category.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub category: Option<Option<i64>>,
    pub is_published: Option<bool>,
}

impl EntryChanges {
    pub fn from_body(body: &Map<String, Value>, partial: bool) -> Result<Self, AppError> {
        let rules = rules();
        if partial {
            RequestValidator::validate_partial(body, &rules)?;
        } else {
            RequestValidator::validate(body, &rules)?;
        }
        let category = match body.get("category") {
            None => None,
            Some(Value::Null) => Some(None),
            Some(_) => Some(int_field(body, "category")),
        };
        Ok(EntryChanges {
            title: str_field(body, "title").map(|t| t.trim().to_string()),
            content: str_field(body, "content"),
            summary: str_field(body, "summary"),
            category,
            is_published: bool_field(body, "is_published"),
        })
    }

    fn assignments(&self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(v) = &self.title {
            out.push(Assignment::new("title", "text", Value::String(v.clone())));
        }
        if let Some(v) = &self.content {
            out.push(Assignment::new("content", "text", Value::String(v.clone())));
        }
        if let Some(v) = &self.summary {
            out.push(Assignment::new("summary", "text", Value::String(v.clone())));
        }
        if let Some(v) = self.category {
            out.push(Assignment::new("category_id", "bigint", v.map(Value::from).unwrap_or(Value::Null)));
        }
        if let Some(v) = self.is_published {
            out.push(Assignment::new("is_published", "boolean", Value::Bool(v)));
        }
        out
    }
}

/// Query-string filters of the entry list; unparsable ids are ignored.
pub fn filter_from_query(params: &std::collections::HashMap<String, String>) -> EntryFilter {
    let id = |k: &str| params.get(k).and_then(|v| v.trim().parse::<i64>().ok());
    EntryFilter {
        search: params.get("search").map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        category_id: id("category"),
        author_id: id("author"),
    }
}

pub struct EntryService;

impl EntryService {
    /// Published entries matching the filter, newest first, plus the unpaginated total.
    pub async fn list(
        pool: &PgPool,
        filter: &EntryFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<EntryListItem>, i64), AppError> {
        let q = select_entries(ENTRY_COLUMNS, ENTRY_FROM, filter, limit, offset);
        let rows: Vec<EntryRow> = q.query_as::<EntryRow>().fetch_all(pool).await?;
        let total: i64 = count_entries(filter).query_scalar::<i64>().fetch_one(pool).await?;
        Ok((rows.iter().map(EntryListItem::from).collect(), total))
    }

    /// Published entry by id.
    pub async fn row(pool: &PgPool, id: i64) -> Result<EntryRow, AppError> {
        Self::fetch_row(pool, id, true).await
    }

    async fn fetch_row(pool: &PgPool, id: i64, published_only: bool) -> Result<EntryRow, AppError> {
        let sql = format!(
            r#"SELECT {} FROM {} WHERE e."id" = $1 AND (e."is_published" OR NOT $2)"#,
            ENTRY_COLUMNS, ENTRY_FROM
        );
        sqlx::query_as::<_, EntryRow>(&sql)
            .bind(id)
            .bind(published_only)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("entry {}", id)))
    }

    pub async fn images(pool: &PgPool, entry_id: i64) -> Result<Vec<EntryImage>, AppError> {
        Ok(sqlx::query_as::<_, EntryImage>(
            r#"SELECT "id", "entry_id", "image", "caption", "uploaded_at"
               FROM "entry_images" WHERE "entry_id" = $1 ORDER BY "id""#,
        )
        .bind(entry_id)
        .fetch_all(pool)
        .await?)
    }

    pub async fn is_favorited(pool: &PgPool, user_id: i64, entry_id: i64) -> Result<bool, AppError> {
        let found: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM "favorites" WHERE "user_id" = $1 AND "entry_id" = $2)"#,
        )
        .bind(user_id)
        .bind(entry_id)
        .fetch_one(pool)
        .await?;
        Ok(found)
    }

    /// Detail view of a published entry as seen by `viewer`.
    pub async fn detail(
        pool: &PgPool,
        settings: &Settings,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<EntryDetail, AppError> {
        Self::build_detail(pool, settings, Self::row(pool, id).await?, viewer).await
    }

    async fn build_detail(
        pool: &PgPool,
        settings: &Settings,
        row: EntryRow,
        viewer: Option<i64>,
    ) -> Result<EntryDetail, AppError> {
        let id = row.id;
        let images = Self::images(pool, id)
            .await?
            .iter()
            .map(|i| EntryImageView::new(i, settings))
            .collect();
        let is_favorited = match viewer {
            Some(user_id) => Self::is_favorited(pool, user_id, id).await?,
            None => false,
        };
        Ok(EntryDetail::new(row, images, is_favorited))
    }

    /// Count a view, then return the detail with the new count.
    pub async fn retrieve(
        pool: &PgPool,
        settings: &Settings,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<EntryDetail, AppError> {
        let result = sqlx::query(
            r#"UPDATE "entries" SET "view_count" = "view_count" + 1 WHERE "id" = $1 AND "is_published" = TRUE"#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("entry {}", id)));
        }
        Self::detail(pool, settings, id, viewer).await
    }

    async fn title_taken(pool: &PgPool, title: &str, except: Option<i64>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM "entries" WHERE "title" = $1 AND ($2::bigint IS NULL OR "id" <> $2))"#,
        )
        .bind(title)
        .bind(except)
        .fetch_one(pool)
        .await?;
        Ok(taken)
    }

    /// Checks that need the database: title uniqueness and category existence.
    async fn check_references(pool: &PgPool, changes: &EntryChanges, except: Option<i64>) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        if let Some(title) = changes.title.as_deref() {
            if Self::title_taken(pool, title, except).await? {
                errors.add("title", DUPLICATE_TITLE);
            }
        }
        if let Some(Some(category_id)) = changes.category {
            if !CategoryService::exists(pool, category_id).await? {
                errors.add("category", format!("invalid pk \"{}\": category does not exist", category_id));
            }
        }
        errors.into_result()
    }

    pub async fn create(
        pool: &PgPool,
        settings: &Settings,
        author_id: i64,
        changes: &EntryChanges,
    ) -> Result<EntryDetail, AppError> {
        Self::check_references(pool, changes, None).await?;
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO "entries" ("title", "content", "summary", "category_id", "author_id", "is_published")
               VALUES ($1, $2, $3, $4, $5, $6) RETURNING "id""#,
        )
        .bind(changes.title.as_deref().unwrap_or_default())
        .bind(changes.content.as_deref().unwrap_or_default())
        .bind(changes.summary.as_deref().unwrap_or_default())
        .bind(changes.category.flatten())
        .bind(author_id)
        .bind(changes.is_published.unwrap_or(true))
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::Db(e).unique_violation_on("title", DUPLICATE_TITLE))?;
        tracing::info!(entry_id = id, author_id, "entry created");
        // the response shows the entry even when it was saved unpublished
        let row = Self::fetch_row(pool, id, false).await?;
        Self::build_detail(pool, settings, row, Some(author_id)).await
    }

    /// Record an edit history row and apply the changes, atomically.
    pub async fn update(
        pool: &PgPool,
        settings: &Settings,
        id: i64,
        editor_id: i64,
        changes: &EntryChanges,
    ) -> Result<EntryDetail, AppError> {
        Self::check_references(pool, changes, Some(id)).await?;
        let mut tx = pool.begin().await?;
        let old_content: String = sqlx::query_scalar(
            r#"SELECT "content" FROM "entries" WHERE "id" = $1 AND "is_published" = TRUE FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("entry {}", id)))?;
        let new_content = changes.content.clone().unwrap_or_else(|| old_content.clone());
        sqlx::query(
            r#"INSERT INTO "entry_history" ("entry_id", "editor_id", "old_content", "new_content", "edit_summary")
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(id)
        .bind(editor_id)
        .bind(&old_content)
        .bind(&new_content)
        .bind(EDIT_SUMMARY)
        .execute(&mut *tx)
        .await?;
        if let Some(q) = update_by_id("entries", id, &changes.assignments(), Some("updated_at")) {
            q.query()
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Db(e).unique_violation_on("title", DUPLICATE_TITLE))?;
        }
        tx.commit().await?;
        tracing::info!(entry_id = id, editor_id, "entry updated");
        let row = Self::fetch_row(pool, id, false).await?;
        Self::build_detail(pool, settings, row, Some(editor_id)).await
    }

    /// Delete a published entry. Returns the media paths of its images so the caller can remove the files.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<Vec<String>, AppError> {
        let mut tx = pool.begin().await?;
        // row lock blocks image inserts (FK check) until the entry is gone
        let locked: Option<i64> = sqlx::query_scalar(
            r#"SELECT "id" FROM "entries" WHERE "id" = $1 AND "is_published" = TRUE FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("entry {}", id)));
        }
        let images: Vec<String> =
            sqlx::query_scalar(r#"DELETE FROM "entry_images" WHERE "entry_id" = $1 RETURNING "image""#)
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        sqlx::query(r#"DELETE FROM "entries" WHERE "id" = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(entry_id = id, images = images.len(), "entry deleted");
        Ok(images)
    }

    /// Add one like; returns the new count.
    pub async fn like(pool: &PgPool, id: i64) -> Result<i64, AppError> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"UPDATE "entries" SET "like_count" = "like_count" + 1
               WHERE "id" = $1 AND "is_published" = TRUE RETURNING "like_count""#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        count.ok_or_else(|| AppError::NotFound(format!("entry {}", id)))
    }

    /// Edit history of a published entry, newest first.
    pub async fn history(pool: &PgPool, id: i64) -> Result<Vec<HistoryItem>, AppError> {
        Self::row(pool, id).await?;
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"SELECT h."id", h."old_content", h."new_content", h."edit_summary", h."edited_at",
                      u."id" AS "editor_id", u."username" AS "editor_username", u."email" AS "editor_email",
                      u."first_name" AS "editor_first_name", u."last_name" AS "editor_last_name",
                      u."date_joined" AS "editor_date_joined"
               FROM "entry_history" h JOIN "users" u ON u."id" = h."editor_id"
               WHERE h."entry_id" = $1
               ORDER BY h."edited_at" DESC, h."id" DESC"#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(HistoryItem::from).collect())
    }

    pub async fn add_image(
        pool: &PgPool,
        settings: &Settings,
        entry_id: i64,
        path: &str,
        caption: &str,
    ) -> Result<EntryImageView, AppError> {
        let image = sqlx::query_as::<_, EntryImage>(
            r#"INSERT INTO "entry_images" ("entry_id", "image", "caption") VALUES ($1, $2, $3)
               RETURNING "id", "entry_id", "image", "caption", "uploaded_at""#,
        )
        .bind(entry_id)
        .bind(path)
        .bind(caption)
        .fetch_one(pool)
        .await?;
        tracing::info!(entry_id, image_id = image.id, "image attached");
        Ok(EntryImageView::new(&image, settings))
    }

    /// Remove an image row of a published entry; returns its media path.
    pub async fn delete_image(pool: &PgPool, entry_id: i64, image_id: i64) -> Result<String, AppError> {
        Self::row(pool, entry_id).await?;
        let path: Option<String> = sqlx::query_scalar(
            r#"DELETE FROM "entry_images" WHERE "id" = $1 AND "entry_id" = $2 RETURNING "image""#,
        )
        .bind(image_id)
        .bind(entry_id)
        .fetch_optional(pool)
        .await?;
        path.ok_or_else(|| AppError::NotFound(format!("image {}", image_id)))
    }
}
