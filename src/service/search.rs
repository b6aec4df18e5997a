//! Combined keyword search over published entries and categories.

use crate::error::AppError;
use crate::models::category::CATEGORY_COLUMNS;
use crate::models::entry::{ENTRY_COLUMNS, ENTRY_FROM};
use crate::models::{Category, EntryListItem, EntryRow};
use crate::sql::{contains_pattern, select_entries, EntryFilter};
use serde::Serialize;
use sqlx::PgPool;

pub const ENTRY_LIMIT: u32 = 10;
pub const CATEGORY_LIMIT: i64 = 5;
pub const QUERY_REQUIRED: &str = "search query parameter q is required";

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub entries: Vec<EntryListItem>,
    pub categories: Vec<Category>,
    pub query: String,
}

/// Trimmed search term; blank or absent is a bad request.
pub fn query_term(q: Option<&str>) -> Result<&str, AppError> {
    match q.map(str::trim) {
        Some(q) if !q.is_empty() => Ok(q),
        _ => Err(AppError::BadRequest(QUERY_REQUIRED.into())),
    }
}

pub struct SearchService;

impl SearchService {
    pub async fn search(pool: &PgPool, q: &str) -> Result<SearchResults, AppError> {
        let filter = EntryFilter {
            search: Some(q.to_string()),
            ..EntryFilter::default()
        };
        let rows: Vec<EntryRow> = select_entries(ENTRY_COLUMNS, ENTRY_FROM, &filter, ENTRY_LIMIT, 0)
            .query_as::<EntryRow>()
            .fetch_all(pool)
            .await?;
        let sql = format!(
            r#"SELECT {} FROM "categories" c
               WHERE c."name" ILIKE $1 OR c."description" ILIKE $1
               ORDER BY c."name" LIMIT $2"#,
            CATEGORY_COLUMNS
        );
        let categories = sqlx::query_as::<_, Category>(&sql)
            .bind(contains_pattern(q))
            .bind(CATEGORY_LIMIT)
            .fetch_all(pool)
            .await?;
        tracing::debug!(query = %q, entries = rows.len(), categories = categories.len(), "search");
        Ok(SearchResults {
            entries: rows.iter().map(EntryListItem::from).collect(),
            categories,
            query: q.to_string(),
        })
    }
}
