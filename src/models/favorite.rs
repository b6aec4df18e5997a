use crate::models::{EntryListItem, EntryRow};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Favorite joined with the favorited entry (see [`FAVORITE_COLUMNS`]).
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct FavoriteRow {
    pub favorite_id: i64,
    pub favorited_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub entry: EntryRow,
}

/// Favorite columns prepended to the entry columns; the favorites table must be aliased `f`.
pub const FAVORITE_COLUMNS: &str = r#"f."id" AS "favorite_id", f."created_at" AS "favorited_at""#;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FavoriteView {
    pub id: i64,
    pub entry: EntryListItem,
    pub created_at: DateTime<Utc>,
}

impl From<&FavoriteRow> for FavoriteView {
    fn from(row: &FavoriteRow) -> Self {
        FavoriteView {
            id: row.favorite_id,
            entry: EntryListItem::from(&row.entry),
            created_at: row.favorited_at,
        }
    }
}
