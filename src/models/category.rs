use chrono::{DateTime, Utc};
use serde::Serialize;

/// Category with the number of entries filed under it (published or not).
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub entry_count: i64,
    pub created_at: DateTime<Utc>,
}

/// SELECT list for [`Category`]; the table must be aliased `c`.
pub const CATEGORY_COLUMNS: &str = r#"c."id", c."name", c."description",
    (SELECT COUNT(*) FROM "entries" ce WHERE ce."category_id" = c."id") AS "entry_count",
    c."created_at""#;
