use crate::models::{Category, UserSummary};
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entry joined with its author and category, flattened into prefixed columns.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct EntryRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub is_published: bool,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub category_description: Option<String>,
    pub category_created_at: Option<DateTime<Utc>>,
    pub category_entry_count: i64,
    pub author_id: i64,
    pub author_username: String,
    pub author_email: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_date_joined: DateTime<Utc>,
}

/// SELECT list for [`EntryRow`]; use with [`ENTRY_FROM`].
pub const ENTRY_COLUMNS: &str = r#"e."id", e."title", e."content", e."summary", e."is_published",
    e."view_count", e."like_count", e."created_at", e."updated_at",
    e."category_id", c."name" AS "category_name", c."description" AS "category_description",
    c."created_at" AS "category_created_at",
    (SELECT COUNT(*) FROM "entries" ce WHERE ce."category_id" = e."category_id") AS "category_entry_count",
    u."id" AS "author_id", u."username" AS "author_username", u."email" AS "author_email",
    u."first_name" AS "author_first_name", u."last_name" AS "author_last_name",
    u."date_joined" AS "author_date_joined""#;

pub const ENTRY_FROM: &str = r#""entries" e
    JOIN "users" u ON u."id" = e."author_id"
    LEFT JOIN "categories" c ON c."id" = e."category_id""#;

impl EntryRow {
    pub fn author(&self) -> UserSummary {
        UserSummary {
            id: self.author_id,
            username: self.author_username.clone(),
            email: self.author_email.clone(),
            first_name: self.author_first_name.clone(),
            last_name: self.author_last_name.clone(),
            date_joined: self.author_date_joined,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match (self.category_id, &self.category_name, self.category_created_at) {
            (Some(id), Some(name), Some(created_at)) => Some(Category {
                id,
                name: name.clone(),
                description: self.category_description.clone().unwrap_or_default(),
                entry_count: self.category_entry_count,
                created_at,
            }),
            _ => None,
        }
    }
}

/// Entry as shown in lists, search results and favorites.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryListItem {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub category: Option<Category>,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub view_count: i64,
    pub like_count: i64,
}

impl From<&EntryRow> for EntryListItem {
    fn from(row: &EntryRow) -> Self {
        EntryListItem {
            id: row.id,
            title: row.title.clone(),
            summary: row.summary.clone(),
            category: row.category(),
            author: row.author(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            view_count: row.view_count,
            like_count: row.like_count,
        }
    }
}

/// Full entry including content, images and whether the caller favorited it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryDetail {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: Option<Category>,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub view_count: i64,
    pub like_count: i64,
    pub is_published: bool,
    pub images: Vec<EntryImageView>,
    pub is_favorited: bool,
}

impl EntryDetail {
    pub fn new(row: EntryRow, images: Vec<EntryImageView>, is_favorited: bool) -> Self {
        let category = row.category();
        let author = row.author();
        EntryDetail {
            id: row.id,
            title: row.title,
            content: row.content,
            summary: row.summary,
            category,
            author,
            created_at: row.created_at,
            updated_at: row.updated_at,
            view_count: row.view_count,
            like_count: row.like_count,
            is_published: row.is_published,
            images,
            is_favorited,
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct EntryImage {
    pub id: i64,
    pub entry_id: i64,
    /// Path relative to the media root.
    pub image: String,
    pub caption: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryImageView {
    pub id: i64,
    /// Public URL of the file.
    pub image: String,
    pub caption: String,
    pub uploaded_at: DateTime<Utc>,
}

impl EntryImageView {
    pub fn new(image: &EntryImage, settings: &Settings) -> Self {
        EntryImageView {
            id: image.id,
            image: settings.media_url_for(&image.image),
            caption: image.caption.clone(),
            uploaded_at: image.uploaded_at,
        }
    }
}

/// History row joined with the editor.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub old_content: String,
    pub new_content: String,
    pub edit_summary: String,
    pub edited_at: DateTime<Utc>,
    pub editor_id: i64,
    pub editor_username: String,
    pub editor_email: String,
    pub editor_first_name: String,
    pub editor_last_name: String,
    pub editor_date_joined: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryItem {
    pub id: i64,
    pub editor: UserSummary,
    pub old_content: String,
    pub new_content: String,
    pub edit_summary: String,
    pub edited_at: DateTime<Utc>,
}

impl From<HistoryRow> for HistoryItem {
    fn from(row: HistoryRow) -> Self {
        HistoryItem {
            id: row.id,
            editor: UserSummary {
                id: row.editor_id,
                username: row.editor_username,
                email: row.editor_email,
                first_name: row.editor_first_name,
                last_name: row.editor_last_name,
                date_joined: row.editor_date_joined,
            },
            old_content: row.old_content,
            new_content: row.new_content,
            edit_summary: row.edit_summary,
            edited_at: row.edited_at,
        }
    }
}
