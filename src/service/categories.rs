//! Category CRUD.

use crate::error::AppError;
use crate::models::category::CATEGORY_COLUMNS;
use crate::models::Category;
use crate::service::validation::{str_field, RequestValidator, ValidationRule};
use crate::sql::{update_by_id, Assignment};
use serde_json::{Map, Value};
use sqlx::PgPool;

const DUPLICATE_NAME: &str = "a category with this name already exists";

fn rules() -> [(&'static str, ValidationRule); 2] {
    [
        ("name", ValidationRule::string().required().max_length(100)),
        ("description", ValidationRule::string().blank()),
    ]
}

/// Validated category fields. On partial updates absent fields are None.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryChanges {
    pub fn from_body(body: &Map<String, Value>, partial: bool) -> Result<Self, AppError> {
        let rules = rules();
        if partial {
            RequestValidator::validate_partial(body, &rules)?;
        } else {
            RequestValidator::validate(body, &rules)?;
        }
        let description = str_field(body, "description");
        Ok(CategoryChanges {
            name: str_field(body, "name").map(|n| n.trim().to_string()),
            // a full update resets an omitted description, like a create
            description: if partial { description } else { Some(description.unwrap_or_default()) },
        })
    }

    fn assignments(&self) -> Vec<Assignment> {
        let mut out = Vec::new();
        if let Some(name) = &self.name {
            out.push(Assignment::new("name", "text", Value::String(name.clone())));
        }
        if let Some(description) = &self.description {
            out.push(Assignment::new("description", "text", Value::String(description.clone())));
        }
        out
    }
}

pub struct CategoryService;

impl CategoryService {
    /// Categories by name, with the total count for pagination.
    pub async fn list(pool: &PgPool, limit: u32, offset: u32) -> Result<(Vec<Category>, i64), AppError> {
        let sql = format!(
            r#"SELECT {} FROM "categories" c ORDER BY c."name" LIMIT $1 OFFSET $2"#,
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, Category>(&sql)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(pool)
            .await?;
        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "categories""#)
            .fetch_one(pool)
            .await?;
        Ok((rows, total))
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Category>, AppError> {
        let sql = format!(r#"SELECT {} FROM "categories" c WHERE c."id" = $1"#, CATEGORY_COLUMNS);
        Ok(sqlx::query_as::<_, Category>(&sql).bind(id).fetch_optional(pool).await?)
    }

    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, AppError> {
        let found: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM "categories" WHERE "id" = $1)"#)
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(found)
    }

    async fn name_taken(pool: &PgPool, name: &str, except: Option<i64>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM "categories" WHERE "name" = $1 AND ($2::bigint IS NULL OR "id" <> $2))"#,
        )
        .bind(name)
        .bind(except)
        .fetch_one(pool)
        .await?;
        Ok(taken)
    }

    pub async fn create(pool: &PgPool, changes: &CategoryChanges) -> Result<Category, AppError> {
        let name = changes
            .name
            .as_deref()
            .ok_or_else(|| AppError::field("name", crate::service::validation::REQUIRED))?;
        if Self::name_taken(pool, name, None).await? {
            return Err(AppError::field("name", DUPLICATE_NAME));
        }
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO "categories" ("name", "description") VALUES ($1, $2) RETURNING "id""#,
        )
        .bind(name)
        .bind(changes.description.as_deref().unwrap_or(""))
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::Db(e).unique_violation_on("name", DUPLICATE_NAME))?;
        tracing::info!(category_id = id, name = %name, "category created");
        Self::get(pool, id).await?.ok_or_else(|| AppError::NotFound(format!("category {}", id)))
    }

    pub async fn update(pool: &PgPool, id: i64, changes: &CategoryChanges) -> Result<Category, AppError> {
        if !Self::exists(pool, id).await? {
            return Err(AppError::NotFound(format!("category {}", id)));
        }
        if let Some(name) = changes.name.as_deref() {
            if Self::name_taken(pool, name, Some(id)).await? {
                return Err(AppError::field("name", DUPLICATE_NAME));
            }
        }
        if let Some(q) = update_by_id("categories", id, &changes.assignments(), None) {
            q.query()
                .execute(pool)
                .await
                .map_err(|e| AppError::Db(e).unique_violation_on("name", DUPLICATE_NAME))?;
        }
        Self::get(pool, id).await?.ok_or_else(|| AppError::NotFound(format!("category {}", id)))
    }

    /// Delete a category; its entries keep existing without one.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(r#"DELETE FROM "categories" WHERE "id" = $1"#)
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("category {}", id)));
        }
        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn full_update_requires_name_and_resets_description() {
        assert!(CategoryChanges::from_body(&obj(json!({ "description": "x" })), false).is_err());
        let changes = CategoryChanges::from_body(&obj(json!({ "name": " 科学 " })), false).unwrap();
        assert_eq!(changes.name.as_deref(), Some("科学"));
        assert_eq!(changes.description.as_deref(), Some(""));
    }

    #[test]
    fn partial_update_only_touches_sent_fields() {
        let changes = CategoryChanges::from_body(&obj(json!({ "description": "about science" })), true).unwrap();
        assert_eq!(changes.name, None);
        let columns: Vec<&str> = changes.assignments().iter().map(|a| a.column).collect();
        assert_eq!(columns, vec!["description"]);
    }

    #[test]
    fn name_length_limit() {
        let long = "n".repeat(101);
        assert!(CategoryChanges::from_body(&obj(json!({ "name": long })), false).is_err());
    }
}
