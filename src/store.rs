//! Database bootstrap: create the database if missing, then every table and index. All statements are idempotent.

use crate::error::AppError;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Tables in dependency order (a table only references tables listed before it).
const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS "users" (
            "id" BIGSERIAL PRIMARY KEY,
            "username" VARCHAR(150) NOT NULL UNIQUE,
            "email" VARCHAR(254) NOT NULL DEFAULT '',
            "password" TEXT NOT NULL,
            "first_name" VARCHAR(150) NOT NULL DEFAULT '',
            "last_name" VARCHAR(150) NOT NULL DEFAULT '',
            "is_active" BOOLEAN NOT NULL DEFAULT TRUE,
            "is_staff" BOOLEAN NOT NULL DEFAULT FALSE,
            "date_joined" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            "last_login" TIMESTAMPTZ
        )
        "#,
    ),
    (
        "auth_tokens",
        r#"
        CREATE TABLE IF NOT EXISTS "auth_tokens" (
            "key" VARCHAR(40) PRIMARY KEY,
            "user_id" BIGINT NOT NULL UNIQUE REFERENCES "users" ("id") ON DELETE CASCADE,
            "created" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "user_profiles",
        r#"
        CREATE TABLE IF NOT EXISTS "user_profiles" (
            "id" BIGSERIAL PRIMARY KEY,
            "user_id" BIGINT NOT NULL UNIQUE REFERENCES "users" ("id") ON DELETE CASCADE,
            "bio" VARCHAR(500) NOT NULL DEFAULT '',
            "avatar" VARCHAR(255),
            "location" VARCHAR(100) NOT NULL DEFAULT '',
            "website" VARCHAR(200) NOT NULL DEFAULT '',
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "categories",
        r#"
        CREATE TABLE IF NOT EXISTS "categories" (
            "id" BIGSERIAL PRIMARY KEY,
            "name" VARCHAR(100) NOT NULL UNIQUE,
            "description" TEXT NOT NULL DEFAULT '',
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "entries",
        r#"
        CREATE TABLE IF NOT EXISTS "entries" (
            "id" BIGSERIAL PRIMARY KEY,
            "title" VARCHAR(200) NOT NULL UNIQUE,
            "content" TEXT NOT NULL,
            "summary" VARCHAR(500) NOT NULL DEFAULT '',
            "category_id" BIGINT REFERENCES "categories" ("id") ON DELETE SET NULL,
            "author_id" BIGINT NOT NULL REFERENCES "users" ("id") ON DELETE CASCADE,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            "is_published" BOOLEAN NOT NULL DEFAULT TRUE,
            "view_count" BIGINT NOT NULL DEFAULT 0 CHECK ("view_count" >= 0),
            "like_count" BIGINT NOT NULL DEFAULT 0 CHECK ("like_count" >= 0)
        )
        "#,
    ),
    (
        "entry_images",
        r#"
        CREATE TABLE IF NOT EXISTS "entry_images" (
            "id" BIGSERIAL PRIMARY KEY,
            "entry_id" BIGINT NOT NULL REFERENCES "entries" ("id") ON DELETE CASCADE,
            "image" VARCHAR(255) NOT NULL,
            "caption" VARCHAR(200) NOT NULL DEFAULT '',
            "uploaded_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "entry_history",
        r#"
        CREATE TABLE IF NOT EXISTS "entry_history" (
            "id" BIGSERIAL PRIMARY KEY,
            "entry_id" BIGINT NOT NULL REFERENCES "entries" ("id") ON DELETE CASCADE,
            "editor_id" BIGINT NOT NULL REFERENCES "users" ("id") ON DELETE CASCADE,
            "old_content" TEXT NOT NULL,
            "new_content" TEXT NOT NULL,
            "edit_summary" VARCHAR(200) NOT NULL DEFAULT '',
            "edited_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "favorites",
        r#"
        CREATE TABLE IF NOT EXISTS "favorites" (
            "id" BIGSERIAL PRIMARY KEY,
            "user_id" BIGINT NOT NULL REFERENCES "users" ("id") ON DELETE CASCADE,
            "entry_id" BIGINT NOT NULL REFERENCES "entries" ("id") ON DELETE CASCADE,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE ("user_id", "entry_id")
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    r#"CREATE INDEX IF NOT EXISTS "entries_title_idx" ON "entries" ("title")"#,
    r#"CREATE INDEX IF NOT EXISTS "entries_category_idx" ON "entries" ("category_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "entries_created_at_idx" ON "entries" ("created_at")"#,
    r#"CREATE INDEX IF NOT EXISTS "entries_author_idx" ON "entries" ("author_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "entry_images_entry_idx" ON "entry_images" ("entry_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "entry_history_entry_idx" ON "entry_history" ("entry_id", "edited_at")"#,
    r#"CREATE INDEX IF NOT EXISTS "favorites_entry_idx" ON "favorites" ("entry_id")"#,
];

/// Advisory lock held while the schema is created, so several starting servers do not race.
const SCHEMA_LOCK_KEY: i64 = 0x6261_696b_65;

/// Create every table and index if missing.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    for (name, ddl) in TABLES {
        tracing::debug!(table = %name, "ensure table");
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Give every user without a profile an empty one. Returns how many were created.
pub async fn backfill_profiles(pool: &PgPool) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO "user_profiles" ("user_id")
        SELECT u."id" FROM "users" u
        WHERE NOT EXISTS (SELECT 1 FROM "user_profiles" p WHERE p."user_id" = u."id")
        "#,
    )
    .execute(pool)
    .await?;
    let created = result.rows_affected();
    if created > 0 {
        tracing::info!(created, "created missing user profiles");
    }
    Ok(created)
}

/// Connects to the server's `postgres` database and creates the target database when it does not exist.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::Db)?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        let quoted = crate::sql::quoted(&db_name);
        sqlx::query(&format!("CREATE DATABASE {}", quoted))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url.rfind('/').ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut split = path_and_query.splitn(2, '?');
    let db_name = split.next().unwrap_or("").trim();
    let query = split.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres{}", base, query);
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_and_keeps_query() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@db:5432/baike?sslmode=disable").unwrap();
        assert_eq!(name, "baike");
        assert_eq!(admin, "postgres://u:p@db:5432/postgres?sslmode=disable");
    }

    #[test]
    fn tables_are_ordered_by_dependency() {
        let names: Vec<&str> = TABLES.iter().map(|(n, _)| *n).collect();
        for (i, (_, ddl)) in TABLES.iter().enumerate() {
            for referenced in ddl.split("REFERENCES \"").skip(1) {
                let target = referenced.split('"').next().unwrap();
                let pos = names.iter().position(|n| *n == target).unwrap();
                assert!(pos < i, "{} referenced before creation", target);
            }
        }
    }
}
