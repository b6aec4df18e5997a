//! Baike server: loads settings, prepares the database, serves the API.
//!
//! Run from repo root: `cargo run -p baike-server`

use axum::extract::Request;
use axum::ServiceExt;
use baike::{app, backfill_profiles, ensure_database_exists, ensure_tables, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("baike=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;

    ensure_tables(&pool).await?;
    backfill_profiles(&pool).await?;
    tokio::fs::create_dir_all(&settings.media_root).await?;

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    let app = app(AppState::new(pool, settings));
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
    Ok(())
}
