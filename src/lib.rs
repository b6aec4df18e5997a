//! Baike: encyclopedia REST backend with token authentication, on axum and PostgreSQL.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use error::{AppError, ConfigError, FieldErrors};
pub use response::{error_body, success_created, success_many, success_ok};
pub use routes::{api_routes, app, common_routes};
pub use settings::Settings;
pub use state::AppState;
pub use store::{backfill_profiles, ensure_database_exists, ensure_tables};
