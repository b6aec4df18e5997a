//! Shared application state for all routes.

use crate::service::MediaStore;
use crate::settings::Settings;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        AppState {
            pool,
            settings: Arc::new(settings),
        }
    }

    /// Store for uploaded files under the configured media root.
    pub fn media(&self) -> MediaStore {
        MediaStore::new(self.settings.media_root.clone())
    }
}
