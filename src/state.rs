use crate::config::AppConfig;
use crate::errors::StoreError;
use crate::session::SessionStore;
use crate::storage::{CategoryStore, CredentialStore};
use chrono::Duration;

#[derive(Clone)]
pub struct AppState {
    pub categories: CategoryStore,
    pub credentials: CredentialStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            categories: CategoryStore::new(&config.data_path),
            credentials: CredentialStore::new(&config.user_db_path),
            sessions: SessionStore::with_ttl(Duration::minutes(config.session_ttl_minutes)),
        }
    }

    /// Creates whichever of the two files is missing. Existing files are
    /// left alone.
    pub async fn init_stores(&self) -> Result<(), StoreError> {
        self.categories.ensure_seeded().await?;
        self.credentials.ensure_initialized().await?;
        Ok(())
    }
}
