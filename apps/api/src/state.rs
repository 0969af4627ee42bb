use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::CompletionService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Review storage. `None` when `DATABASE_URL` is not configured.
    pub db: Option<PgPool>,
    /// Completion backend. Production: `LlmClient`; tests swap in a mock.
    pub llm: Arc<dyn CompletionService>,
    pub config: Config,
}

impl AppState {
    pub fn db(&self) -> Result<&PgPool, AppError> {
        self.db.as_ref().ok_or(AppError::StorageUnavailable)
    }
}
