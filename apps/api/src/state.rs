use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::intake::storage::ObjectStore;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::TextGenerator;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Résumé uploads. Default: S3ObjectStore against S3 / MinIO.
    pub storage: Arc<dyn ObjectStore>,
    /// Default: LlmClient over the Anthropic Messages API.
    pub llm: Arc<dyn TextGenerator>,
    pub sessions: SessionStore,
    /// Applied to question generation only; evaluation is a single attempt.
    pub retry: RetryPolicy,
    pub config: Config,
}
