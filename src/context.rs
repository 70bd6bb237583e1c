/// Application context and dependency injection
use crate::{
    audit::AuditLog,
    cards::{BindingService, CardStore},
    config::ServerConfig,
    db,
    error::CardResult,
    redirect::RedirectPolicy,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub cards_db: SqlitePool,
    pub card_store: Arc<CardStore>,
    pub binding_service: Arc<BindingService>,
    pub redirect_policy: Arc<RedirectPolicy>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> CardResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize cards database
        let cards_db =
            db::create_pool(&config.storage.cards_db, db::DatabaseOptions::default()).await?;

        // Run migrations and verify the connection
        db::run_migrations(&cards_db).await?;
        db::test_connection(&cards_db).await?;

        // Redirect validation shares one policy between the write path
        // (binding service) and the read path (tap resolution)
        let redirect_policy = Arc::new(RedirectPolicy::new(config.public_host()));

        let card_store = Arc::new(CardStore::new(cards_db.clone()));
        let audit_log = Arc::new(AuditLog::new(cards_db.clone()));
        let binding_service = Arc::new(BindingService::new(
            Arc::clone(&card_store),
            Arc::clone(&audit_log),
            Arc::clone(&redirect_policy),
        ));

        Ok(Self {
            config: Arc::new(config),
            cards_db,
            card_store,
            binding_service,
            redirect_policy,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
