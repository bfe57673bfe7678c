use std::sync::Arc;

use paintvox_agent::{SessionSettings, StaticBusinessConfig, VoiceSession};
use paintvox_core::config::{AppConfig, ConfigError, LoadOptions};
use paintvox_db::repositories::{SqlCustomerDirectory, SqlDraftRepository, SqlEstimateRepository};
use paintvox_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::voice::VoiceState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub voice: VoiceState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates and wires the voice session over the SQL repositories.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        database_url = %config.database.url,
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let defaults = config.business.defaults();
    let session = VoiceSession::with_standard_tools(
        Arc::new(SqlDraftRepository::new(db_pool.clone())),
        Arc::new(SqlCustomerDirectory::new(db_pool.clone())),
        Arc::new(StaticBusinessConfig::new(defaults.clone())),
        SessionSettings {
            defaults: defaults.clone(),
            completion_threshold_pct: config.session.completion_threshold_pct,
        },
    );
    let voice = VoiceState::new(
        session,
        Arc::new(SqlEstimateRepository::new(db_pool.clone())),
        defaults,
        config.transport.shared_secret.clone(),
    );
    info!(
        event_name = "system.bootstrap.session_ready",
        correlation_id = "bootstrap",
        completion_threshold_pct = config.session.completion_threshold_pct,
        transport_secret = config.transport.shared_secret.is_some(),
        "voice session wired"
    );

    Ok(Application { config, db_pool, voice })
}

#[cfg(test)]
mod tests {
    use paintvox_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> ConfigOverrides {
        ConfigOverrides { database_url: Some(database_url.to_string()), ..ConfigOverrides::default() }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_threshold() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                completion_threshold_pct: Some(0),
                ..overrides("sqlite::memory:")
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("completion_threshold_pct"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_urls() {
        let result = bootstrap(LoadOptions {
            overrides: overrides("postgres://localhost/paintvox"),
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bootstrap_exposes_migrated_draft_tables() {
        let app = bootstrap(LoadOptions {
            overrides: overrides("sqlite::memory:"),
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with an in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('voice_draft', 'active_draft', 'customer', 'promoted_estimate')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected draft tables to be available after bootstrap");
        assert_eq!(table_count, 4);

        app.db_pool.close().await;
    }
}
