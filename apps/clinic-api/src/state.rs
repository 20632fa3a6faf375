//! Estado compartilhado entre os handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use common_auth::TokenIssuer;
use common_calendar::GridConfig;
use common_db::{repo::users, Database, EncryptionKey};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: TokenIssuer,
    pub clock: Clock,
    pub grid: Arc<GridConfig>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            tokens: TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_ttl_seconds),
            clock: Clock::new(config.calendar.utc_offset_minutes),
            grid: Arc::new(config.grid()),
            config: Arc::new(config),
            db,
        }
    }

    /// Abre o banco, cria o diretório de relatórios e o administrador inicial
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let db = Database::open(&config.db_config()).await?;

        tokio::fs::create_dir_all(&config.reports.dir)
            .await
            .with_context(|| format!("Falha ao criar diretório de relatórios {}", config.reports.dir))?;

        if config.admin.password.is_empty() {
            warn!("CLINIC__ADMIN__PASSWORD não definida; nenhum administrador inicial será criado");
        } else {
            let created = users::ensure_admin(
                &db.pool,
                &config.admin.name,
                &config.admin.email,
                &config.admin.password,
            )
            .await
            .context("Falha ao criar administrador inicial")?;
            if !created {
                info!("Usuários já cadastrados; administrador inicial ignorado");
            }
        }

        Ok(Self::new(db, config))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }

    pub fn key(&self) -> &EncryptionKey {
        &self.db.key
    }
}

#[cfg(test)]
pub(crate) fn test_state(db: &common_db::testing::TestDb, reports_dir: &std::path::Path) -> AppState {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "segredo-de-teste-com-32-caracteres".to_string();
    config.database.key_phrase = "frase-de-teste".to_string();
    config.reports.dir = reports_dir.to_string_lossy().into_owned();
    AppState::new(db.database(), config)
}
