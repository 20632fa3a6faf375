//! Common DB - Biblioteca compartilhada para acesso ao banco de dados da clínica
//!
//! Esta biblioteca fornece:
//! - Modelos de dados compartilhados
//! - Migrações automáticas do banco de dados
//! - Criptografia do conteúdo clínico dos prontuários
//! - Pool de conexão e repositórios por entidade

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use tracing::info;

pub mod crypto;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repo;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use crypto::EncryptionKey;
pub use error::{DbError, DbResult};

/// Configuração da conexão com o banco de dados
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Caminho para o arquivo SQLite
    pub db_path: String,
    /// Frase que protege a chave mestra de criptografia.
    /// É convertida em chave derivada usando Argon2id.
    pub key_phrase: String,
    /// Número máximo de conexões no pool
    pub max_connections: u32,
    /// Registra cada instrução SQL no log
    pub log_statements: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/clinic.db".to_string(),
            key_phrase: "".to_string(), // Vazio por segurança, deve ser definido explicitamente
            max_connections: 5,
            log_statements: false,
        }
    }
}

/// Inicializa o pool SQLite e aplica as migrações pendentes
pub async fn init_db_pool(config: &DbConfig) -> Result<SqlitePool> {
    let db_path = Path::new(&config.db_path);

    // Verifica se o diretório pai existe
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Falha ao criar diretório para banco de dados")?;
        }
    }

    let mut connection_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true)
        .pragma("synchronous", "NORMAL");
    if !config.log_statements {
        connection_options = connection_options.disable_statement_logging();
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connection_options)
        .await
        .context("Falha ao conectar ao banco de dados SQLite")?;

    migrations::run_migrations(&pool)
        .await
        .context("Falha ao aplicar migrações")?;

    info!("Banco de dados inicializado com sucesso: {}", config.db_path);
    Ok(pool)
}

/// Pool de conexões junto da chave mestra já desembrulhada
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
    pub key: std::sync::Arc<EncryptionKey>,
}

impl Database {
    /// Abre o banco, aplica migrações e carrega (ou cria) a chave mestra
    pub async fn open(config: &DbConfig) -> Result<Self> {
        let pool = init_db_pool(config).await?;
        let key = crypto::load_or_create_master_key(&pool, &config.key_phrase)
            .await
            .context("Falha ao carregar a chave mestra")?;

        Ok(Self {
            pool,
            key: std::sync::Arc::new(key),
        })
    }
}
