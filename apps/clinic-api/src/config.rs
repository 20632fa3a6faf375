//! Configuração da aplicação
//!
//! Ordem de precedência (a última vence): valores padrão, arquivo
//! `clinic.toml` opcional e variáveis de ambiente `CLINIC__*`. O `.env`
//! é carregado antes com `dotenvy`.

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use common_calendar::GridConfig;
use common_db::DbConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Arquivo de configuração procurado no diretório atual
pub const CONFIG_FILE: &str = "clinic.toml";

/// Tamanho mínimo do segredo HS256
const MIN_JWT_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_address: String,
    /// Saída de log em JSON
    pub log_json: bool,
    /// Requisições simultâneas atendidas pelo servidor
    pub max_concurrent_requests: usize,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub reports: ReportSettings,
    pub admin: AdminSettings,
    pub calendar: CalendarSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
    pub key_phrase: String,
    pub max_connections: u32,
    pub log_statements: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    pub dir: String,
    /// Validade do arquivo gerado
    pub ttl_hours: i64,
    pub worker_interval_seconds: u64,
}

/// Administrador criado quando o banco está vazio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSettings {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSettings {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub slot_minutes: u32,
    pub pixels_per_minute: f64,
    pub stagger_px: f64,
    /// Fuso fixo da clínica em minutos a leste de UTC (Brasília = -180)
    pub utc_offset_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let grid = GridConfig::default();
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            log_json: false,
            max_concurrent_requests: 256,
            database: DatabaseSettings {
                path: "data/clinic.db".to_string(),
                key_phrase: String::new(),
                max_connections: 5,
                log_statements: false,
            },
            auth: AuthSettings {
                jwt_secret: String::new(),
                token_ttl_seconds: 8 * 3600,
            },
            reports: ReportSettings {
                dir: "data/reports".to_string(),
                ttl_hours: 24,
                worker_interval_seconds: 60,
            },
            admin: AdminSettings {
                name: "Administrador".to_string(),
                email: "admin@clinica.local".to_string(),
                password: String::new(),
            },
            calendar: CalendarSettings {
                day_start: grid.day_start,
                day_end: grid.day_end,
                slot_minutes: grid.slot_minutes,
                pixels_per_minute: grid.pixels_per_minute,
                stagger_px: grid.stagger_px,
                utc_offset_minutes: -180,
            },
        }
    }
}

impl AppConfig {
    /// Carrega `.env`, `clinic.toml` e o ambiente sobre os valores padrão
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default()).context("Falha nos valores padrão")?)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CLINIC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Falha ao carregar configuração")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Configuração inválida")?;
        app.validate()?;
        Ok(app)
    }

    /// Rejeita configurações com que o servidor não deve subir
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!(
                "auth.jwt_secret deve ter ao menos {} caracteres (CLINIC__AUTH__JWT_SECRET)",
                MIN_JWT_SECRET_LEN
            );
        }
        if self.database.key_phrase.is_empty() {
            bail!("database.key_phrase não definida (CLINIC__DATABASE__KEY_PHRASE)");
        }
        if self.calendar.day_end <= self.calendar.day_start {
            bail!("calendar.day_end deve ser posterior a calendar.day_start");
        }
        if self.calendar.slot_minutes == 0 {
            bail!("calendar.slot_minutes deve ser maior que zero");
        }
        Ok(())
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            db_path: self.database.path.clone(),
            key_phrase: self.database.key_phrase.clone(),
            max_connections: self.database.max_connections,
            log_statements: self.database.log_statements,
        }
    }

    pub fn grid(&self) -> GridConfig {
        GridConfig {
            day_start: self.calendar.day_start,
            day_end: self.calendar.day_end,
            slot_minutes: self.calendar.slot_minutes,
            pixels_per_minute: self.calendar.pixels_per_minute,
            stagger_px: self.calendar.stagger_px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_need_secrets() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
bind_address = "0.0.0.0:9000"

[database]
key_phrase = "frase-do-arquivo"

[auth]
jwt_secret = "segredo-do-arquivo-bem-longo"

[calendar]
day_start = "07:00:00"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.database.key_phrase, "frase-do-arquivo");
        assert_eq!(config.calendar.day_start, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        // Chaves ausentes mantêm o padrão
        assert_eq!(config.reports.ttl_hours, 24);
        assert_eq!(config.grid().slot_minutes, 30);
    }
}
