//! Inicialização do `tracing`

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,clinic_api=debug,tower_http=info";

/// Instala o subscriber global; `RUST_LOG` tem precedência sobre o filtro padrão.
///
/// Em produção use `json = true` para logs estruturados.
pub fn init(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| anyhow!("Falha ao inicializar logs: {}", e))
}
