use axum::extract::State;
use serde::Serialize;
use tracing::warn;

use crate::built_info;
use crate::response::{ok, Envelope};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// Sem autenticação; usado por balanceadores e pelo monitoramento
pub async fn health(State(state): State<AppState>) -> Envelope<Health> {
    let database = match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => "ok",
        Err(e) => {
            warn!("Health check sem banco: {}", e);
            "unavailable"
        }
    };

    ok(Health {
        status: if database == "ok" { "ok" } else { "degraded" },
        version: built_info::PKG_VERSION,
        database,
    })
}
