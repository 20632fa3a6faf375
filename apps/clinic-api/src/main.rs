use std::net::SocketAddr;

use anyhow::{Context, Result};
use clinic_api::{build_router, built_info, logging, reports, AppConfig, AppState};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(config.log_json)?;

    info!(
        "{} v{} ({})",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::PROFILE
    );

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Endereço inválido: {}", config.bind_address))?;

    let state = AppState::initialize(config).await?;
    let worker = reports::spawn_worker(state.clone());

    let app = build_router(state);
    info!("Escutando em http://{}", addr);

    axum::Server::try_bind(&addr)
        .with_context(|| format!("Falha ao abrir {}", addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Erro no servidor HTTP")?;

    worker.abort();
    info!("Servidor encerrado");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
