use axum::{extract::State, routing::get, Router};
use common_db::models::DashboardStats;
use common_db::repo::dashboard;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::{ok, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard/statistics", get(statistics))
}

/// Indicadores do dia, da semana e do mês no fuso da clínica
async fn statistics(State(state): State<AppState>, _auth: AuthUser) -> ApiResult<Envelope<DashboardStats>> {
    let window = state.clock.stats_window();
    Ok(ok(dashboard::statistics(state.pool(), &window).await?))
}
