//! Relatórios exportáveis
//!
//! O pedido responde na hora; o arquivo é gerado em segundo plano ou pelo
//! executor quando agendado. O download expira após `reports.ttl_hours`.

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use common_auth::Role;
use common_db::models::{Report, ReportRequest, ReportStatus};
use common_db::repo::reports as repo;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::page_request;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::reports::spawn_generation;
use crate::response::{created, deleted, ok, paginated, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list).post(create))
        .route("/reports/:id", get(show).delete(destroy))
        .route("/reports/:id/download", get(download))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Envelope<Vec<Report>>> {
    auth.require(Role::can_manage_reports)?;
    let page = repo::list(state.pool(), page_request(query.page, query.per_page)).await?;
    Ok(paginated(page))
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(request): ValidJson<ReportRequest>,
) -> ApiResult<(StatusCode, Envelope<Report>)> {
    auth.require(Role::can_manage_reports)?;
    let report = repo::insert(state.pool(), &request, auth.id, state.clock.now()).await?;

    if report.status == ReportStatus::Generating {
        spawn_generation(state.clone(), report.id);
    }
    info!(
        "Relatório {} ({}) pedido por {}: {:?}",
        report.id,
        report.report_type.as_str(),
        auth.id,
        report.status
    );
    Ok(created(report))
}

async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Report>> {
    auth.require(Role::can_manage_reports)?;
    Ok(ok(repo::get(state.pool(), id).await?))
}

async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Option<()>>> {
    auth.require(Role::can_manage_reports)?;
    let report = repo::get(state.pool(), id).await?;
    if let Some(path) = &report.file_path {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Falha ao remover {}: {}", path, e);
            }
        }
    }
    repo::delete(state.pool(), id).await?;
    info!("Relatório {} excluído por {}", id, auth.id);
    Ok(deleted("Relatório excluído"))
}

async fn download(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Response> {
    auth.require(Role::can_manage_reports)?;
    let report = repo::get(state.pool(), id).await?;

    if report.status != ReportStatus::Completed {
        return Err(ApiError::NotFound("Relatório ainda não disponível".to_string()));
    }
    if report.is_expired(state.clock.now()) {
        return Err(ApiError::Gone("Relatório expirado".to_string()));
    }
    let path = report
        .file_path
        .as_deref()
        .ok_or_else(|| ApiError::Gone("Relatório expirado".to_string()))?;

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Arquivo do relatório {} sumiu: {}", id, path);
            return Err(ApiError::Gone("Arquivo do relatório não está mais disponível".to_string()));
        }
        Err(e) => return Err(anyhow::Error::new(e).into()),
    };

    let filename = format!(
        "relatorio-{}-{}.{}",
        report.report_type.as_str(),
        report.created_at.format("%Y%m%d"),
        report.format.extension()
    );
    let headers: [(HeaderName, String); 2] = [
        (header::CONTENT_TYPE, report.format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}
