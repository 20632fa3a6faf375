//! Ciclo de vida dos relatórios exportados
//!
//! `scheduled` → `generating` → `completed` | `failed`. O arquivo gerado
//! fica fora do banco; aqui só se guardam o caminho e o tamanho.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::expect_affected;
use crate::error::{DbError, DbResult};
use crate::models::{Page, PageRequest, Report, ReportRequest, ReportStatus};

/// Registra o pedido. Agendamentos futuros entram como `scheduled`,
/// os demais como `generating`.
pub async fn insert(
    pool: &SqlitePool,
    request: &ReportRequest,
    requested_by: Uuid,
    now: DateTime<Utc>,
) -> DbResult<Report> {
    let scheduled_for = request.scheduled_for.filter(|at| *at > now);
    let status = if scheduled_for.is_some() {
        ReportStatus::Scheduled
    } else {
        ReportStatus::Generating
    };

    let report = sqlx::query_as::<_, Report>(
        "INSERT INTO reports (id, report_type, format, period_start, period_end, status, requested_by, scheduled_for, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(request.report_type)
    .bind(request.format)
    .bind(request.period_start)
    .bind(request.period_end)
    .bind(status)
    .bind(requested_by)
    .bind(scheduled_for)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(report)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> DbResult<Report> {
    sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("relatório {}", id)))
}

pub async fn list(pool: &SqlitePool, page: PageRequest) -> DbResult<Page<Report>> {
    let items = sqlx::query_as::<_, Report>("SELECT * FROM reports ORDER BY created_at DESC LIMIT ? OFFSET ?")
        .bind(page.per_page() as i64)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports").fetch_one(pool).await?;

    Ok(Page {
        items,
        total,
        page: page.page(),
        per_page: page.per_page(),
    })
}

pub async fn mark_completed(
    pool: &SqlitePool,
    id: Uuid,
    file_path: &str,
    file_size: i64,
    completed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> DbResult<Report> {
    let result = sqlx::query(
        "UPDATE reports SET status = ?, file_path = ?, file_size = ?, error_message = NULL, completed_at = ?, expires_at = ?
         WHERE id = ?",
    )
    .bind(ReportStatus::Completed)
    .bind(file_path)
    .bind(file_size)
    .bind(completed_at)
    .bind(expires_at)
    .bind(id)
    .execute(pool)
    .await?;
    expect_affected(result, "relatório")?;
    get(pool, id).await
}

pub async fn mark_failed(pool: &SqlitePool, id: Uuid, message: &str) -> DbResult<Report> {
    let result = sqlx::query("UPDATE reports SET status = ?, error_message = ? WHERE id = ?")
        .bind(ReportStatus::Failed)
        .bind(message)
        .bind(id)
        .execute(pool)
        .await?;
    expect_affected(result, "relatório")?;
    get(pool, id).await
}

/// Passa um relatório agendado para `generating`. Retorna `false` se outro
/// executor já o reivindicou.
pub async fn claim_scheduled(pool: &SqlitePool, id: Uuid) -> DbResult<bool> {
    let result = sqlx::query("UPDATE reports SET status = ? WHERE id = ? AND status = ?")
        .bind(ReportStatus::Generating)
        .bind(id)
        .bind(ReportStatus::Scheduled)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Relatórios agendados cujo horário já chegou
pub async fn due_scheduled(pool: &SqlitePool, now: DateTime<Utc>) -> DbResult<Vec<Report>> {
    let rows = sqlx::query_as::<_, Report>(
        "SELECT * FROM reports WHERE status = ? AND scheduled_for <= ? ORDER BY scheduled_for ASC",
    )
    .bind(ReportStatus::Scheduled)
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Relatórios concluídos com validade vencida e arquivo ainda registrado
pub async fn expired_completed(pool: &SqlitePool, now: DateTime<Utc>) -> DbResult<Vec<Report>> {
    let rows = sqlx::query_as::<_, Report>(
        "SELECT * FROM reports WHERE status = ? AND expires_at <= ? AND file_path IS NOT NULL",
    )
    .bind(ReportStatus::Completed)
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Esquece o arquivo de um relatório expirado; o registro permanece
pub async fn clear_file(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    let result = sqlx::query("UPDATE reports SET file_path = NULL, file_size = NULL WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    expect_affected(result, "relatório")
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM reports WHERE id = ?").bind(id).execute(pool).await?;
    expect_affected(result, "relatório")
}
