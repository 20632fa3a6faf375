//! Geração de relatórios e o executor periódico
//!
//! Pedidos sem agendamento são gerados em segundo plano logo após a
//! criação. O executor reivindica os agendados que venceram, apaga os
//! arquivos expirados e limpa a lista de tokens revogados.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Duration;
use common_db::models::Report;
use common_db::repo::{reports, tokens};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::AppState;

pub mod export;

pub use export::ReportTable;

/// O que uma passada do executor fez
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub generated: usize,
    pub expired: usize,
    pub purged_tokens: u64,
}

fn file_path(state: &AppState, report: &Report) -> PathBuf {
    PathBuf::from(&state.config.reports.dir).join(format!(
        "{}-{}.{}",
        report.report_type.as_str(),
        report.id,
        report.format.extension()
    ))
}

async fn try_generate(state: &AppState, report_id: Uuid) -> Result<Report> {
    let report = reports::get(state.pool(), report_id).await?;
    let table = export::build_table(state, &report).await?;
    let bytes = table.render(report.format)?;

    let path = file_path(state, &report);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Falha ao gravar {}", path.display()))?;

    let now = state.clock.now();
    let expires_at = now + Duration::hours(state.config.reports.ttl_hours);
    let report = reports::mark_completed(
        state.pool(),
        report.id,
        &path.to_string_lossy(),
        bytes.len() as i64,
        now,
        expires_at,
    )
    .await?;
    Ok(report)
}

/// Gera o arquivo do relatório; falhas ficam registradas no próprio relatório
pub async fn generate(state: &AppState, report_id: Uuid) {
    match try_generate(state, report_id).await {
        Ok(report) => info!(
            "Relatório {} gerado ({} bytes)",
            report.id,
            report.file_size.unwrap_or_default()
        ),
        Err(e) => {
            error!("Falha ao gerar relatório {}: {:#}", report_id, e);
            if let Err(e) = reports::mark_failed(state.pool(), report_id, &e.to_string()).await {
                error!("Falha ao marcar relatório {} como falho: {}", report_id, e);
            }
        }
    }
}

pub fn spawn_generation(state: AppState, report_id: Uuid) -> JoinHandle<()> {
    tokio::spawn(async move { generate(&state, report_id).await })
}

/// Uma passada do executor
pub async fn run_once(state: &AppState) -> Result<WorkerSummary> {
    let now = state.clock.now();
    let mut summary = WorkerSummary::default();

    for report in reports::due_scheduled(state.pool(), now).await? {
        if reports::claim_scheduled(state.pool(), report.id).await? {
            generate(state, report.id).await;
            summary.generated += 1;
        }
    }

    for report in reports::expired_completed(state.pool(), now).await? {
        if let Some(path) = &report.file_path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Falha ao remover {}: {}", path, e);
                    continue;
                }
            }
        }
        reports::clear_file(state.pool(), report.id).await?;
        summary.expired += 1;
    }

    summary.purged_tokens = tokens::purge_expired(state.pool(), now).await?;
    Ok(summary)
}

pub fn spawn_worker(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let seconds = state.config.reports.worker_interval_seconds.max(1);
        let mut ticker = tokio::time::interval(StdDuration::from_secs(seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Executor de relatórios a cada {}s", seconds);

        loop {
            ticker.tick().await;
            match run_once(&state).await {
                Ok(summary) if summary != WorkerSummary::default() => debug!("Executor: {:?}", summary),
                Ok(_) => {}
                Err(e) => warn!("Executor de relatórios falhou: {:#}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use chrono::Utc;
    use common_db::models::{AppointmentInput, AppointmentStatus, AppointmentType, ReportFormat, ReportRequest, ReportStatus, ReportType};
    use common_db::repo::appointments;
    use common_db::testing::TestDb;

    fn request(report_type: ReportType, format: ReportFormat) -> ReportRequest {
        ReportRequest {
            report_type,
            format,
            period_start: None,
            period_end: None,
            scheduled_for: None,
        }
    }

    #[tokio::test]
    async fn generates_patient_csv_on_disk() {
        let db = TestDb::new().await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&db, dir.path());
        let admin = db.admin("Admin").await;
        db.patient("Maria Souza", "52998224725").await;

        let report = reports::insert(state.pool(), &request(ReportType::Patients, ReportFormat::Csv), admin.id, Utc::now())
            .await
            .unwrap();
        generate(&state, report.id).await;

        let report = reports::get(state.pool(), report.id).await.unwrap();
        assert_eq!(report.status, ReportStatus::Completed);
        let content = std::fs::read_to_string(report.file_path.unwrap()).unwrap();
        assert!(content.starts_with("id,nome,cpf"));
        assert!(content.contains("Maria Souza"));
        assert!(content.contains("529.982.247-25"));
        assert!(report.expires_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn financial_report_totals_done_appointments() {
        let db = TestDb::new().await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&db, dir.path());
        let admin = db.admin("Admin").await;
        let doctor = db.doctor("Dra. Ana").await;
        let patient = db.patient("Maria Souza", "52998224725").await;

        let start = Utc::now() - Duration::days(1);
        for (fee, status) in [(150.0, AppointmentStatus::Done), (200.0, AppointmentStatus::Done), (999.0, AppointmentStatus::Cancelled)] {
            let input = AppointmentInput {
                patient_id: patient.id,
                doctor_id: doctor.id,
                starts_at: start,
                ends_at: start + Duration::minutes(30),
                appointment_type: AppointmentType::Consultation,
                status: Some(status),
                fee: Some(fee),
                notes: None,
            };
            appointments::insert(state.pool(), &input, None).await.unwrap();
        }

        let report = reports::insert(state.pool(), &request(ReportType::Financial, ReportFormat::Json), admin.id, Utc::now())
            .await
            .unwrap();
        generate(&state, report.id).await;

        let report = reports::get(state.pool(), report.id).await.unwrap();
        let content = std::fs::read(report.file_path.unwrap()).unwrap();
        let rows: serde_json::Value = serde_json::from_slice(&content).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["data"], "TOTAL");
        assert_eq!(rows[2]["valor"], "350.00");
    }

    #[tokio::test]
    async fn worker_generates_due_reports_and_removes_expired_files() {
        let db = TestDb::new().await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&db, dir.path());
        let admin = db.admin("Admin").await;

        let mut scheduled = request(ReportType::Patients, ReportFormat::Json);
        // Pedido feito há um minuto para dez segundos atrás: já venceu
        scheduled.scheduled_for = Some(Utc::now() - Duration::seconds(10));
        let requested_at = Utc::now() - Duration::minutes(1);
        let due = reports::insert(state.pool(), &scheduled, admin.id, requested_at).await.unwrap();
        assert_eq!(due.status, ReportStatus::Scheduled);

        let summary = run_once(&state).await.unwrap();
        assert_eq!(summary.generated, 1);
        let due = reports::get(state.pool(), due.id).await.unwrap();
        assert_eq!(due.status, ReportStatus::Completed);

        let path = due.file_path.clone().unwrap();
        let past = Utc::now() - Duration::hours(1);
        reports::mark_completed(state.pool(), due.id, &path, 2, past, past).await.unwrap();

        let summary = run_once(&state).await.unwrap();
        assert_eq!(summary.expired, 1);
        assert!(!std::path::Path::new(&path).exists());
        assert!(reports::get(state.pool(), due.id).await.unwrap().file_path.is_none());
    }
}
