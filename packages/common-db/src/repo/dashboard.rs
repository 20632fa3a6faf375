//! Indicadores do painel inicial

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{appointments, medical_records, patients};
use crate::error::DbResult;
use crate::models::{AppointmentStatus, DashboardStats, RecordStatus, StatusCount};

/// Quantos próximos agendamentos o painel mostra
pub const UPCOMING_LIMIT: i64 = 5;

/// Janelas `[início, fim)` já convertidas para UTC pelo chamador, que
/// conhece o fuso da clínica.
#[derive(Debug, Clone, Copy)]
pub struct StatsWindow {
    pub now: DateTime<Utc>,
    pub day: (DateTime<Utc>, DateTime<Utc>),
    pub week: (DateTime<Utc>, DateTime<Utc>),
    pub month: (DateTime<Utc>, DateTime<Utc>),
}

pub async fn statistics(pool: &SqlitePool, window: &StatsWindow) -> DbResult<DashboardStats> {
    let (month_from, month_to) = window.month;

    let revenue: Option<f64> = sqlx::query_scalar(
        "SELECT SUM(fee) FROM appointments WHERE status = ? AND starts_at >= ? AND starts_at < ?",
    )
    .bind(AppointmentStatus::Done)
    .bind(month_from)
    .bind(month_to)
    .fetch_one(pool)
    .await?;

    let counted = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS total FROM appointments
         WHERE starts_at >= ? AND starts_at < ?
         GROUP BY status",
    )
    .bind(month_from)
    .bind(month_to)
    .fetch_all(pool)
    .await?;

    // Todos os status aparecem, mesmo com zero
    let appointments_by_status = AppointmentStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            total: counted.iter().find(|c| c.status == *status).map(|c| c.total).unwrap_or(0),
        })
        .collect();

    Ok(DashboardStats {
        total_patients: patients::count(pool).await?,
        new_patients_this_month: patients::count_created_between(pool, month_from, month_to).await?,
        appointments_today: appointments::count_between(pool, window.day.0, window.day.1).await?,
        appointments_this_week: appointments::count_between(pool, window.week.0, window.week.1).await?,
        pending_records: medical_records::count_by_status(pool, RecordStatus::Draft).await?,
        revenue_this_month: revenue.unwrap_or(0.0),
        appointments_by_status,
        upcoming_appointments: appointments::upcoming(pool, window.now, UPCOMING_LIMIT).await?,
    })
}
