//! Agendamentos
//!
//! Não há prevenção de conflito de horário na gravação; `busy_intervals`
//! existe apenas para o cálculo de horários livres.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::expect_affected;
use crate::error::{DbError, DbResult};
use crate::models::{Appointment, AppointmentInput, AppointmentStatus, Page, PageRequest};

const SELECT_APPOINTMENT: &str = "SELECT a.*, p.name AS patient_name, u.name AS doctor_name
     FROM appointments a
     JOIN patients p ON p.id = a.patient_id
     JOIN users u ON u.id = a.doctor_id
     WHERE 1 = 1";

/// Filtros da listagem; `from` inclusivo e `to` exclusivo sobre `starts_at`
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AppointmentFilter) {
    if let Some(from) = filter.from {
        qb.push(" AND a.starts_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND a.starts_at < ").push_bind(to);
    }
    if let Some(doctor_id) = filter.doctor_id {
        qb.push(" AND a.doctor_id = ").push_bind(doctor_id);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND a.patient_id = ").push_bind(patient_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status);
    }
}

pub async fn list(
    pool: &SqlitePool,
    filter: &AppointmentFilter,
    page: PageRequest,
) -> DbResult<Page<Appointment>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_APPOINTMENT);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY a.starts_at ASC LIMIT ")
        .push_bind(page.per_page() as i64)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<Appointment>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM appointments a WHERE 1 = 1");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok(Page {
        items,
        total,
        page: page.page(),
        per_page: page.per_page(),
    })
}

/// Sem paginação, para agenda e relatórios
pub async fn list_all(pool: &SqlitePool, filter: &AppointmentFilter) -> DbResult<Vec<Appointment>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_APPOINTMENT);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY a.starts_at ASC");
    let items = qb.build_query_as::<Appointment>().fetch_all(pool).await?;
    Ok(items)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> DbResult<Appointment> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_APPOINTMENT);
    qb.push(" AND a.id = ").push_bind(id);
    qb.build_query_as::<Appointment>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("agendamento {}", id)))
}

pub async fn exists(pool: &SqlitePool, id: Uuid) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM appointments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn insert(
    pool: &SqlitePool,
    input: &AppointmentInput,
    created_by: Option<Uuid>,
) -> DbResult<Appointment> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO appointments
            (id, patient_id, doctor_id, starts_at, ends_at, status, appointment_type, fee, notes, created_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(input.patient_id)
    .bind(input.doctor_id)
    .bind(input.starts_at)
    .bind(input.ends_at)
    .bind(input.status.unwrap_or(AppointmentStatus::Scheduled))
    .bind(input.appointment_type)
    .bind(input.fee)
    .bind(&input.notes)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get(pool, id).await
}

/// Substitui os dados do agendamento; status ausente mantém o atual
pub async fn update(pool: &SqlitePool, id: Uuid, input: &AppointmentInput) -> DbResult<Appointment> {
    let result = sqlx::query(
        "UPDATE appointments
         SET patient_id = ?, doctor_id = ?, starts_at = ?, ends_at = ?,
             status = COALESCE(?, status), appointment_type = ?, fee = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(input.patient_id)
    .bind(input.doctor_id)
    .bind(input.starts_at)
    .bind(input.ends_at)
    .bind(input.status)
    .bind(input.appointment_type)
    .bind(input.fee)
    .bind(&input.notes)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    expect_affected(result, &format!("agendamento {}", id))?;

    get(pool, id).await
}

pub async fn update_status(pool: &SqlitePool, id: Uuid, status: AppointmentStatus) -> DbResult<Appointment> {
    let result = sqlx::query("UPDATE appointments SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    expect_affected(result, &format!("agendamento {}", id))?;

    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    expect_affected(result, &format!("agendamento {}", id))
}

/// Intervalos que ocupam a agenda do profissional em `[from, to)`
pub async fn busy_intervals(
    pool: &SqlitePool,
    doctor_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
    let rows: Vec<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        "SELECT starts_at, ends_at FROM appointments
         WHERE doctor_id = ? AND starts_at < ? AND ends_at > ? AND status IN (?, ?, ?)
         ORDER BY starts_at",
    )
    .bind(doctor_id)
    .bind(to)
    .bind(from)
    .bind(AppointmentStatus::Scheduled)
    .bind(AppointmentStatus::Confirmed)
    .bind(AppointmentStatus::Done)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Próximos agendamentos ativos a partir de `now`
pub async fn upcoming(pool: &SqlitePool, now: DateTime<Utc>, limit: i64) -> DbResult<Vec<Appointment>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_APPOINTMENT);
    qb.push(" AND a.starts_at >= ")
        .push_bind(now)
        .push(" AND a.status IN (")
        .push_bind(AppointmentStatus::Scheduled)
        .push(", ")
        .push_bind(AppointmentStatus::Confirmed)
        .push(") ORDER BY a.starts_at ASC LIMIT ")
        .push_bind(limit);
    let items = qb.build_query_as::<Appointment>().fetch_all(pool).await?;
    Ok(items)
}

pub async fn count_between(pool: &SqlitePool, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<i64> {
    let total = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE starts_at >= ? AND starts_at < ? AND status != ?",
    )
    .bind(from)
    .bind(to)
    .bind(AppointmentStatus::Cancelled)
    .fetch_one(pool)
    .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentType;
    use crate::testing::TestDb;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, h, m, 0).unwrap()
    }

    fn input(patient_id: Uuid, doctor_id: Uuid, start: DateTime<Utc>, minutes: i64) -> AppointmentInput {
        AppointmentInput {
            patient_id,
            doctor_id,
            starts_at: start,
            ends_at: start + Duration::minutes(minutes),
            appointment_type: AppointmentType::Consultation,
            status: None,
            fee: Some(200.0),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_defaults_to_scheduled_and_joins_names() {
        let db = TestDb::new().await;
        let doctor = db.doctor("Dr. Paulo").await;
        let patient = db.patient("Joana Prado", "52998224725").await;

        let created = insert(db.pool(), &input(patient.id, doctor.id, at(9, 0), 30), Some(doctor.id))
            .await
            .unwrap();
        assert_eq!(created.status, AppointmentStatus::Scheduled);
        assert_eq!(created.patient_name, "Joana Prado");
        assert_eq!(created.doctor_name, "Dr. Paulo");

        let done = update_status(db.pool(), created.id, AppointmentStatus::Done).await.unwrap();
        assert_eq!(done.status, AppointmentStatus::Done);

        // Update sem status preserva o atual
        let moved = update(db.pool(), created.id, &input(patient.id, doctor.id, at(10, 0), 45))
            .await
            .unwrap();
        assert_eq!(moved.status, AppointmentStatus::Done);
        assert_eq!(moved.starts_at, at(10, 0));
    }

    #[tokio::test]
    async fn test_overlapping_appointments_are_accepted() {
        let db = TestDb::new().await;
        let doctor = db.doctor("Dr. Paulo").await;
        let patient = db.patient("Joana Prado", "52998224725").await;

        insert(db.pool(), &input(patient.id, doctor.id, at(9, 0), 30), None).await.unwrap();
        insert(db.pool(), &input(patient.id, doctor.id, at(9, 15), 30), None).await.unwrap();

        let busy = busy_intervals(db.pool(), doctor.id, at(0, 0), at(23, 0)).await.unwrap();
        assert_eq!(busy.len(), 2);
    }

    #[tokio::test]
    async fn test_filters_and_busy_intervals_ignore_cancelled() {
        let db = TestDb::new().await;
        let doctor = db.doctor("Dr. Paulo").await;
        let other = db.doctor("Dra. Rita").await;
        let patient = db.patient("Joana Prado", "52998224725").await;

        let first = insert(db.pool(), &input(patient.id, doctor.id, at(9, 0), 30), None).await.unwrap();
        insert(db.pool(), &input(patient.id, doctor.id, at(11, 0), 30), None).await.unwrap();
        insert(db.pool(), &input(patient.id, other.id, at(9, 0), 30), None).await.unwrap();
        update_status(db.pool(), first.id, AppointmentStatus::Cancelled).await.unwrap();

        let filter = AppointmentFilter {
            doctor_id: Some(doctor.id),
            ..AppointmentFilter::default()
        };
        assert_eq!(list_all(db.pool(), &filter).await.unwrap().len(), 2);

        let cancelled = AppointmentFilter {
            status: Some(AppointmentStatus::Cancelled),
            ..AppointmentFilter::default()
        };
        let page = list(db.pool(), &cancelled, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let busy = busy_intervals(db.pool(), doctor.id, at(0, 0), at(23, 0)).await.unwrap();
        assert_eq!(busy, vec![(at(11, 0), at(11, 30))]);

        let window = AppointmentFilter {
            from: Some(at(10, 0)),
            to: Some(at(12, 0)),
            ..AppointmentFilter::default()
        };
        assert_eq!(list_all(db.pool(), &window).await.unwrap().len(), 1);
        assert_eq!(count_between(db.pool(), at(0, 0), at(23, 0)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_deleting_patient_cascades() {
        let db = TestDb::new().await;
        let doctor = db.doctor("Dr. Paulo").await;
        let patient = db.patient("Joana Prado", "52998224725").await;
        let created = insert(db.pool(), &input(patient.id, doctor.id, at(9, 0), 30), None).await.unwrap();

        crate::repo::patients::delete(db.pool(), patient.id).await.unwrap();
        assert!(!exists(db.pool(), created.id).await.unwrap());
    }
}
