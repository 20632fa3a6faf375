//! Agenda: agendamentos, horários livres e agenda do profissional

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use common_auth::Role;
use common_calendar::{free_slots, Slot};
use common_db::models::{Appointment, AppointmentInput, AppointmentStatus, AppointmentStatusChange};
use common_db::repo::{appointments, appointments::AppointmentFilter, patients, users};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{page_request, supported_date};
use crate::auth::AuthUser;
use crate::clock::Clock;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::response::{created, deleted, ok, paginated, with_message, Envelope};
use crate::state::AppState;

/// Limites aceitos para `duration` em minutos
const MIN_SLOT_MINUTES: u32 = 5;
const MAX_SLOT_MINUTES: u32 = 12 * 60;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list).post(create))
        .route("/appointments/available-slots", get(available_slots))
        .route("/appointments/doctor-schedule", get(doctor_schedule))
        .route("/appointments/:id", get(show).put(update).delete(destroy))
        .route("/appointments/:id/status", patch(change_status))
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    /// Um único dia local; tem precedência sobre `from`/`to`
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    /// Inclusivo
    pub to: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl AppointmentQuery {
    fn filter(&self, clock: &Clock) -> ApiResult<AppointmentFilter> {
        let (from, to) = match self.date {
            Some(date) => {
                let (from, to) = clock.day(supported_date("date", date)?);
                (Some(from), Some(to))
            }
            None => (
                self.from.map(|d| supported_date("from", d)).transpose()?.map(|d| clock.day(d).0),
                self.to.map(|d| supported_date("to", d)).transpose()?.map(|d| clock.day(d).1),
            ),
        };
        Ok(AppointmentFilter {
            from,
            to,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct DoctorSchedule {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub appointments: Vec<Appointment>,
    pub available_slots: Vec<Slot>,
}

/// Paciente e profissional precisam existir; erros vão para o campo
async fn check_references(state: &AppState, patient_id: Uuid, doctor_id: Uuid) -> ApiResult<()> {
    if !patients::exists(state.pool(), patient_id).await? {
        return Err(ApiError::field("patient_id", "Paciente não encontrado"));
    }
    check_doctor(state, doctor_id).await
}

async fn check_doctor(state: &AppState, doctor_id: Uuid) -> ApiResult<()> {
    if users::is_active_doctor(state.pool(), doctor_id).await? {
        Ok(())
    } else {
        Err(ApiError::field("doctor_id", "Profissional não encontrado"))
    }
}

/// Horários livres do profissional no dia local `date`
async fn slots_for(state: &AppState, doctor_id: Uuid, date: NaiveDate, duration: u32) -> ApiResult<Vec<Slot>> {
    let (from, to) = state.clock.day(date);
    let busy: Vec<(NaiveDateTime, NaiveDateTime)> = appointments::busy_intervals(state.pool(), doctor_id, from, to)
        .await?
        .into_iter()
        .map(|(start, end)| (state.clock.to_local(start), state.clock.to_local(end)))
        .collect();
    Ok(free_slots(date, &busy, duration, &state.grid))
}

async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<AppointmentQuery>,
) -> ApiResult<Envelope<Vec<Appointment>>> {
    let filter = query.filter(&state.clock)?;
    let page = appointments::list(state.pool(), &filter, page_request(query.page, query.per_page)).await?;
    Ok(paginated(page))
}

async fn show(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Appointment>> {
    Ok(ok(appointments::get(state.pool(), id).await?))
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<AppointmentInput>,
) -> ApiResult<(StatusCode, Envelope<Appointment>)> {
    auth.require(Role::can_schedule)?;
    check_references(&state, input.patient_id, input.doctor_id).await?;

    let appointment = appointments::insert(state.pool(), &input, Some(auth.id)).await?;
    info!("Agendamento {} criado por {}", appointment.id, auth.id);
    Ok(created(appointment))
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<AppointmentInput>,
) -> ApiResult<Envelope<Appointment>> {
    auth.require(Role::can_schedule)?;
    appointments::get(state.pool(), id).await?;
    check_references(&state, input.patient_id, input.doctor_id).await?;

    let appointment = appointments::update(state.pool(), id, &input).await?;
    info!("Agendamento {} atualizado por {}", id, auth.id);
    Ok(ok(appointment))
}

/// Qualquer status pode ir para qualquer outro
async fn change_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(change): ValidJson<AppointmentStatusChange>,
) -> ApiResult<Envelope<Appointment>> {
    auth.require(Role::can_schedule)?;
    let appointment = appointments::update_status(state.pool(), id, change.status).await?;
    info!(
        "Agendamento {} agora {} (por {}){}",
        id,
        change.status.as_str(),
        auth.id,
        change.reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default()
    );
    Ok(with_message(appointment, "Status atualizado"))
}

async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Option<()>>> {
    auth.require(Role::can_schedule)?;
    appointments::delete(state.pool(), id).await?;
    info!("Agendamento {} excluído por {}", id, auth.id);
    Ok(deleted("Agendamento excluído"))
}

async fn available_slots(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<SlotQuery>,
) -> ApiResult<Envelope<Vec<Slot>>> {
    let duration = query.duration.unwrap_or(state.grid.slot_minutes);
    if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&duration) {
        return Err(ApiError::field(
            "duration",
            format!("Duração deve estar entre {} e {} minutos", MIN_SLOT_MINUTES, MAX_SLOT_MINUTES),
        ));
    }
    let date = supported_date("date", query.date)?;
    check_doctor(&state, query.doctor_id).await?;

    Ok(ok(slots_for(&state, query.doctor_id, date, duration).await?))
}

async fn doctor_schedule(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> ApiResult<Envelope<DoctorSchedule>> {
    let date = supported_date("date", query.date)?;
    check_doctor(&state, query.doctor_id).await?;

    let (from, to) = state.clock.day(date);
    let filter = AppointmentFilter {
        from: Some(from),
        to: Some(to),
        doctor_id: Some(query.doctor_id),
        ..Default::default()
    };
    let appointments = appointments::list_all(state.pool(), &filter).await?;
    let available_slots = slots_for(&state, query.doctor_id, date, state.grid.slot_minutes).await?;

    Ok(ok(DoctorSchedule {
        doctor_id: query.doctor_id,
        date,
        appointments,
        available_slots,
    }))
}
