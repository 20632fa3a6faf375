//! Visões de semana e de mês da agenda, já em horário local

use axum::{extract::State, routing::get, Router};
use chrono::{NaiveDate, NaiveDateTime};
use common_calendar::{month_bounds, week_days, week_start, MonthGrid, TimeSpan, WeekGrid};
use common_db::models::{Appointment, AppointmentStatus, AppointmentType};
use common_db::repo::{appointments, appointments::AppointmentFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supported_date;
use crate::auth::AuthUser;
use crate::clock::Clock;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::response::{ok, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/week", get(week))
        .route("/calendar/month", get(month))
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    /// Qualquer dia do período; padrão é hoje
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
}

impl CalendarQuery {
    /// Dia de referência: o informado ou hoje no fuso da clínica
    fn reference(&self, clock: &Clock) -> ApiResult<NaiveDate> {
        match self.date {
            Some(date) => supported_date("date", date),
            None => Ok(clock.today()),
        }
    }
}

/// Agendamento como aparece na agenda
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
}

impl CalendarEvent {
    fn from_appointment(appointment: Appointment, clock: &Clock) -> Self {
        Self {
            id: appointment.id,
            start: clock.to_local(appointment.starts_at),
            end: clock.to_local(appointment.ends_at),
            patient_id: appointment.patient_id,
            patient_name: appointment.patient_name,
            doctor_id: appointment.doctor_id,
            doctor_name: appointment.doctor_name,
            status: appointment.status,
            appointment_type: appointment.appointment_type,
        }
    }
}

impl TimeSpan for CalendarEvent {
    fn start(&self) -> NaiveDateTime {
        self.start
    }

    fn end(&self) -> NaiveDateTime {
        self.end
    }
}

/// Eventos com início entre os dias locais `first` e `last`
async fn events(
    state: &AppState,
    first: NaiveDate,
    last: NaiveDate,
    doctor_id: Option<Uuid>,
) -> ApiResult<Vec<CalendarEvent>> {
    let (from, to) = state.clock.range(first, last);
    let filter = AppointmentFilter {
        from: Some(from),
        to: Some(to),
        doctor_id,
        ..Default::default()
    };
    let events = appointments::list_all(state.pool(), &filter)
        .await?
        .into_iter()
        .map(|a| CalendarEvent::from_appointment(a, &state.clock))
        .collect();
    Ok(events)
}

async fn week(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> ApiResult<Envelope<WeekGrid<CalendarEvent>>> {
    let date = query.reference(&state.clock)?;
    let days = week_days(date);
    let events = events(&state, days[0], days[6], query.doctor_id).await?;
    Ok(ok(WeekGrid::build(date, events, &state.grid)))
}

async fn month(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> ApiResult<Envelope<MonthGrid<CalendarEvent>>> {
    let date = query.reference(&state.clock)?;
    // As semanas completas podem incluir dias dos meses vizinhos
    let (first, last) = month_bounds(date);
    let visible_end = week_days(last)[6];
    let events = events(&state, week_start(first), visible_end, query.doctor_id).await?;
    Ok(ok(MonthGrid::build(date, events)))
}
