//! Cadastro de pacientes
//!
//! Todos os papéis consultam; apenas administradores alteram.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use common_auth::Role;
use common_db::models::{MedicalRecord, Patient, PatientInput};
use common_db::repo::{medical_records, medical_records::RecordFilter, patients, patients::PatientFilter};
use common_db::DbError;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::page_request;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{created, deleted, ok, paginated, Envelope};
use crate::state::AppState;

const DUPLICATE_CPF: &str = "CPF já cadastrado";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list).post(create))
        .route("/patients/:id", get(show).put(update).delete(destroy))
        .route("/patients/:id/medical-records", get(records))
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Normaliza antes de validar: campos opcionais vazios viram ausentes
fn prepare(input: PatientInput) -> ApiResult<PatientInput> {
    let input = input.normalized();
    input.validate()?;
    Ok(input)
}

/// CPF já usado por outro paciente vira erro do campo `cpf`
async fn check_cpf(state: &AppState, cpf: &str, current: Option<Uuid>) -> ApiResult<()> {
    match patients::find_by_cpf(state.pool(), cpf).await? {
        Some(existing) if Some(existing.id) != current => Err(ApiError::field("cpf", DUPLICATE_CPF)),
        _ => Ok(()),
    }
}

fn duplicate_cpf(err: DbError) -> ApiError {
    match err {
        DbError::ConstraintViolation(_) => ApiError::field("cpf", DUPLICATE_CPF),
        other => other.into(),
    }
}

async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<PatientQuery>,
) -> ApiResult<Envelope<Vec<Patient>>> {
    let filter = PatientFilter { search: query.search };
    let page = patients::list(state.pool(), &filter, page_request(query.page, query.per_page)).await?;
    Ok(paginated(page))
}

async fn show(State(state): State<AppState>, _auth: AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Envelope<Patient>> {
    Ok(ok(patients::get(state.pool(), id).await?))
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<PatientInput>,
) -> ApiResult<(StatusCode, Envelope<Patient>)> {
    auth.require(Role::can_manage_patients)?;
    let input = prepare(input)?;
    check_cpf(&state, &input.cpf, None).await?;

    let patient = patients::insert(state.pool(), &input).await.map_err(duplicate_cpf)?;
    info!("Paciente {} cadastrado por {}", patient.id, auth.id);
    Ok(created(patient))
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<PatientInput>,
) -> ApiResult<Envelope<Patient>> {
    auth.require(Role::can_manage_patients)?;
    let input = prepare(input)?;
    // 404 antes da validação de CPF
    patients::get(state.pool(), id).await?;
    check_cpf(&state, &input.cpf, Some(id)).await?;

    let patient = patients::update(state.pool(), id, &input).await.map_err(duplicate_cpf)?;
    info!("Paciente {} atualizado por {}", id, auth.id);
    Ok(ok(patient))
}

async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Option<()>>> {
    auth.require(Role::can_manage_patients)?;
    patients::delete(state.pool(), id).await?;
    info!("Paciente {} excluído por {}", id, auth.id);
    Ok(deleted("Paciente excluído"))
}

/// Histórico clínico do paciente, mais recentes primeiro
async fn records(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PatientQuery>,
) -> ApiResult<Envelope<Vec<MedicalRecord>>> {
    auth.require(Role::can_edit_clinical)?;
    patients::get(state.pool(), id).await?;

    let filter = RecordFilter { patient_id: Some(id), ..Default::default() };
    let page = medical_records::list(state.pool(), state.key(), &filter, page_request(query.page, query.per_page)).await?;
    Ok(paginated(page))
}
