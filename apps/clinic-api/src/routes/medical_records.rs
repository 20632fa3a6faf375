//! Prontuários
//!
//! Ciclo de vida `draft` → `finalized` → `signed`, sem pular etapas. Só
//! rascunhos podem ser editados ou excluídos; o conteúdo clínico é
//! criptografado no repositório.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use common_auth::Role;
use common_db::models::{MedicalRecord, MedicalRecordDetail, MedicalRecordInput, RecordStatus};
use common_db::repo::{appointments, medical_records, medical_records::RecordFilter, patients, users};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::page_request;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::response::{created, deleted, ok, paginated, with_message, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/medical-records", get(list).post(create))
        .route("/medical-records/:id", get(show).put(update).delete(destroy))
        .route("/medical-records/:id/finalize", post(finalize))
        .route("/medical-records/:id/sign", post(sign))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<RecordStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn check_references(state: &AppState, input: &MedicalRecordInput) -> ApiResult<()> {
    if !patients::exists(state.pool(), input.patient_id).await? {
        return Err(ApiError::field("patient_id", "Paciente não encontrado"));
    }
    if !users::is_active_doctor(state.pool(), input.doctor_id).await? {
        return Err(ApiError::field("doctor_id", "Profissional não encontrado"));
    }
    if let Some(appointment_id) = input.appointment_id {
        if !appointments::exists(state.pool(), appointment_id).await? {
            return Err(ApiError::field("appointment_id", "Agendamento não encontrado"));
        }
    }
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<RecordQuery>,
) -> ApiResult<Envelope<Vec<MedicalRecord>>> {
    auth.require(Role::can_edit_clinical)?;
    let filter = RecordFilter {
        patient_id: query.patient_id,
        doctor_id: query.doctor_id,
        status: query.status,
    };
    let page = medical_records::list(state.pool(), state.key(), &filter, page_request(query.page, query.per_page)).await?;
    Ok(paginated(page))
}

/// Prontuário com diagnósticos, prescrições e anexos
async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<MedicalRecordDetail>> {
    auth.require(Role::can_edit_clinical)?;
    Ok(ok(medical_records::detail(state.pool(), state.key(), id).await?))
}

async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<MedicalRecordInput>,
) -> ApiResult<(StatusCode, Envelope<MedicalRecord>)> {
    auth.require(Role::can_edit_clinical)?;
    check_references(&state, &input).await?;

    let record = medical_records::insert(state.pool(), state.key(), &input).await?;
    info!("Prontuário {} criado por {}", record.id, auth.id);
    Ok(created(record))
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<MedicalRecordInput>,
) -> ApiResult<Envelope<MedicalRecord>> {
    auth.require(Role::can_edit_clinical)?;
    medical_records::ensure_editable(state.pool(), id).await?;
    check_references(&state, &input).await?;

    let record = medical_records::update(state.pool(), state.key(), id, &input).await?;
    info!("Prontuário {} atualizado por {}", id, auth.id);
    Ok(ok(record))
}

async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Option<()>>> {
    auth.require(Role::can_edit_clinical)?;
    medical_records::delete(state.pool(), id).await?;
    info!("Prontuário {} excluído por {}", id, auth.id);
    Ok(deleted("Prontuário excluído"))
}

async fn finalize(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<MedicalRecord>> {
    auth.require(Role::can_edit_clinical)?;
    let record = medical_records::transition(state.pool(), state.key(), id, RecordStatus::Finalized, auth.id).await?;
    info!("Prontuário {} finalizado por {}", id, auth.id);
    Ok(with_message(record, "Prontuário finalizado"))
}

async fn sign(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<MedicalRecord>> {
    auth.require(Role::can_sign_records)?;
    let record = medical_records::transition(state.pool(), state.key(), id, RecordStatus::Signed, auth.id).await?;
    info!("Prontuário {} assinado por {}", id, auth.id);
    Ok(with_message(record, "Prontuário assinado"))
}
