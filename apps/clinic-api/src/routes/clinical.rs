//! Diagnósticos, prescrições e anexos de um prontuário
//!
//! Criação fica sob o prontuário; edição e exclusão pelo ID do próprio
//! registro. Qualquer alteração exige o prontuário pai em rascunho.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use common_auth::Role;
use common_db::models::{Attachment, AttachmentInput, Diagnosis, DiagnosisInput, Prescription, PrescriptionInput};
use common_db::repo::{clinical, medical_records};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{ApiPath, ValidJson};
use crate::response::{created, deleted, ok, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/medical-records/:id/diagnoses",
            get(list_diagnoses).post(create_diagnosis),
        )
        .route("/diagnoses/:id", put(update_diagnosis).delete(delete_diagnosis))
        .route(
            "/medical-records/:id/prescriptions",
            get(list_prescriptions).post(create_prescription),
        )
        .route(
            "/prescriptions/:id",
            put(update_prescription).delete(delete_prescription),
        )
        .route(
            "/medical-records/:id/attachments",
            get(list_attachments).post(create_attachment),
        )
        .route(
            "/attachments/:id",
            put(update_attachment).delete(delete_attachment),
        )
}

async fn list_diagnoses(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(record_id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Vec<Diagnosis>>> {
    auth.require(Role::can_edit_clinical)?;
    // 404 para prontuário inexistente em vez de lista vazia
    medical_records::status_of(state.pool(), record_id).await?;
    Ok(ok(clinical::list_diagnoses(state.pool(), record_id).await?))
}

async fn create_diagnosis(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(record_id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<DiagnosisInput>,
) -> ApiResult<(StatusCode, Envelope<Diagnosis>)> {
    auth.require(Role::can_edit_clinical)?;
    let diagnosis = clinical::insert_diagnosis(state.pool(), record_id, &input).await?;
    info!("Diagnóstico {} ({}) no prontuário {}", diagnosis.id, diagnosis.icd_code, record_id);
    Ok(created(diagnosis))
}

async fn update_diagnosis(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<DiagnosisInput>,
) -> ApiResult<Envelope<Diagnosis>> {
    auth.require(Role::can_edit_clinical)?;
    Ok(ok(clinical::update_diagnosis(state.pool(), id, &input).await?))
}

async fn delete_diagnosis(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Option<()>>> {
    auth.require(Role::can_edit_clinical)?;
    clinical::delete_diagnosis(state.pool(), id).await?;
    Ok(deleted("Diagnóstico excluído"))
}

async fn list_prescriptions(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(record_id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Vec<Prescription>>> {
    auth.require(Role::can_edit_clinical)?;
    medical_records::status_of(state.pool(), record_id).await?;
    Ok(ok(clinical::list_prescriptions(state.pool(), record_id).await?))
}

async fn create_prescription(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(record_id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<PrescriptionInput>,
) -> ApiResult<(StatusCode, Envelope<Prescription>)> {
    auth.require(Role::can_edit_clinical)?;
    let prescription = clinical::insert_prescription(state.pool(), record_id, &input).await?;
    info!("Prescrição {} no prontuário {}", prescription.id, record_id);
    Ok(created(prescription))
}

async fn update_prescription(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<PrescriptionInput>,
) -> ApiResult<Envelope<Prescription>> {
    auth.require(Role::can_edit_clinical)?;
    Ok(ok(clinical::update_prescription(state.pool(), id, &input).await?))
}

async fn delete_prescription(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Option<()>>> {
    auth.require(Role::can_edit_clinical)?;
    clinical::delete_prescription(state.pool(), id).await?;
    Ok(deleted("Prescrição excluída"))
}

async fn list_attachments(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(record_id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Vec<Attachment>>> {
    auth.require(Role::can_edit_clinical)?;
    medical_records::status_of(state.pool(), record_id).await?;
    Ok(ok(clinical::list_attachments(state.pool(), record_id).await?))
}

async fn create_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(record_id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<AttachmentInput>,
) -> ApiResult<(StatusCode, Envelope<Attachment>)> {
    auth.require(Role::can_edit_clinical)?;
    let attachment = clinical::insert_attachment(state.pool(), record_id, &input, Some(auth.id)).await?;
    info!("Anexo {} ({} bytes) no prontuário {}", attachment.id, attachment.size_bytes, record_id);
    Ok(created(attachment))
}

async fn update_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(input): ValidJson<AttachmentInput>,
) -> ApiResult<Envelope<Attachment>> {
    auth.require(Role::can_edit_clinical)?;
    Ok(ok(clinical::update_attachment(state.pool(), id, &input).await?))
}

async fn delete_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Envelope<Option<()>>> {
    auth.require(Role::can_edit_clinical)?;
    clinical::delete_attachment(state.pool(), id).await?;
    Ok(deleted("Anexo excluído"))
}
