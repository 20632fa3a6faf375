//! Diagnósticos, prescrições e anexos de um prontuário
//!
//! Todos exigem o prontuário pai em rascunho para criação, edição ou
//! exclusão. A leitura é sempre permitida. A condição de rascunho vai na
//! mesma instrução da escrita, de modo que uma finalização concorrente não
//! passa entre a verificação e a alteração.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::medical_records::ensure_editable;
use crate::error::{DbError, DbResult};
use crate::models::{
    Attachment, AttachmentInput, Diagnosis, DiagnosisInput, Prescription, PrescriptionInput, RecordStatus,
};

/// Condição sobre `medical_record_id` ligada a um `RecordStatus::Draft`
const DRAFT_PARENT: &str = "medical_record_id IN (SELECT id FROM medical_records WHERE status = ?)";

/// Condição de INSERT ... SELECT: prontuário `?` existe e está no status `?`
const DRAFT_EXISTS: &str = "EXISTS (SELECT 1 FROM medical_records WHERE id = ? AND status = ?)";

/// Prontuário ao qual um registro filho pertence
async fn parent_of(pool: &SqlitePool, table: &str, id: Uuid) -> DbResult<Uuid> {
    // `table` vem apenas das constantes deste módulo
    let sql = format!("SELECT medical_record_id FROM {} WHERE id = ?", table);
    sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("{} {}", table, id)))
}

/// Erro de uma escrita condicionada que não afetou nenhuma linha
async fn rejected(pool: &SqlitePool, record_id: Uuid) -> DbError {
    match ensure_editable(pool, record_id).await {
        Err(err) => err,
        Ok(()) => DbError::InvalidState(format!(
            "prontuário {} mudou de status durante a operação",
            record_id
        )),
    }
}

/// Erro de UPDATE/DELETE em filho: filho inexistente ou pai fora do rascunho
async fn rejected_child(pool: &SqlitePool, table: &str, id: Uuid) -> DbError {
    match parent_of(pool, table, id).await {
        Ok(record_id) => rejected(pool, record_id).await,
        Err(err) => err,
    }
}

async fn delete_child(pool: &SqlitePool, table: &str, id: Uuid) -> DbResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ? AND {}", table, DRAFT_PARENT);
    let result = sqlx::query(&sql)
        .bind(id)
        .bind(RecordStatus::Draft)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(rejected_child(pool, table, id).await);
    }
    Ok(())
}

// Diagnósticos

pub async fn list_diagnoses(pool: &SqlitePool, record_id: Uuid) -> DbResult<Vec<Diagnosis>> {
    let rows = sqlx::query_as::<_, Diagnosis>(
        "SELECT * FROM diagnoses WHERE medical_record_id = ? ORDER BY created_at ASC",
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_diagnosis(pool: &SqlitePool, id: Uuid) -> DbResult<Diagnosis> {
    sqlx::query_as::<_, Diagnosis>("SELECT * FROM diagnoses WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("diagnóstico {}", id)))
}

pub async fn insert_diagnosis(pool: &SqlitePool, record_id: Uuid, input: &DiagnosisInput) -> DbResult<Diagnosis> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO diagnoses (id, medical_record_id, icd_code, description, diagnosis_type, status, created_at, updated_at)
         SELECT ?, ?, ?, ?, ?, ?, ?, ? WHERE {}
         RETURNING *",
        DRAFT_EXISTS
    );

    let inserted = sqlx::query_as::<_, Diagnosis>(&sql)
        .bind(Uuid::new_v4())
        .bind(record_id)
        .bind(&input.icd_code)
        .bind(&input.description)
        .bind(input.diagnosis_type)
        .bind(input.status)
        .bind(now)
        .bind(now)
        .bind(record_id)
        .bind(RecordStatus::Draft)
        .fetch_optional(pool)
        .await?;

    match inserted {
        Some(diagnosis) => Ok(diagnosis),
        None => Err(rejected(pool, record_id).await),
    }
}

pub async fn update_diagnosis(pool: &SqlitePool, id: Uuid, input: &DiagnosisInput) -> DbResult<Diagnosis> {
    let sql = format!(
        "UPDATE diagnoses SET icd_code = ?, description = ?, diagnosis_type = ?, status = ?, updated_at = ?
         WHERE id = ? AND {}",
        DRAFT_PARENT
    );
    let result = sqlx::query(&sql)
        .bind(&input.icd_code)
        .bind(&input.description)
        .bind(input.diagnosis_type)
        .bind(input.status)
        .bind(Utc::now())
        .bind(id)
        .bind(RecordStatus::Draft)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(rejected_child(pool, "diagnoses", id).await);
    }
    get_diagnosis(pool, id).await
}

pub async fn delete_diagnosis(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    delete_child(pool, "diagnoses", id).await
}

// Prescrições

pub async fn list_prescriptions(pool: &SqlitePool, record_id: Uuid) -> DbResult<Vec<Prescription>> {
    let rows = sqlx::query_as::<_, Prescription>(
        "SELECT * FROM prescriptions WHERE medical_record_id = ? ORDER BY created_at ASC",
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_prescription(pool: &SqlitePool, id: Uuid) -> DbResult<Prescription> {
    sqlx::query_as::<_, Prescription>("SELECT * FROM prescriptions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("prescrição {}", id)))
}

pub async fn insert_prescription(
    pool: &SqlitePool,
    record_id: Uuid,
    input: &PrescriptionInput,
) -> DbResult<Prescription> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO prescriptions
            (id, medical_record_id, medication, dosage, frequency, duration, instructions, status, created_at, updated_at)
         SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ? WHERE {}
         RETURNING *",
        DRAFT_EXISTS
    );

    let inserted = sqlx::query_as::<_, Prescription>(&sql)
        .bind(Uuid::new_v4())
        .bind(record_id)
        .bind(&input.medication)
        .bind(&input.dosage)
        .bind(&input.frequency)
        .bind(&input.duration)
        .bind(&input.instructions)
        .bind(input.status)
        .bind(now)
        .bind(now)
        .bind(record_id)
        .bind(RecordStatus::Draft)
        .fetch_optional(pool)
        .await?;

    match inserted {
        Some(prescription) => Ok(prescription),
        None => Err(rejected(pool, record_id).await),
    }
}

pub async fn update_prescription(pool: &SqlitePool, id: Uuid, input: &PrescriptionInput) -> DbResult<Prescription> {
    let sql = format!(
        "UPDATE prescriptions
         SET medication = ?, dosage = ?, frequency = ?, duration = ?, instructions = ?, status = ?, updated_at = ?
         WHERE id = ? AND {}",
        DRAFT_PARENT
    );
    let result = sqlx::query(&sql)
        .bind(&input.medication)
        .bind(&input.dosage)
        .bind(&input.frequency)
        .bind(&input.duration)
        .bind(&input.instructions)
        .bind(input.status)
        .bind(Utc::now())
        .bind(id)
        .bind(RecordStatus::Draft)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(rejected_child(pool, "prescriptions", id).await);
    }
    get_prescription(pool, id).await
}

pub async fn delete_prescription(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    delete_child(pool, "prescriptions", id).await
}

// Anexos

pub async fn list_attachments(pool: &SqlitePool, record_id: Uuid) -> DbResult<Vec<Attachment>> {
    let rows = sqlx::query_as::<_, Attachment>(
        "SELECT * FROM attachments WHERE medical_record_id = ? ORDER BY created_at ASC",
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_attachment(pool: &SqlitePool, id: Uuid) -> DbResult<Attachment> {
    sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("anexo {}", id)))
}

pub async fn insert_attachment(
    pool: &SqlitePool,
    record_id: Uuid,
    input: &AttachmentInput,
    uploaded_by: Option<Uuid>,
) -> DbResult<Attachment> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO attachments
            (id, medical_record_id, file_name, mime_type, size_bytes, storage_path, description, status, uploaded_by, created_at, updated_at)
         SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ? WHERE {}
         RETURNING *",
        DRAFT_EXISTS
    );

    let inserted = sqlx::query_as::<_, Attachment>(&sql)
        .bind(Uuid::new_v4())
        .bind(record_id)
        .bind(&input.file_name)
        .bind(&input.mime_type)
        .bind(input.size_bytes)
        .bind(&input.storage_path)
        .bind(&input.description)
        .bind(input.status)
        .bind(uploaded_by)
        .bind(now)
        .bind(now)
        .bind(record_id)
        .bind(RecordStatus::Draft)
        .fetch_optional(pool)
        .await?;

    match inserted {
        Some(attachment) => Ok(attachment),
        None => Err(rejected(pool, record_id).await),
    }
}

pub async fn update_attachment(pool: &SqlitePool, id: Uuid, input: &AttachmentInput) -> DbResult<Attachment> {
    let sql = format!(
        "UPDATE attachments
         SET file_name = ?, mime_type = ?, size_bytes = ?, storage_path = ?, description = ?, status = ?, updated_at = ?
         WHERE id = ? AND {}",
        DRAFT_PARENT
    );
    let result = sqlx::query(&sql)
        .bind(&input.file_name)
        .bind(&input.mime_type)
        .bind(input.size_bytes)
        .bind(&input.storage_path)
        .bind(&input.description)
        .bind(input.status)
        .bind(Utc::now())
        .bind(id)
        .bind(RecordStatus::Draft)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(rejected_child(pool, "attachments", id).await);
    }
    get_attachment(pool, id).await
}

pub async fn delete_attachment(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    delete_child(pool, "attachments", id).await
}
