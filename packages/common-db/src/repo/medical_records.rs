//! Prontuários
//!
//! O conteúdo clínico é gravado criptografado com a chave mestra e só é
//! aberto na leitura. A edição só é permitida em rascunho e a progressão de
//! status é feita com `UPDATE ... WHERE status = <anterior>`.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::clinical;
use crate::crypto::{decrypt_json, encrypt_json, EncryptedData, EncryptionKey};
use crate::error::{DbError, DbResult};
use crate::models::{
    MedicalRecord, MedicalRecordDetail, MedicalRecordInput, MedicalRecordRow, Page, PageRequest,
    RecordStatus,
};

const SELECT_RECORD: &str = "SELECT r.*, p.name AS patient_name, u.name AS doctor_name
     FROM medical_records r
     JOIN patients p ON p.id = r.patient_id
     JOIN users u ON u.id = r.doctor_id
     WHERE 1 = 1";

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<RecordStatus>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RecordFilter) {
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND r.patient_id = ").push_bind(patient_id);
    }
    if let Some(doctor_id) = filter.doctor_id {
        qb.push(" AND r.doctor_id = ").push_bind(doctor_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND r.status = ").push_bind(status);
    }
}

fn open(row: MedicalRecordRow, key: &EncryptionKey) -> DbResult<MedicalRecord> {
    let encrypted = EncryptedData {
        ciphertext: row.content_ciphertext,
        nonce: row.content_nonce,
    };
    let content = decrypt_json(&encrypted, key)?;

    Ok(MedicalRecord {
        id: row.id,
        patient_id: row.patient_id,
        doctor_id: row.doctor_id,
        appointment_id: row.appointment_id,
        content,
        vital_signs: row.vital_signs.map(|Json(v)| v),
        status: row.status,
        finalized_at: row.finalized_at,
        signed_at: row.signed_at,
        signed_by: row.signed_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
        patient_name: row.patient_name,
        doctor_name: row.doctor_name,
    })
}

pub async fn list(
    pool: &SqlitePool,
    key: &EncryptionKey,
    filter: &RecordFilter,
    page: PageRequest,
) -> DbResult<Page<MedicalRecord>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY r.created_at DESC LIMIT ")
        .push_bind(page.per_page() as i64)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<MedicalRecordRow>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM medical_records r WHERE 1 = 1");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let items = rows
        .into_iter()
        .map(|row| open(row, key))
        .collect::<DbResult<Vec<_>>>()?;

    Ok(Page {
        items,
        total,
        page: page.page(),
        per_page: page.per_page(),
    })
}

async fn get_row(pool: &SqlitePool, id: Uuid) -> DbResult<MedicalRecordRow> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
    qb.push(" AND r.id = ").push_bind(id);
    qb.build_query_as::<MedicalRecordRow>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("prontuário {}", id)))
}

pub async fn get(pool: &SqlitePool, key: &EncryptionKey, id: Uuid) -> DbResult<MedicalRecord> {
    open(get_row(pool, id).await?, key)
}

/// Status atual, sem abrir o conteúdo
pub async fn status_of(pool: &SqlitePool, id: Uuid) -> DbResult<RecordStatus> {
    sqlx::query_scalar("SELECT status FROM medical_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("prontuário {}", id)))
}

/// Falha com `InvalidState` se o prontuário não estiver em rascunho
pub async fn ensure_editable(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    let status = status_of(pool, id).await?;
    if !status.is_editable() {
        return Err(DbError::InvalidState(format!(
            "prontuário {} está {} e não pode ser alterado",
            id,
            status.as_str()
        )));
    }
    Ok(())
}

/// Prontuário com diagnósticos, prescrições e anexos
pub async fn detail(pool: &SqlitePool, key: &EncryptionKey, id: Uuid) -> DbResult<MedicalRecordDetail> {
    let record = get(pool, key, id).await?;
    Ok(MedicalRecordDetail {
        record,
        diagnoses: clinical::list_diagnoses(pool, id).await?,
        prescriptions: clinical::list_prescriptions(pool, id).await?,
        attachments: clinical::list_attachments(pool, id).await?,
    })
}

/// Cria o prontuário em rascunho
pub async fn insert(pool: &SqlitePool, key: &EncryptionKey, input: &MedicalRecordInput) -> DbResult<MedicalRecord> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let encrypted = encrypt_json(&input.content, key)?;

    sqlx::query(
        "INSERT INTO medical_records
            (id, patient_id, doctor_id, appointment_id, content_ciphertext, content_nonce, vital_signs, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(input.patient_id)
    .bind(input.doctor_id)
    .bind(input.appointment_id)
    .bind(&encrypted.ciphertext)
    .bind(&encrypted.nonce)
    .bind(input.vital_signs.clone().map(Json))
    .bind(RecordStatus::Draft)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get(pool, key, id).await
}

/// Atualiza um rascunho
pub async fn update(
    pool: &SqlitePool,
    key: &EncryptionKey,
    id: Uuid,
    input: &MedicalRecordInput,
) -> DbResult<MedicalRecord> {
    let encrypted = encrypt_json(&input.content, key)?;

    let result = sqlx::query(
        "UPDATE medical_records
         SET patient_id = ?, doctor_id = ?, appointment_id = ?, content_ciphertext = ?, content_nonce = ?,
             vital_signs = ?, updated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(input.patient_id)
    .bind(input.doctor_id)
    .bind(input.appointment_id)
    .bind(&encrypted.ciphertext)
    .bind(&encrypted.nonce)
    .bind(input.vital_signs.clone().map(Json))
    .bind(Utc::now())
    .bind(id)
    .bind(RecordStatus::Draft)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Distingue inexistente de não editável
        ensure_editable(pool, id).await?;
    }

    get(pool, key, id).await
}

/// Remove um rascunho; filhos são removidos em cascata
pub async fn delete(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM medical_records WHERE id = ? AND status = ?")
        .bind(id)
        .bind(RecordStatus::Draft)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        ensure_editable(pool, id).await?;
    }
    Ok(())
}

/// Avança o status em uma etapa (rascunho → finalizado → assinado)
pub async fn transition(
    pool: &SqlitePool,
    key: &EncryptionKey,
    id: Uuid,
    target: RecordStatus,
    actor: Uuid,
) -> DbResult<MedicalRecord> {
    let current = status_of(pool, id).await?;
    if !current.can_transition_to(target) {
        return Err(DbError::InvalidState(format!(
            "transição de {} para {} não permitida",
            current.as_str(),
            target.as_str()
        )));
    }

    let now = Utc::now();
    let result = if target == RecordStatus::Signed {
        sqlx::query(
            "UPDATE medical_records SET status = ?, signed_at = ?, signed_by = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(target)
        .bind(now)
        .bind(actor)
        .bind(now)
        .bind(id)
        .bind(current)
        .execute(pool)
        .await?
    } else {
        sqlx::query(
            "UPDATE medical_records SET status = ?, finalized_at = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(target)
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(current)
        .execute(pool)
        .await?
    };

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidState(format!(
            "prontuário {} mudou de status durante a operação",
            id
        )));
    }

    get(pool, key, id).await
}

pub async fn count_by_status(pool: &SqlitePool, status: RecordStatus) -> DbResult<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM medical_records WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok(total)
}

/// Linhas criadas em `[from, to)` sem abrir o conteúdo, para exportação
pub async fn rows_between(
    pool: &SqlitePool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> DbResult<Vec<MedicalRecordRow>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
    if let Some(from) = from {
        qb.push(" AND r.created_at >= ").push_bind(from);
    }
    if let Some(to) = to {
        qb.push(" AND r.created_at < ").push_bind(to);
    }
    qb.push(" ORDER BY r.created_at ASC");
    let rows = qb.build_query_as::<MedicalRecordRow>().fetch_all(pool).await?;
    Ok(rows)
}
