//! Pacientes

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{expect_affected, like_pattern};
use crate::error::{DbError, DbResult};
use crate::models::{Page, PageRequest, Patient, PatientInput};

/// Filtro da listagem de pacientes
#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    /// Busca por nome, e-mail ou dígitos do CPF
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PatientFilter) {
    let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };

    let pattern = like_pattern(term);
    qb.push(" AND (name LIKE ")
        .push_bind(pattern.clone())
        .push(" ESCAPE '\\' OR email LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\'");

    let digits = common_validation::strip_non_digits(term);
    if !digits.is_empty() {
        qb.push(" OR cpf LIKE ").push_bind(format!("%{}%", digits));
    }
    qb.push(")");
}

pub async fn list(pool: &SqlitePool, filter: &PatientFilter, page: PageRequest) -> DbResult<Page<Patient>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM patients WHERE 1 = 1");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY name ASC LIMIT ")
        .push_bind(page.per_page() as i64)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<Patient>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM patients WHERE 1 = 1");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok(Page {
        items,
        total,
        page: page.page(),
        per_page: page.per_page(),
    })
}

/// Todos os pacientes, para exportação
pub async fn all(pool: &SqlitePool) -> DbResult<Vec<Patient>> {
    let patients = sqlx::query_as::<_, Patient>("SELECT * FROM patients ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(patients)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> DbResult<Patient> {
    sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("paciente {}", id)))
}

pub async fn exists(pool: &SqlitePool, id: Uuid) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM patients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Busca pelo CPF (apenas dígitos)
pub async fn find_by_cpf(pool: &SqlitePool, cpf: &str) -> DbResult<Option<Patient>> {
    let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE cpf = ?")
        .bind(cpf)
        .fetch_optional(pool)
        .await?;
    Ok(patient)
}

/// Insere um paciente. A entrada deve estar validada e normalizada.
pub async fn insert(pool: &SqlitePool, input: &PatientInput) -> DbResult<Patient> {
    let now = Utc::now();
    let patient = sqlx::query_as::<_, Patient>(
        "INSERT INTO patients (id, name, birth_date, cpf, phone, email, address, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(input.birth_date)
    .bind(&input.cpf)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(&input.address)
    .bind(&input.notes)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(patient)
}

pub async fn update(pool: &SqlitePool, id: Uuid, input: &PatientInput) -> DbResult<Patient> {
    sqlx::query_as::<_, Patient>(
        "UPDATE patients
         SET name = ?, birth_date = ?, cpf = ?, phone = ?, email = ?, address = ?, notes = ?, updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(&input.name)
    .bind(input.birth_date)
    .bind(&input.cpf)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(&input.address)
    .bind(&input.notes)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DbError::NotFound(format!("paciente {}", id)))
}

/// Remove o paciente; agendamentos e prontuários são removidos em cascata
pub async fn delete(pool: &SqlitePool, id: Uuid) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM patients WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    expect_affected(result, &format!("paciente {}", id))
}

pub async fn count(pool: &SqlitePool) -> DbResult<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn count_created_between(
    pool: &SqlitePool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE created_at >= ? AND created_at < ?")
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await?;
    Ok(total)
}
