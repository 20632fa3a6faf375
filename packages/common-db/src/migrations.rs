//! Sistema de migrações para banco de dados
//!
//! Este módulo gerencia as migrações do banco de dados SQLite. A versão
//! aplicada fica em `PRAGMA user_version`.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{error, info};

/// Lista de migrações SQL a serem aplicadas
const MIGRATIONS: &[&str] = &[
    // 001_initial_schema.sql
    r#"
    -- Usuários do sistema
    CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('admin', 'doctor', 'receptionist')),
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    );

    -- Pacientes; CPF apenas com dígitos
    CREATE TABLE IF NOT EXISTS patients (
        id BLOB PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        birth_date DATE NOT NULL,
        cpf TEXT NOT NULL UNIQUE CHECK (length(cpf) = 11),
        phone TEXT,
        email TEXT,
        address TEXT,
        notes TEXT,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    );

    -- Agendamentos
    CREATE TABLE IF NOT EXISTS appointments (
        id BLOB PRIMARY KEY NOT NULL,
        patient_id BLOB NOT NULL,
        doctor_id BLOB NOT NULL,
        starts_at TIMESTAMP NOT NULL,
        ends_at TIMESTAMP NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('scheduled', 'confirmed', 'done', 'cancelled', 'no_show')),
        appointment_type TEXT NOT NULL,
        fee REAL,
        notes TEXT,
        created_by BLOB,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        FOREIGN KEY (patient_id) REFERENCES patients (id) ON DELETE CASCADE,
        FOREIGN KEY (doctor_id) REFERENCES users (id),
        FOREIGN KEY (created_by) REFERENCES users (id) ON DELETE SET NULL
    );

    -- Prontuários com conteúdo clínico criptografado
    CREATE TABLE IF NOT EXISTS medical_records (
        id BLOB PRIMARY KEY NOT NULL,
        patient_id BLOB NOT NULL,
        doctor_id BLOB NOT NULL,
        appointment_id BLOB,
        content_ciphertext BLOB NOT NULL,
        content_nonce BLOB NOT NULL,
        vital_signs TEXT, -- JSON
        status TEXT NOT NULL CHECK (status IN ('draft', 'finalized', 'signed')),
        finalized_at TIMESTAMP,
        signed_at TIMESTAMP,
        signed_by BLOB,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        FOREIGN KEY (patient_id) REFERENCES patients (id) ON DELETE CASCADE,
        FOREIGN KEY (doctor_id) REFERENCES users (id),
        FOREIGN KEY (appointment_id) REFERENCES appointments (id) ON DELETE SET NULL,
        FOREIGN KEY (signed_by) REFERENCES users (id)
    );

    -- Tabela de chaves mestras
    CREATE TABLE IF NOT EXISTS master_keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TIMESTAMP NOT NULL,
        active BOOLEAN NOT NULL DEFAULT 0,
        wrapped_key_ciphertext BLOB NOT NULL,
        wrapped_key_nonce BLOB NOT NULL,
        kdf_salt BLOB NOT NULL,
        key_version INTEGER NOT NULL
    );

    -- Índices para otimização
    CREATE INDEX IF NOT EXISTS idx_patients_name ON patients (name);
    CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments (patient_id);
    CREATE INDEX IF NOT EXISTS idx_appointments_doctor_starts ON appointments (doctor_id, starts_at);
    CREATE INDEX IF NOT EXISTS idx_appointments_starts_at ON appointments (starts_at);
    CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments (status);
    CREATE INDEX IF NOT EXISTS idx_medical_records_patient_id ON medical_records (patient_id);
    CREATE INDEX IF NOT EXISTS idx_medical_records_status ON medical_records (status);
    "#,

    // 002_clinical_children_and_reports.sql
    r#"
    CREATE TABLE IF NOT EXISTS diagnoses (
        id BLOB PRIMARY KEY NOT NULL,
        medical_record_id BLOB NOT NULL,
        icd_code TEXT NOT NULL,
        description TEXT NOT NULL,
        diagnosis_type TEXT NOT NULL CHECK (diagnosis_type IN ('primary', 'secondary')),
        status TEXT NOT NULL CHECK (status IN ('suspected', 'confirmed', 'ruled_out')),
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        FOREIGN KEY (medical_record_id) REFERENCES medical_records (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS prescriptions (
        id BLOB PRIMARY KEY NOT NULL,
        medical_record_id BLOB NOT NULL,
        medication TEXT NOT NULL,
        dosage TEXT NOT NULL,
        frequency TEXT NOT NULL,
        duration TEXT,
        instructions TEXT,
        status TEXT NOT NULL CHECK (status IN ('active', 'completed', 'cancelled')),
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        FOREIGN KEY (medical_record_id) REFERENCES medical_records (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS attachments (
        id BLOB PRIMARY KEY NOT NULL,
        medical_record_id BLOB NOT NULL,
        file_name TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        storage_path TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL CHECK (status IN ('pending', 'processed', 'archived')),
        uploaded_by BLOB,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        FOREIGN KEY (medical_record_id) REFERENCES medical_records (id) ON DELETE CASCADE,
        FOREIGN KEY (uploaded_by) REFERENCES users (id) ON DELETE SET NULL
    );

    -- Relatórios exportados
    CREATE TABLE IF NOT EXISTS reports (
        id BLOB PRIMARY KEY NOT NULL,
        report_type TEXT NOT NULL,
        format TEXT NOT NULL CHECK (format IN ('csv', 'json')),
        period_start DATE,
        period_end DATE,
        status TEXT NOT NULL CHECK (status IN ('generating', 'completed', 'failed', 'scheduled')),
        file_path TEXT,
        file_size INTEGER,
        error_message TEXT,
        requested_by BLOB NOT NULL,
        scheduled_for TIMESTAMP,
        completed_at TIMESTAMP,
        expires_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL,
        FOREIGN KEY (requested_by) REFERENCES users (id) ON DELETE CASCADE
    );

    -- Tokens revogados no logout, mantidos até expirarem
    CREATE TABLE IF NOT EXISTS revoked_tokens (
        jti BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL,
        revoked_at TIMESTAMP NOT NULL,
        expires_at TIMESTAMP NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_diagnoses_record ON diagnoses (medical_record_id);
    CREATE INDEX IF NOT EXISTS idx_prescriptions_record ON prescriptions (medical_record_id);
    CREATE INDEX IF NOT EXISTS idx_attachments_record ON attachments (medical_record_id);
    CREATE INDEX IF NOT EXISTS idx_reports_status ON reports (status);
    CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires ON revoked_tokens (expires_at);
    "#,
];

/// Número de migrações conhecidas
pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Executa todas as migrações pendentes no banco de dados
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Aplicando migrações de banco de dados...");

    let mut version: i64 = 0;
    match sqlx::query_scalar("PRAGMA user_version").fetch_one(pool).await {
        Ok(v) => version = v,
        Err(e) => {
            // Pode ser a primeira execução
            error!("Erro ao obter versão do banco: {}", e);
        }
    }

    info!("Versão atual do banco: {}", version);

    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        if migration_version <= version {
            info!("Migração {} já aplicada", migration_version);
            continue;
        }

        info!("Aplicando migração {}...", migration_version);

        let mut transaction = pool
            .begin()
            .await
            .context(format!("Falha ao iniciar transação para migração {}", migration_version))?;

        sqlx::query(migration_sql)
            .execute(&mut *transaction)
            .await
            .context(format!("Falha ao executar migração {}", migration_version))?;

        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .context(format!("Falha ao atualizar versão para {}", migration_version))?;

        transaction
            .commit()
            .await
            .context(format!("Falha ao confirmar transação para migração {}", migration_version))?;

        info!("Migração {} aplicada com sucesso", migration_version);
    }

    info!("Migrações concluídas. Versão atual: {}", MIGRATIONS.len());
    Ok(())
}
