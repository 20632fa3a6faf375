//! Banco temporário para testes, com chave de criptografia efêmera

use chrono::NaiveDate;
use common_auth::Role;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use crate::crypto::EncryptionKey;
use crate::models::{NewUser, Patient, PatientInput, User};
use crate::repo::{patients, users};
use crate::{init_db_pool, Database, DbConfig};

pub struct TestDb {
    pool: SqlitePool,
    key: EncryptionKey,
    // Mantém o diretório vivo enquanto o banco estiver em uso
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("diretório temporário");
        let config = DbConfig {
            db_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            key_phrase: "frase-de-teste".to_string(),
            max_connections: 2,
            log_statements: false,
        };
        let pool = init_db_pool(&config).await.expect("pool de teste");

        Self {
            pool,
            key: EncryptionKey::generate(),
            _dir: dir,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    /// `Database` compartilhando o mesmo pool e a mesma chave
    pub fn database(&self) -> Database {
        Database {
            pool: self.pool.clone(),
            key: std::sync::Arc::new(self.key.clone()),
        }
    }

    pub async fn user(&self, name: &str, role: Role) -> User {
        users::insert(
            &self.pool,
            &NewUser {
                name: name.to_string(),
                email: format!("{}@clinica.test", Uuid::new_v4().simple()),
                password: "senha-de-teste".to_string(),
                role,
            },
        )
        .await
        .expect("usuário de teste")
    }

    pub async fn doctor(&self, name: &str) -> User {
        self.user(name, Role::Doctor).await
    }

    pub async fn admin(&self, name: &str) -> User {
        self.user(name, Role::Admin).await
    }

    pub async fn patient(&self, name: &str, cpf: &str) -> Patient {
        patients::insert(&self.pool, &patient_input(name, cpf))
            .await
            .expect("paciente de teste")
    }
}

pub fn patient_input(name: &str, cpf: &str) -> PatientInput {
    PatientInput {
        name: name.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1985, 3, 20).expect("data válida"),
        cpf: cpf.to_string(),
        phone: Some("(11) 99876-5432".to_string()),
        email: None,
        address: None,
        notes: None,
    }
}
