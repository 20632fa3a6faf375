//! Usuários do sistema

use chrono::Utc;
use common_auth::{hash_password, Role};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{NewUser, User};

pub async fn insert(pool: &SqlitePool, new_user: &NewUser) -> DbResult<User> {
    let password_hash =
        hash_password(&new_user.password).map_err(|e| DbError::InternalError(e.to_string()))?;
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, password_hash, role, active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 1, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new_user.name.trim())
    .bind(new_user.email.trim().to_lowercase())
    .bind(password_hash)
    .bind(new_user.role)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> DbResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("usuário {}", id)))
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> DbResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Usuários ativos, opcionalmente filtrados por papel
pub async fn list(pool: &SqlitePool, role: Option<Role>) -> DbResult<Vec<User>> {
    let users = match role {
        Some(role) => {
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE active = 1 AND role = ? ORDER BY name")
                .bind(role)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE active = 1 ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(users)
}

/// Verifica se o usuário existe, está ativo e é médico
pub async fn is_active_doctor(pool: &SqlitePool, id: Uuid) -> DbResult<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM users WHERE id = ? AND role = ? AND active = 1")
            .bind(id)
            .bind(Role::Doctor)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Cria o administrador inicial quando a tabela de usuários está vazia.
///
/// Retorna `true` se o usuário foi criado.
pub async fn ensure_admin(pool: &SqlitePool, name: &str, email: &str, password: &str) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(false);
    }

    insert(
        pool,
        &NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        },
    )
    .await?;

    info!("Administrador inicial criado: {}", email);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDb;
    use common_auth::verify_password;

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = TestDb::new().await;
        let user = insert(
            db.pool(),
            &NewUser {
                name: "Dra. Ana".into(),
                email: "Ana@Clinica.com".into(),
                password: "senha-segura".into(),
                role: Role::Doctor,
            },
        )
        .await
        .unwrap();

        let found = find_by_email(db.pool(), "ana@clinica.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, Role::Doctor);
        assert!(verify_password("senha-segura", &found.password_hash).unwrap());
        assert!(is_active_doctor(db.pool(), user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_constraint_violation() {
        let db = TestDb::new().await;
        let new_user = NewUser {
            name: "Recepção".into(),
            email: "recepcao@clinica.com".into(),
            password: "senha-segura".into(),
            role: Role::Receptionist,
        };
        insert(db.pool(), &new_user).await.unwrap();
        let err = insert(db.pool(), &new_user).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_ensure_admin_only_once() {
        let db = TestDb::new().await;
        assert!(ensure_admin(db.pool(), "Admin", "admin@clinica.com", "admin-123").await.unwrap());
        assert!(!ensure_admin(db.pool(), "Admin", "admin@clinica.com", "admin-123").await.unwrap());
        assert_eq!(list(db.pool(), Some(Role::Admin)).await.unwrap().len(), 1);
    }
}
