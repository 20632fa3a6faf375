//! Tokens revogados no logout
//!
//! O JWT continua válido criptograficamente até `exp`; a revogação é
//! consultada a cada requisição autenticada.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;

pub async fn revoke(pool: &SqlitePool, jti: Uuid, user_id: Uuid, expires_at: DateTime<Utc>) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO revoked_tokens (jti, user_id, revoked_at, expires_at) VALUES (?, ?, ?, ?)
         ON CONFLICT (jti) DO NOTHING",
    )
    .bind(jti)
    .bind(user_id)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_revoked(pool: &SqlitePool, jti: Uuid) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM revoked_tokens WHERE jti = ?")
        .bind(jti)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Remove revogações de tokens que já expiraram
pub async fn purge_expired(pool: &SqlitePool, now: DateTime<Utc>) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
