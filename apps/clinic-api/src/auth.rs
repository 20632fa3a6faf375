//! Extrator do usuário autenticado
//!
//! Lê `Authorization: Bearer <jwt>`, valida assinatura e expiração, recusa
//! tokens revogados no logout e usuários desativados.

use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::{DateTime, Utc};
use common_auth::{bearer_token, AuthError, Role};
use common_db::repo::{tokens, users};
use common_db::DbError;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    /// Falha com 403 quando o papel não tem a permissão
    pub fn require(&self, allowed: impl Fn(&Role) -> bool) -> ApiResult<()> {
        if allowed(&self.role) {
            Ok(())
        } else {
            debug!("Acesso negado ao usuário {} ({})", self.id, self.role);
            Err(ApiError::forbidden())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = bearer_token(header).ok_or(AuthError::MissingToken)?;
        let claims = state.tokens.verify(token)?;

        if tokens::is_revoked(state.pool(), claims.jti).await? {
            return Err(ApiError::Unauthorized("Sessão encerrada".to_string()));
        }

        let user = match users::get(state.pool(), claims.sub).await {
            Ok(user) => user,
            Err(DbError::NotFound(_)) => {
                return Err(ApiError::Unauthorized("Usuário não encontrado".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if !user.active {
            return Err(ApiError::Unauthorized("Usuário desativado".to_string()));
        }

        Ok(AuthUser {
            id: user.id,
            // O papel vem do banco; um token antigo não mantém um papel revogado
            role: user.role,
            jti: claims.jti,
            expires_at: claims.expires_at(),
        })
    }
}
