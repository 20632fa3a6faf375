//! Login, logout e usuário atual

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use common_auth::{verify_password, AuthError};
use common_db::models::User;
use common_db::repo::{tokens, users};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ValidJson;
use crate::response::{ok, with_message, Envelope};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "Informe a senha"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

async fn login(State(state): State<AppState>, ValidJson(request): ValidJson<LoginRequest>) -> ApiResult<Envelope<LoginData>> {
    let email = request.email.trim().to_lowercase();
    let user = match users::find_by_email(state.pool(), &email).await? {
        Some(user) if user.active => user,
        _ => {
            warn!("Login recusado para {}", email);
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    // Argon2 é caro; fora do executor assíncrono
    let hash = user.password_hash.clone();
    let password = request.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(anyhow::Error::new)??;
    if !valid {
        warn!("Senha incorreta para {}", email);
        return Err(AuthError::InvalidCredentials.into());
    }

    let issued = state.tokens.issue(user.id, user.role)?;
    info!("Login de {} ({})", user.email, user.role);

    Ok(ok(LoginData {
        token: issued.token,
        token_type: "Bearer",
        expires_in: issued.expires_in,
        user,
    }))
}

async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Envelope<Option<()>>> {
    tokens::revoke(state.pool(), auth.jti, auth.id, auth.expires_at).await?;
    info!("Logout do usuário {}", auth.id);
    Ok(with_message(None, "Sessão encerrada"))
}

async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Envelope<User>> {
    Ok(ok(users::get(state.pool(), auth.id).await?))
}
