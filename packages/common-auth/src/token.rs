//! Tokens de acesso JWT

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{AuthError, Role};

/// Conteúdo do token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// ID do usuário
    pub sub: Uuid,
    pub role: Role,
    /// Identificador único do token, usado para revogação no logout
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
    /// Segundos até expirar
    pub expires_in: i64,
}

/// Emite e valida tokens com um segredo compartilhado
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            role,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        debug!("Token emitido para usuário {} ({})", user_id, role);
        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
            expires_in: self.ttl.num_seconds(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

/// Extrai o token de um cabeçalho `Authorization: Bearer <token>`
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("segredo-de-teste-com-32-bytes-ok!", 3600);
        let user_id = Uuid::new_v4();
        let issued = issuer.issue(user_id, Role::Doctor).unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issued = TokenIssuer::new("segredo-a", 60).issue(Uuid::new_v4(), Role::Admin).unwrap();
        let err = TokenIssuer::new("segredo-b", 60).verify(&issued.token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_expired_token() {
        // Além da tolerância padrão de 60s do jsonwebtoken
        let issuer = TokenIssuer::new("segredo", -300);
        let issued = issuer.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(matches!(issuer.verify(&issued.token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_claims_serialization() {
        let claims = Claims {
            sub: Uuid::nil(),
            role: Role::Receptionist,
            jti: Uuid::nil(),
            iat: 0,
            exp: 10,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "receptionist");
    }
}
