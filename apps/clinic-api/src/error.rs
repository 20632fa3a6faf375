//! Erros da API e seu envelope JSON `{success: false, message, errors?}`

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common_auth::AuthError;
use common_db::DbError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use validator::{ValidationErrors, ValidationErrorsKind};

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Gone(String),

    /// Operação que o estado atual do recurso não permite
    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

pub const VALIDATION_MESSAGE: &str = "Dados inválidos";

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FieldErrors>,
}

impl ApiError {
    /// Erro de validação de um único campo
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation { message: VALIDATION_MESSAGE.to_string(), errors }
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("Você não tem permissão para esta operação".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match &self {
            ApiError::Validation { message, errors } => (message.clone(), Some(errors)),
            ApiError::Internal(e) => {
                // O detalhe fica no log, nunca na resposta
                error!("Erro interno: {:#}", e);
                ("Erro interno do servidor".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            success: false,
            message: &message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => ApiError::NotFound(format!("Não encontrado: {}", what)),
            DbError::InvalidState(message) => ApiError::InvalidState(message),
            DbError::ConstraintViolation(message) => {
                warn!("Violação de restrição: {}", message);
                ApiError::Validation {
                    message: "Registro conflita com dados existentes".to_string(),
                    errors: FieldErrors::new(),
                }
            }
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized("Credenciais inválidas".to_string()),
            AuthError::MissingToken => ApiError::Unauthorized("Token de acesso ausente".to_string()),
            AuthError::ExpiredToken => ApiError::Unauthorized("Sessão expirada".to_string()),
            AuthError::InvalidToken(_) => ApiError::Unauthorized("Token de acesso inválido".to_string()),
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        collect_errors(&errors, None, &mut fields);
        ApiError::Validation { message: VALIDATION_MESSAGE.to_string(), errors: fields }
    }
}

/// Achata erros aninhados em chaves `pai.campo`. Erros de schema usam o
/// código do erro como nome do campo.
fn collect_errors(errors: &ValidationErrors, prefix: Option<&str>, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let target = if *field == "__all__" { error.code.to_string() } else { key.clone() };
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Valor inválido para {}", target));
                    out.entry(target).or_default().push(message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(nested, Some(&key), out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(nested, Some(&format!("{}.{}", key, index)), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Nome curto"))]
        name: String,
        #[validate(custom = "common_validation::validate_cpf")]
        cpf: String,
    }

    #[test]
    fn test_validation_errors_become_field_map() {
        let sample = Sample { name: "Al".into(), cpf: "123".into() };
        let err: ApiError = sample.validate().unwrap_err().into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors["name"], vec!["Nome curto".to_string()]);
                assert_eq!(errors["cpf"], vec!["CPF inválido".to_string()]);
            }
            other => panic!("esperava validação, veio {:?}", other),
        }
    }

    #[test]
    fn test_db_errors_map_to_status() {
        assert_eq!(ApiError::from(DbError::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(DbError::InvalidState("x".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(DbError::QueryError("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::from(AuthError::ExpiredToken).status(), StatusCode::UNAUTHORIZED);
    }
}
