//! Erros do cliente HTTP

use std::collections::BTreeMap;

use thiserror::Error;

/// Rota para onde a interface volta quando a sessão cai
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Error, Debug)]
pub enum ClientError {
    /// Token ausente, inválido ou expirado. O token salvo já foi apagado.
    #[error("Sessão expirada, redirecionando para {redirect_to}")]
    Unauthorized { redirect_to: String },

    /// Login recusado pela API
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Relatório expirado: {0}")]
    Gone(String),

    #[error("Erro da API ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Erro de transporte: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resposta inesperada: {0}")]
    Decode(String),

    #[error("Falha no armazenamento do token: {0}")]
    Store(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Texto para exibir ao usuário. Erros de validação juntam as mensagens
    /// de cada campo; os demais usam a mensagem da API.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Validation { message, errors } => {
                let joined: Vec<&str> = errors
                    .values()
                    .flat_map(|messages| messages.iter().map(String::as_str))
                    .collect();
                if joined.is_empty() {
                    message.clone()
                } else {
                    joined.join(" ")
                }
            }
            ClientError::InvalidCredentials(message)
            | ClientError::Forbidden(message)
            | ClientError::NotFound(message)
            | ClientError::Gone(message)
            | ClientError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_message_joins_field_errors() {
        let mut errors = BTreeMap::new();
        errors.insert("cpf".to_string(), vec!["CPF inválido".to_string()]);
        errors.insert("name".to_string(), vec!["Nome obrigatório".to_string()]);
        let err = ClientError::Validation { message: "Dados inválidos".into(), errors };
        assert_eq!(err.display_message(), "CPF inválido Nome obrigatório");

        let bare = ClientError::Validation { message: "Dados inválidos".into(), errors: BTreeMap::new() };
        assert_eq!(bare.display_message(), "Dados inválidos");

        let api = ClientError::Api { status: 500, message: "Erro interno".into() };
        assert_eq!(api.display_message(), "Erro interno");
    }
}
