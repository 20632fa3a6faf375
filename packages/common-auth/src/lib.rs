//! Common Auth - autenticação compartilhada
//!
//! Esta biblioteca fornece:
//! - Hash e verificação de senhas com Argon2id
//! - Emissão e validação de tokens JWT (HS256)
//! - Papéis de usuário e suas permissões

use thiserror::Error;

pub mod password;
pub mod roles;
pub mod token;

pub use password::{hash_password, verify_password};
pub use roles::Role;
pub use token::{bearer_token, Claims, IssuedToken, TokenIssuer};

/// Erros de autenticação
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token ausente")]
    MissingToken,

    #[error("Token expirado")]
    ExpiredToken,

    #[error("Token inválido: {0}")]
    InvalidToken(String),

    #[error("Falha no hash de senha: {0}")]
    PasswordHash(String),

    #[error("Papel desconhecido: {0}")]
    UnknownRole(String),
}
