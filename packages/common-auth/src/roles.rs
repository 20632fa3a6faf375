//! Papéis de usuário

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Receptionist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
        }
    }

    /// Cadastro, edição e exclusão de pacientes
    pub fn can_manage_patients(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Prontuários, diagnósticos e prescrições
    pub fn can_edit_clinical(&self) -> bool {
        matches!(self, Role::Admin | Role::Doctor)
    }

    /// Assinatura de prontuários
    pub fn can_sign_records(&self) -> bool {
        matches!(self, Role::Admin | Role::Doctor)
    }

    /// Agenda: todos os papéis podem marcar e remarcar
    pub fn can_schedule(&self) -> bool {
        true
    }

    /// Relatórios gerenciais
    pub fn can_manage_reports(&self) -> bool {
        matches!(self, Role::Admin | Role::Receptionist)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}
