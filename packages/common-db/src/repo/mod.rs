//! Repositórios: funções assíncronas de acesso a dados por entidade
//!
//! Cada submódulo recebe o pool explicitamente; não há estado global.

pub mod appointments;
pub mod clinical;
pub mod dashboard;
pub mod medical_records;
pub mod patients;
pub mod reports;
pub mod tokens;
pub mod users;

use sqlx::sqlite::SqliteQueryResult;

use crate::error::{DbError, DbResult};

/// Converte "nenhuma linha afetada" em `NotFound`
pub(crate) fn expect_affected(result: SqliteQueryResult, entity: &str) -> DbResult<()> {
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(entity.to_string()));
    }
    Ok(())
}

/// Padrão `%termo%` para LIKE, escapando curingas
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("maria"), "%maria%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
