//! Common Validation - validadores e formatadores compartilhados
//!
//! Esta biblioteca fornece:
//! - Validação e formatação de CPF
//! - Validação e formatação de telefones brasileiros
//! - Utilidades de datas usadas em formulários
//!
//! Todas as funções são puras e nunca entram em pânico. Os adaptadores
//! `validate_*` retornam [`validator::ValidationError`] para uso com
//! `#[validate(custom = "...")]`.

pub mod cpf;
pub mod date;
pub mod phone;

pub use cpf::{format_cpf, is_valid_cpf, validate_cpf};
pub use date::{is_supported_date, parse_iso_date, validate_birth_date, validate_supported_date};
pub use phone::{format_phone, is_valid_phone, validate_phone};

/// Remove todos os caracteres que não são dígitos ASCII
pub fn strip_non_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_non_digits() {
        assert_eq!(strip_non_digits("529.982.247-25"), "52998224725");
        assert_eq!(strip_non_digits("(11) 99876-5432"), "11998765432");
        assert_eq!(strip_non_digits("abc"), "");
        // Dígitos não-ASCII são descartados
        assert_eq!(strip_non_digits("١٢3"), "3");
    }
}
