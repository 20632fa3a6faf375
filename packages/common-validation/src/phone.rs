//! Telefones brasileiros: fixos `(DD) DDDD-DDDD` e celulares `(DD) DDDDD-DDDD`

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

use crate::strip_non_digits;

static LANDLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\d{2}\) \d{4}-\d{4}$").expect("regex de telefone fixo"));
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\d{2}\) \d{5}-\d{4}$").expect("regex de celular"));

/// Número máximo de dígitos (DDD + celular)
pub const PHONE_MAX_DIGITS: usize = 11;

/// Formata o telefone conforme a quantidade de dígitos.
///
/// Até 10 dígitos usa a máscara de telefone fixo; 11 dígitos usa a de
/// celular. Entradas parciais são formatadas progressivamente.
pub fn format_phone(input: &str) -> String {
    let digits: String = strip_non_digits(input).chars().take(PHONE_MAX_DIGITS).collect();
    if digits.is_empty() {
        return digits;
    }

    // Tamanho do bloco antes do hífen
    let prefix_len = if digits.len() <= 10 { 4 } else { 5 };
    let mut out = String::with_capacity(15);
    out.push('(');

    for (i, c) in digits.chars().enumerate() {
        if i == 2 {
            out.push_str(") ");
        } else if i == 2 + prefix_len {
            out.push('-');
        }
        out.push(c);
    }

    out
}

/// Campo opcional: vazio é válido; caso contrário exige uma das duas máscaras
pub fn is_valid_phone(input: &str) -> bool {
    input.is_empty() || LANDLINE_RE.is_match(input) || MOBILE_RE.is_match(input)
}

/// Adaptador para `#[validate(custom = "validate_phone")]`
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if is_valid_phone(value) {
        Ok(())
    } else {
        let mut error = ValidationError::new("phone");
        error.message = Some(Cow::from(
            "Telefone deve estar no formato (00) 0000-0000 ou (00) 00000-0000",
        ));
        Err(error)
    }
}
