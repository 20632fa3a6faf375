//! Validação e formatação de CPF
//!
//! O CPF tem 11 dígitos, sendo os dois últimos dígitos verificadores
//! calculados por somas ponderadas módulo 11.

use std::borrow::Cow;

use validator::ValidationError;

use crate::strip_non_digits;

/// Quantidade de dígitos de um CPF completo
pub const CPF_LENGTH: usize = 11;

/// Calcula um dígito verificador a partir dos dígitos anteriores.
///
/// O peso do primeiro dígito é `digits.len() + 1` e decresce até 2.
fn check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 => 0,
        r => r,
    }
}

/// Verifica se o CPF é válido. Aceita entrada formatada ou só dígitos.
pub fn is_valid_cpf(input: &str) -> bool {
    let digits: Vec<u32> = strip_non_digits(input)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != CPF_LENGTH {
        return false;
    }

    // 000.000.000-00, 111.111.111-11, ... passam no cálculo mas não são válidos
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Formata o CPF como `000.000.000-00` à medida que os dígitos são digitados.
///
/// Caracteres não numéricos são descartados e dígitos excedentes ignorados;
/// entradas parciais formatam apenas o que existe (`"1234"` vira `"123.4"`).
pub fn format_cpf(input: &str) -> String {
    let digits = strip_non_digits(input);
    let mut out = String::with_capacity(14);

    for (i, c) in digits.chars().take(CPF_LENGTH).enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }

    out
}

/// Adaptador para `#[validate(custom = "validate_cpf")]`
pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(value) {
        Ok(())
    } else {
        let mut error = ValidationError::new("cpf");
        error.message = Some(Cow::from("CPF inválido"));
        Err(error)
    }
}
