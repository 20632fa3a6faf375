//! Utilidades de data para formulários

use std::borrow::Cow;

use chrono::{Datelike, NaiveDate, Utc};
use validator::ValidationError;

/// Interpreta uma data no formato `YYYY-MM-DD`
pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Anos aceitos em datas vindas de formulários e filtros
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

/// Data dentro de [`MIN_YEAR`, `MAX_YEAR`], onde a aritmética de semanas e
/// fusos horários nunca transborda
pub fn is_supported_date(date: NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

/// Adaptador para `#[validate(custom = "validate_supported_date")]`
pub fn validate_supported_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if is_supported_date(*date) {
        return Ok(());
    }
    let mut error = ValidationError::new("supported_date");
    error.message = Some(Cow::from(format!("Data deve estar entre os anos {} e {}", MIN_YEAR, MAX_YEAR)));
    Err(error)
}

/// Data de nascimento não pode estar no futuro nem antes de 1900
pub fn check_birth_date(date: &NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    if *date > today || *date < earliest {
        let mut error = ValidationError::new("birth_date");
        error.message = Some(Cow::from("Data de nascimento inválida"));
        return Err(error);
    }
    Ok(())
}

/// Adaptador para `#[validate(custom = "validate_birth_date")]`
pub fn validate_birth_date(date: &NaiveDate) -> Result<(), ValidationError> {
    check_birth_date(date, Utc::now().date_naive())
}
