// ==========================================
// Materiales Costing - Numeric coercion
// ==========================================
// Text-typed numbers arrive with either decimal separator.
// Empty means 0.0 unless the caller requires a value.
// ==========================================

use crate::domain::material::BaseValue;
use crate::engine::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blank {
    /// Empty input is coerced to 0.0
    Zero,
    /// Empty input is a validation error
    Required,
}

/// Parses a text value, normalizing `,` to `.`
pub fn parse_number(raw: Option<&str>, field: &str, blank: Blank) -> EngineResult<f64> {
    let trimmed = raw.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return match blank {
            Blank::Zero => Ok(0.0),
            Blank::Required => Err(EngineError::validation(format!(
                "El campo {} requiere un valor numérico",
                field
            ))),
        };
    }

    let normalized = trimmed.replace(',', ".");
    normalized.parse::<f64>().map_err(|_| {
        EngineError::validation(format!(
            "El campo {} debe ser numérico (valor recibido: '{}')",
            field,
            raw.unwrap_or_default()
        ))
    })
}

pub fn base_value_to_number(value: &BaseValue, field: &str, blank: Blank) -> EngineResult<f64> {
    match value {
        BaseValue::Number(n) => Ok(*n),
        BaseValue::Text(s) => parse_number(Some(s), field, blank),
        BaseValue::Empty => parse_number(None, field, blank),
    }
}

/// Lenient variant for spreadsheet cells: unparseable text falls back to 0.0
pub fn parse_number_lenient(raw: &str) -> f64 {
    let cleaned = raw.trim().replace('$', "").replace(',', ".");
    cleaned.trim().parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_comma_decimal() {
        assert_eq!(parse_number(Some("12,5"), "cantidad", Blank::Zero).unwrap(), 12.5);
        assert_eq!(parse_number(Some(" 3 "), "cantidad", Blank::Zero).unwrap(), 3.0);
    }

    #[test]
    fn test_parse_number_blank_handling() {
        assert_eq!(parse_number(None, "cantidad", Blank::Zero).unwrap(), 0.0);
        assert_eq!(parse_number(Some("  "), "cantidad", Blank::Zero).unwrap(), 0.0);

        let err = parse_number(None, "cantidad", Blank::Required).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_parse_number_rejects_text() {
        let err = parse_number(Some("abc"), "cantidad", Blank::Zero).unwrap_err();
        match err {
            EngineError::Validation(msg) => assert!(msg.contains("debe ser numérico")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_number_lenient() {
        assert_eq!(parse_number_lenient("$ 1500,5"), 1500.5);
        assert_eq!(parse_number_lenient("n/a"), 0.0);
    }
}
