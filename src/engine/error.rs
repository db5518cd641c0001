// ==========================================
// Materiales Costing - Engine error types
// ==========================================
// Tool: thiserror derive
// ==========================================

use crate::domain::types::HeaderKind;
use thiserror::Error;

/// Errors raised by the schema model, evaluator, normalizer and accumulator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("No existe el header {kind} con id {id}")]
    HeaderNotFound { kind: HeaderKind, id: i64 },

    #[error("{0}")]
    Validation(String),

    #[error("División por cero en cálculo de header base/atributo")]
    DivisionByZero,

    #[error("Esquema de headers inválido: {0}")]
    Schema(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
