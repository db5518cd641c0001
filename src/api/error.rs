// ==========================================
// Materiales Costing - API layer error types
// ==========================================
// Maps engine, excel and repository failures to
// user-facing errors with an HTTP-like status code.
// ==========================================

use crate::engine::error::EngineError;
use crate::excel::error::ExcelError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API layer errors
/// Every message carries an explicit reason for the user.
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Business rule errors
    // ==========================================
    #[error("Recurso no encontrado: {0}")]
    NotFound(String),

    #[error("Datos inválidos: {0}")]
    ValidationError(String),

    #[error("División por cero en cálculo de header base/atributo")]
    DivisionByZero,

    #[error("Conflicto: {0}")]
    Conflict(String),

    // ==========================================
    // Data access errors
    // ==========================================
    #[error("Error de base de datos: {0}")]
    DatabaseError(String),

    #[error("Error de transacción: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // Spreadsheet errors
    // ==========================================
    #[error("Error de Excel: {0}")]
    ExcelError(String),

    // ==========================================
    // Generic
    // ==========================================
    #[error("Error interno: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Status code exposed to callers (404 / 400 / 409 / 500)
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::ValidationError(_) | ApiError::DivisionByZero => 400,
            ApiError::Conflict(_) => 409,
            _ => 500,
        }
    }
}

// ==========================================
// From EngineError
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::HeaderNotFound { .. } => ApiError::NotFound(err.to_string()),
            EngineError::Validation(msg) => ApiError::ValidationError(msg),
            EngineError::Schema(_) => ApiError::ValidationError(err.to_string()),
            EngineError::DivisionByZero => ApiError::DivisionByZero,
        }
    }
}

// ==========================================
// From ExcelError
// ==========================================
impl From<ExcelError> for ApiError {
    fn from(err: ExcelError) -> Self {
        match err {
            ExcelError::Engine(inner) => inner.into(),
            // Unreadable uploads are bad client input
            ExcelError::Read(_) | ExcelError::MissingHeaders | ExcelError::NoMaterials => {
                ApiError::ValidationError(err.to_string())
            }
            ExcelError::Write(_) => ApiError::ExcelError(err.to_string()),
        }
    }
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} con id={} no existe", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Conflict(msg),
            RepositoryError::ForeignKeyViolation(msg) => ApiError::ValidationError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("No se pudo tomar el lock: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::Serialization(msg) => ApiError::InternalError(msg),
        }
    }
}

// ConfigManager returns boxed errors
impl From<Box<dyn std::error::Error>> for ApiError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        ApiError::InternalError(format!("Error de configuración: {}", err))
    }
}

/// Result type alias
pub type ApiResult<T> = Result<T, ApiError>;
