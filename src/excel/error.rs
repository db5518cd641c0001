// ==========================================
// Materiales Costing - Excel layer error types
// ==========================================
// Tool: thiserror derive
// ==========================================

use crate::engine::error::EngineError;
use thiserror::Error;

/// Excel export/import errors
#[derive(Error, Debug)]
pub enum ExcelError {
    // ===== Workbook I/O =====
    #[error("Error al generar el Excel: {0}")]
    Write(String),

    #[error("Error al leer el Excel: {0}")]
    Read(String),

    // ===== Content =====
    #[error("No se encontraron encabezados válidos en la fila 2 del Excel")]
    MissingHeaders,

    #[error("No se encontraron materiales válidos en el Excel")]
    NoMaterials,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// From<rust_xlsxwriter::XlsxError>
impl From<rust_xlsxwriter::XlsxError> for ExcelError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExcelError::Write(err.to_string())
    }
}

// From<calamine::XlsxError>
impl From<calamine::XlsxError> for ExcelError {
    fn from(err: calamine::XlsxError) -> Self {
        ExcelError::Read(err.to_string())
    }
}

/// Result type alias
pub type ExcelResult<T> = Result<T, ExcelError>;
