// ==========================================
// Materiales Costing - Core library
// ==========================================
// Stack: Rust + SQLite + xlsx
// Scope: material-type header schemas, formula evaluation,
// running totals and Excel round-trips.
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - entities and value types
pub mod domain;

// Engine layer - schema model, formulas, normalizer, totals
pub mod engine;

// Spreadsheet layer - export/import
pub mod excel;

// Data access layer
pub mod repository;

// Configuration layer
pub mod config;

// Database infrastructure (connection setup, schema)
pub mod db;

// Logging
pub mod logging;

// API layer - request boundary
pub mod api;

// Application layer - wiring
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::{
    BaseHeaderId, Calculo, HeaderAtributo, HeaderBase, HeaderKey, HeaderKind, Material,
    MaterialCreate, MaterialUpdate, Operacion, OperationKind, TipoMaterial, TipoMaterialCreate,
    TipoMaterialRead, TipoMaterialUpdate,
};

pub use engine::{EngineError, FormulaEvaluator};

pub use excel::{ExcelExporter, ExcelImporter};

pub use api::{ApiError, ExcelApi, ExcelImportReport, MaterialApi, TipoMaterialApi};

pub use app::AppState;

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Materiales Costing";
