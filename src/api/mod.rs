// ==========================================
// Materiales Costing - API layer
// ==========================================
// Request boundary consumed by the binary and by an
// outer HTTP layer. Maps lower-layer failures to ApiError.
// ==========================================

pub mod error;
pub mod excel_api;
pub mod material_api;
pub mod tipo_material_api;

pub use error::{ApiError, ApiResult};
pub use excel_api::{ExcelApi, ExcelImportReport, TotalesActualizados};
pub use material_api::MaterialApi;
pub use tipo_material_api::TipoMaterialApi;
