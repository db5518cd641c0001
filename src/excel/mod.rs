// ==========================================
// Materiales Costing - Excel layer
// ==========================================
// Export: rust_xlsxwriter, live formulas compiled from Calculo
// Import: calamine, header matching by normalized title
// ==========================================

pub mod error;
pub mod exporter;
pub mod formula_text;
pub mod importer;
pub mod layout;

pub use error::{ExcelError, ExcelResult};
pub use exporter::{export_filename, sheet_name, ExcelExporter, DEFAULT_FORMULA_ROWS};
pub use formula_text::{cell_ref, column_letter, compile_calculo};
pub use importer::{ExcelImporter, ParsedWorkbook, SheetTotals, DEFAULT_EMPTY_ROW_RUN};
pub use layout::SheetLayout;
