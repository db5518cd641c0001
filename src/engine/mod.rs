// ==========================================
// Materiales Costing - Engine layer
// ==========================================
// Header schema model, formula evaluator, row normalizer
// and totals accumulator. Pure in-memory logic: no SQL,
// no spreadsheet I/O.
// ==========================================

pub mod error;
pub mod formula;
pub mod normalizer;
pub mod numeric;
pub mod schema;
pub mod totals;

pub use error::{EngineError, EngineResult};
pub use formula::{
    apply_formulas, apply_formulas_lenient, fold_values, Coercion, FormulaEvaluator, RowContext,
};
pub use normalizer::{normalize_material, sync_material_schema};
pub use numeric::{parse_number, parse_number_lenient, Blank};
pub use schema::{
    build_tipo_material, initialize_total_cantidad, normalize_title, ordered_headers,
    rebuild_schema, reset_totals,
};
pub use totals::{add_material, recompute_totals, remove_material};
