// ==========================================
// Materiales Costing - Application layer
// ==========================================
// Wires persistence, config and APIs for the binary
// and for embedding callers.
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
