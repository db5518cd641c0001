// ==========================================
// Materiales Costing - Configuration layer
// ==========================================
// Storage: config_kv table
// ==========================================

pub mod config_manager;

pub use config_manager::{config_keys, ConfigManager};

use std::path::PathBuf;

/// Default database path
///
/// - `MATERIALES_DB_PATH` when set and non-empty
/// - else `<data_dir>/materiales-costing/materiales.db`
/// - else `./materiales.db`
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("MATERIALES_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./materiales.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("materiales-costing");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("materiales.db");
        }
    }

    path.to_string_lossy().to_string()
}
