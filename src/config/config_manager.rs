// ==========================================
// Materiales Costing - Config manager
// ==========================================
// Typed reads of the config_kv table (scope_id='global')
// with compiled-in defaults.
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Opens its own connection to `db_path`
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Shares an existing connection; the PRAGMAs are re-applied (idempotent)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("No se pudo tomar el lock: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("No se pudo tomar el lock: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Upserts a global value
    pub fn set_global_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("No se pudo tomar el lock: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// Every global key as a JSON object string
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("No se pudo tomar el lock: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== Materiales =====

    /// Dollar value for types created without one
    pub fn get_default_valor_dolar(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_VALOR_DOLAR, "1.0")?;
        Ok(value.trim().parse::<f64>().unwrap_or(1.0))
    }

    /// Minimum difference that triggers global repricing on import
    pub fn get_valor_dolar_tolerance(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::VALOR_DOLAR_TOLERANCE, "0.01")?;
        Ok(value.trim().parse::<f64>().unwrap_or(0.01))
    }

    /// Last sheet row (1-based) with pre-populated formulas on export
    pub fn get_excel_formula_rows(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::EXCEL_FORMULA_ROWS, "1000")?;
        Ok(value.trim().parse::<u32>().unwrap_or(1000))
    }

    /// Consecutive empty rows that end the import scan
    pub fn get_excel_empty_row_run(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::EXCEL_EMPTY_ROW_RUN, "5")?;
        Ok(value.trim().parse::<u32>().unwrap_or(5))
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    pub const DEFAULT_VALOR_DOLAR: &str = "materiales/default_valor_dolar";
    pub const VALOR_DOLAR_TOLERANCE: &str = "materiales/valor_dolar_tolerance";

    // Excel
    pub const EXCEL_FORMULA_ROWS: &str = "materiales/excel_formula_rows";
    pub const EXCEL_EMPTY_ROW_RUN: &str = "materiales/excel_empty_row_run";
}
