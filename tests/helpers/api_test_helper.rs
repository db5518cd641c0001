// ==========================================
// API integration test environment
// ==========================================
// One temporary database, every API wired over the same
// shared connection (as AppState does).
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

use materiales_costing::api::{ExcelApi, MaterialApi, TipoMaterialApi};
use materiales_costing::app::AppState;
use materiales_costing::config::{config_keys, ConfigManager};
use materiales_costing::db::open_sqlite_connection;
use materiales_costing::repository::{MaterialRepository, TipoMaterialRepository};

pub use test_helpers::approx_eq;

/// Rows of pre-populated formulas in exported test workbooks
pub const TEST_FORMULA_ROWS: &str = "40";

pub struct ApiTestEnv {
    _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,

    pub tipo_material_api: Arc<TipoMaterialApi>,
    pub material_api: Arc<MaterialApi>,
    pub excel_api: Arc<ExcelApi>,
    pub config_manager: Arc<ConfigManager>,

    pub tipo_repo: TipoMaterialRepository,
    pub material_repo: MaterialRepository,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        materiales_costing::logging::init_test();
        let (temp_file, db_path) = test_helpers::create_test_db()?;
        let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path)?));

        let state = AppState::from_connection(db_path.clone(), conn.clone())?;
        state
            .config_manager
            .set_global_value(config_keys::EXCEL_FORMULA_ROWS, TEST_FORMULA_ROWS)?;

        Ok(Self {
            _temp_file: temp_file,
            db_path,
            tipo_material_api: state.tipo_material_api,
            material_api: state.material_api,
            excel_api: state.excel_api,
            config_manager: state.config_manager,
            tipo_repo: TipoMaterialRepository::from_connection(conn.clone()),
            material_repo: MaterialRepository::from_connection(conn.clone()),
            conn,
        })
    }

    /// Raw row count of the material table
    pub fn count_material_rows(&self) -> i64 {
        let conn = self.conn.lock().expect("lock");
        conn.query_row("SELECT COUNT(*) FROM material", [], |row| row.get(0))
            .expect("count")
    }
}
