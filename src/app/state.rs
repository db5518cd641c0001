// ==========================================
// Materiales Costing - Application state
// ==========================================
// Builds repositories, config and APIs over one shared
// SQLite connection.
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{ExcelApi, MaterialApi, TipoMaterialApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{MaterialRepository, TipoMaterialRepository};

pub use crate::config::get_default_db_path;

/// Shared application state
pub struct AppState {
    pub db_path: String,

    pub tipo_material_api: Arc<TipoMaterialApi>,
    pub material_api: Arc<MaterialApi>,
    pub excel_api: Arc<ExcelApi>,

    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// Opens `db_path`, creates the schema when missing and wires the APIs
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("inicializando AppState, base de datos: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("No se pudo abrir la base de datos: {}", e))?;
        init_schema(&conn).map_err(|e| format!("No se pudo crear el esquema: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// Wires the APIs over an already initialized connection
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let tipo_repo = Arc::new(TipoMaterialRepository::from_connection(conn.clone()));
        let material_repo = Arc::new(MaterialRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("No se pudo crear ConfigManager: {}", e))?,
        );

        let tipo_material_api = Arc::new(TipoMaterialApi::new(
            tipo_repo.clone(),
            material_repo.clone(),
            config_manager.clone(),
        ));
        let material_api = Arc::new(MaterialApi::new(tipo_repo.clone(), material_repo.clone()));
        let excel_api = Arc::new(ExcelApi::new(tipo_repo, material_repo, config_manager.clone()));

        tracing::info!("AppState inicializado");
        Ok(Self {
            db_path,
            tipo_material_api,
            material_api,
            excel_api,
            config_manager,
        })
    }
}
