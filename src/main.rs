// ==========================================
// Materiales Costing - command line entry
// ==========================================
// Usage:
//   materiales-costing init
//   materiales-costing export <id_tipo_material> <archivo.xlsx>
//   materiales-costing import <id_tipo_material> <archivo.xlsx>
//   materiales-costing recompute <id_tipo_material>
//   materiales-costing config [<clave> <valor>]
//
// Database: MATERIALES_DB_PATH or the platform data dir.
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use materiales_costing::app::{get_default_db_path, AppState};
use materiales_costing::logging;
use std::path::PathBuf;

const USAGE: &str = "uso: materiales-costing <init | export <id> <archivo> | import <id> <archivo> | recompute <id> | config [<clave> <valor>]>";

fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", materiales_costing::APP_NAME, materiales_costing::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or_default();

    let db_path = get_default_db_path();
    tracing::info!("usando base de datos: {}", db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match command {
        "init" => {
            println!("base de datos lista en {}", state.db_path);
        }
        "export" => {
            let id = parse_id(args.get(1))?;
            let path = parse_path(args.get(2))?;
            let (filename, bytes) = state.excel_api.export_excel(id)?;
            std::fs::write(&path, &bytes)
                .with_context(|| format!("no se pudo escribir {}", path.display()))?;
            println!("{} ({} bytes) -> {}", filename, bytes.len(), path.display());
        }
        "import" => {
            let id = parse_id(args.get(1))?;
            let path = parse_path(args.get(2))?;
            let bytes = std::fs::read(&path)
                .with_context(|| format!("no se pudo leer {}", path.display()))?;
            let report = state.excel_api.import_excel(id, &bytes)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "recompute" => {
            let id = parse_id(args.get(1))?;
            let tipo = state.tipo_material_api.recompute_tipo(id)?;
            println!("{}", serde_json::to_string_pretty(&tipo)?);
        }
        "config" => {
            if let (Some(key), Some(value)) = (args.get(1), args.get(2)) {
                state
                    .config_manager
                    .set_global_value(key, value)
                    .map_err(|e| anyhow!("no se pudo guardar {}: {}", key, e))?;
            } else if args.len() > 1 {
                bail!(USAGE);
            }
            let snapshot = state
                .config_manager
                .get_config_snapshot()
                .map_err(|e| anyhow!("no se pudo leer la configuración: {}", e))?;
            println!("{}", snapshot);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn parse_id(raw: Option<&String>) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow!(USAGE))?;
    raw.trim()
        .parse::<i64>()
        .with_context(|| format!("id de tipo de material inválido: {}", raw))
}

fn parse_path(raw: Option<&String>) -> Result<PathBuf> {
    raw.map(PathBuf::from).ok_or_else(|| anyhow!(USAGE))
}
