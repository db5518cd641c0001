// ==========================================
// ConfigManager tests against a database file
// ==========================================

mod test_helpers;

use materiales_costing::config::{config_keys, get_default_db_path, ConfigManager};
use std::collections::HashMap;
use test_helpers::create_test_db;

#[test]
fn test_config_manager_on_file_database() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    assert_eq!(config.get_default_valor_dolar().unwrap(), 1.0);
    assert_eq!(config.get_excel_empty_row_run().unwrap(), 5);
    assert_eq!(config.get_config_snapshot().unwrap(), "{}");

    config
        .set_global_value(config_keys::VALOR_DOLAR_TOLERANCE, "0.5")
        .unwrap();
    config
        .set_global_value(config_keys::VALOR_DOLAR_TOLERANCE, " 0.25 ")
        .unwrap();
    assert_eq!(config.get_valor_dolar_tolerance().unwrap(), 0.25);

    // A second manager on the same file sees the stored value
    let other = ConfigManager::new(&db_path).unwrap();
    let snapshot: HashMap<String, String> =
        serde_json::from_str(&other.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[config_keys::VALOR_DOLAR_TOLERANCE], " 0.25 ");
}

#[test]
fn test_default_db_path_honors_env_override() {
    std::env::set_var("MATERIALES_DB_PATH", "  /tmp/materiales-test.db ");
    assert_eq!(get_default_db_path(), "/tmp/materiales-test.db");
    std::env::remove_var("MATERIALES_DB_PATH");

    assert!(get_default_db_path().ends_with("materiales.db"));
}
