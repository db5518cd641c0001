// ==========================================
// Repository integration tests
// ==========================================
// Real SQLite file, no API layer on top: JSON columns,
// constraints, cascades and transaction rollback.
// ==========================================

mod test_helpers;

use materiales_costing::db::open_sqlite_connection;
use materiales_costing::domain::{
    HeaderAtributoInput, HeaderKey, Material, MaterialAtributo, TipoMaterial, TipoMaterialCreate,
};
use materiales_costing::engine::{add_material, apply_formulas, build_tipo_material};
use materiales_costing::repository::{MaterialRepository, RepositoryError, TipoMaterialRepository};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use test_helpers::{approx_eq, create_test_db};

struct Repos {
    _temp_file: NamedTempFile,
    tipos: TipoMaterialRepository,
    materiales: MaterialRepository,
}

fn setup() -> Repos {
    let (temp_file, db_path) = create_test_db().expect("db temporal");
    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path).expect("conexión")));
    Repos {
        _temp_file: temp_file,
        tipos: TipoMaterialRepository::from_connection(conn.clone()),
        materiales: MaterialRepository::from_connection(conn),
    }
}

fn nuevo_tipo(titulo: &str, valor_dolar: f64) -> TipoMaterial {
    let mut peso = HeaderAtributoInput::new("Peso");
    peso.is_cantidad = true;
    build_tipo_material(
        &TipoMaterialCreate {
            titulo: titulo.to_string(),
            headers_base_active: Some(vec![2, 3]),
            headers_atributes: Some(vec![peso]),
            valor_dolar: Some(valor_dolar),
            ..Default::default()
        },
        1.0,
    )
    .expect("schema válido")
}

fn nuevo_material(tipo: &TipoMaterial, detalle: &str, cantidad: &str, costo: f64) -> Material {
    let mut material = Material::new(tipo.id_tipo_material);
    material.detalle = Some(detalle.to_string());
    material.unidad = Some("kg".to_string());
    material.cantidad = Some(cantidad.to_string());
    material.costo_unitario = costo;
    material.atributos = vec![MaterialAtributo::new(1, "1,5")];
    apply_formulas(tipo, &mut material).expect("fórmulas");
    material
}

/// Inserts a type with `rows` materials, aggregates included
fn seed(repos: &Repos, titulo: &str, valor_dolar: f64, rows: &[(&str, &str, f64)]) -> TipoMaterial {
    let mut tipo = nuevo_tipo(titulo, valor_dolar);
    tipo.id_tipo_material = repos.tipos.insert(&tipo).unwrap();
    for (detalle, cantidad, costo) in rows {
        let mut material = nuevo_material(&tipo, detalle, cantidad, *costo);
        add_material(&mut tipo, &material);
        material.id_material = repos.materiales.insert_with_tipo(&material, &tipo).unwrap();
    }
    tipo
}

// ==========================================
// JSON columns
// ==========================================

#[test]
fn test_tipo_json_columns_round_trip() {
    let repos = setup();
    let tipo = seed(&repos, "Hierros", 1000.0, &[("Barra 8", "2", 10.0)]);

    let stored = repos.tipos.find_by_id(tipo.id_tipo_material).unwrap().unwrap();
    assert_eq!(stored.headers_base, tipo.headers_base);
    assert_eq!(stored.headers_atributes, tipo.headers_atributes);
    assert_eq!(stored.order_headers, tipo.order_headers);
    assert_eq!(stored.total_cantidad, tipo.total_cantidad);
    assert!(approx_eq(stored.total_cantidad.total_for(HeaderKey::atribute(1)), 1.5));
    assert!(approx_eq(stored.total_usd, 20_000.0));

    let materials = repos.materiales.list_by_tipo(tipo.id_tipo_material).unwrap();
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0].atributos, vec![MaterialAtributo::new(1, "1,5")]);
    assert!(approx_eq(materials[0].costo_total, 20.0));
}

#[test]
fn test_find_by_titulo_trims_input() {
    let repos = setup();
    let tipo = seed(&repos, "Hierros", 1.0, &[]);

    let found = repos.tipos.find_by_titulo("  Hierros ").unwrap().unwrap();
    assert_eq!(found.id_tipo_material, tipo.id_tipo_material);
    assert!(repos.tipos.find_by_titulo("Maderas").unwrap().is_none());
}

// ==========================================
// Constraints
// ==========================================

#[test]
fn test_duplicate_titulo_violates_unique() {
    let repos = setup();
    seed(&repos, "Hierros", 1.0, &[]);

    let err = repos.tipos.insert(&nuevo_tipo("Hierros", 1.0)).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
}

#[test]
fn test_delete_tipo_cascades() {
    let repos = setup();
    let tipo = seed(&repos, "Hierros", 1.0, &[("A", "1", 1.0), ("B", "2", 2.0)]);
    let otro = seed(&repos, "Maderas", 1.0, &[("Tabla", "3", 4.0)]);

    assert!(repos.tipos.delete(tipo.id_tipo_material).unwrap());
    assert!(!repos.tipos.delete(tipo.id_tipo_material).unwrap());

    assert!(repos.materiales.list_by_tipo(tipo.id_tipo_material).unwrap().is_empty());
    assert_eq!(repos.materiales.list_all().unwrap().len(), 1);
    assert_eq!(repos.tipos.count_materials(otro.id_tipo_material).unwrap(), 1);
}

#[test]
fn test_delete_unknown_material_is_not_found() {
    let repos = setup();
    let tipo = seed(&repos, "Hierros", 1.0, &[]);

    let err = repos.materiales.delete_with_tipo(999, &tipo).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

// ==========================================
// Transactions
// ==========================================

#[test]
fn test_replace_all_rolls_back_on_failure() {
    let repos = setup();
    let tipo = seed(&repos, "Hierros", 1000.0, &[("A", "1", 5.0), ("B", "2", 5.0)]);
    let otro = seed(&repos, "Maderas", 800.0, &[("Tabla", "1", 10.0)]);

    // Second row points at a missing type: the FK fails mid-transaction
    let valida = nuevo_material(&tipo, "Nueva", "4", 1.0);
    let mut huerfana = nuevo_material(&tipo, "Huérfana", "1", 1.0);
    huerfana.id_tipo_material = 999;

    let err = repos
        .materiales
        .replace_all_for_tipo(&tipo, &[valida, huerfana], Some(2000.0))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));

    let detalles: Vec<String> = repos
        .materiales
        .list_by_tipo(tipo.id_tipo_material)
        .unwrap()
        .into_iter()
        .filter_map(|m| m.detalle)
        .collect();
    assert_eq!(detalles, vec!["A", "B"]);

    let stored = repos.tipos.find_by_id(tipo.id_tipo_material).unwrap().unwrap();
    assert!(approx_eq(stored.valor_dolar, 1000.0));
    let otro = repos.tipos.find_by_id(otro.id_tipo_material).unwrap().unwrap();
    assert!(approx_eq(otro.valor_dolar, 800.0));
}

#[test]
fn test_replace_all_with_repricing() {
    let repos = setup();
    let mut tipo = seed(&repos, "Hierros", 1000.0, &[("A", "1", 5.0)]);
    let otro = seed(&repos, "Maderas", 800.0, &[("Tabla", "1", 10.0)]);

    let nuevos = vec![
        nuevo_material(&tipo, "X", "2", 3.0),
        nuevo_material(&tipo, "Y", "1", 4.0),
    ];
    tipo.valor_dolar = 1200.0;
    tipo.total_costo_total = 10.0;
    tipo.total_usd = 12_000.0;

    let ids = repos
        .materiales
        .replace_all_for_tipo(&tipo, &nuevos, Some(1200.0))
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);

    let stored = repos.tipos.find_by_id(tipo.id_tipo_material).unwrap().unwrap();
    assert!(approx_eq(stored.valor_dolar, 1200.0));
    assert!(approx_eq(stored.total_usd, 12_000.0));

    let otro = repos.tipos.find_by_id(otro.id_tipo_material).unwrap().unwrap();
    assert!(approx_eq(otro.valor_dolar, 1200.0));
    assert!(approx_eq(otro.total_usd, 12_000.0));

    assert_eq!(repos.materiales.list_by_tipo(tipo.id_tipo_material).unwrap().len(), 2);
}
