// ==========================================
// MaterialApi integration tests
// ==========================================
// Scope:
// 1. create: normalize -> formulas -> running totals
// 2. update/delete keep aggregates symmetric
// 3. validation, division by zero and cycles
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::{MaterialBuilder, TipoMaterialBuilder};
use materiales_costing::api::ApiError;
use materiales_costing::domain::{HeaderKey, MaterialUpdate, OperationKind};

fn cables(env: &ApiTestEnv) -> i64 {
    env.tipo_material_api
        .create_tipo(
            TipoMaterialBuilder::new("Cables")
                .with_cantidad()
                .with_unidad()
                .atributo(1, "Voltaje")
                .valor_dolar(1000.0)
                .build(),
        )
        .expect("crear tipo")
        .id_tipo_material
}

// ==========================================
// Create
// ==========================================

#[test]
fn test_create_material_computes_total_and_aggregates() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = cables(&env);

    let material = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Cable 2x1.5")
                .cantidad("10")
                .unidad("m")
                .costo_unitario(5.0)
                .atributo(1, "220")
                .build(),
        )
        .unwrap();

    assert!(material.id_material > 0);
    assert!(approx_eq(material.costo_total, 50.0));

    let tipo = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    assert_eq!(tipo.materiales_count, 1);
    assert!(approx_eq(tipo.total_costo_unitario, 5.0));
    assert!(approx_eq(tipo.total_costo_total, 50.0));
    assert!(approx_eq(tipo.total_usd, 50_000.0));
    assert!(approx_eq(tipo.total_cantidad.total_for(HeaderKey::base(2)), 10.0));
    assert!(approx_eq(tipo.total_cantidad.total_cantidades, 10.0));

    let stored = env.material_api.get_material(material.id_material).unwrap();
    assert_eq!(stored, material);
}

#[test]
fn test_default_formula_with_fractional_cost() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = cables(&env);

    let material = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Cable 3x2.5")
                .cantidad("3")
                .unidad("m")
                .costo_unitario(12.5)
                .atributo(1, "380")
                .build(),
        )
        .unwrap();

    assert!(approx_eq(material.costo_total, 37.5));
}

#[test]
fn test_comma_decimal_quantity() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = cables(&env);

    let material = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Cable 1x4")
                .cantidad("2,5")
                .unidad("m")
                .costo_unitario(4.0)
                .atributo(1, "220")
                .build(),
        )
        .unwrap();

    assert_eq!(material.cantidad.as_deref(), Some("2,5"));
    assert!(approx_eq(material.costo_total, 10.0));

    let tipo = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    assert!(approx_eq(tipo.total_cantidad.total_for(HeaderKey::base(2)), 2.5));
}

#[test]
fn test_quantity_attribute_is_tracked() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = env
        .tipo_material_api
        .create_tipo(
            TipoMaterialBuilder::new("Hierros")
                .with_cantidad()
                .atributo_cantidad(1, "Peso")
                .atributo(2, "Marca")
                .build(),
        )
        .unwrap()
        .id_tipo_material;

    for (detalle, cantidad, peso) in [("Barra 8", "2", "12,5"), ("Barra 10", "1", "7.5")] {
        env.material_api
            .create_material(
                MaterialBuilder::new(tipo_id, detalle)
                    .cantidad(cantidad)
                    .costo_unitario(100.0)
                    .atributo(1, peso)
                    .atributo(2, "Acindar")
                    .build(),
            )
            .unwrap();
    }

    let tipo = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    let peso = tipo
        .headers_atributes
        .iter()
        .find(|h| h.id_header_atribute == 1)
        .unwrap();
    assert!(approx_eq(peso.total_costo_header, 20.0));
    assert!(approx_eq(tipo.total_cantidad.total_for(HeaderKey::atribute(1)), 20.0));
    assert!(approx_eq(tipo.total_cantidad.total_for(HeaderKey::base(2)), 3.0));
    assert!(approx_eq(tipo.total_cantidad.total_cantidades, 23.0));
    assert!(approx_eq(tipo.total_costo_total, 300.0));
}

// ==========================================
// Update / delete symmetry
// ==========================================

#[test]
fn test_update_and_delete_keep_aggregates_consistent() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = cables(&env);

    let a = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "A")
                .cantidad("10")
                .unidad("m")
                .costo_unitario(5.0)
                .atributo(1, "220")
                .build(),
        )
        .unwrap();
    let b = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "B")
                .cantidad("4")
                .unidad("m")
                .costo_unitario(2.5)
                .atributo(1, "380")
                .build(),
        )
        .unwrap();

    let before = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    assert!(approx_eq(before.total_costo_total, 60.0));

    let updated = env
        .material_api
        .update_material(
            a.id_material,
            MaterialUpdate {
                cantidad: Some("6".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(approx_eq(updated.costo_total, 30.0));
    assert_eq!(updated.detalle.as_deref(), Some("A"));

    let after_update = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    assert!(approx_eq(after_update.total_costo_total, 40.0));
    assert!(approx_eq(after_update.total_costo_unitario, 7.5));
    assert!(approx_eq(after_update.total_cantidad.total_for(HeaderKey::base(2)), 10.0));

    env.material_api.delete_material(b.id_material).unwrap();
    let after_delete = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    assert_eq!(after_delete.materiales_count, 1);
    assert!(approx_eq(after_delete.total_costo_total, 30.0));
    assert!(approx_eq(after_delete.total_cantidad.total_for(HeaderKey::base(2)), 6.0));

    env.material_api.delete_material(a.id_material).unwrap();
    let empty = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    assert!(approx_eq(empty.total_costo_total, 0.0));
    assert!(approx_eq(empty.total_costo_unitario, 0.0));
    assert!(approx_eq(empty.total_cantidad.total_cantidades, 0.0));
    assert!(approx_eq(empty.total_usd, 0.0));
}

#[test]
fn test_delete_unknown_material_is_not_found() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let err = env.material_api.delete_material(404).unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// ==========================================
// Validation
// ==========================================

#[test]
fn test_missing_required_field_is_rejected() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = cables(&env);

    let err = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Sin unidad")
                .cantidad("1")
                .costo_unitario(1.0)
                .atributo(1, "220")
                .build(),
        )
        .unwrap_err();

    assert!(matches!(&err, ApiError::ValidationError(msg) if msg.contains("Unidad")));
    assert_eq!(err.status_code(), 400);
    assert_eq!(env.count_material_rows(), 0);
}

#[test]
fn test_non_numeric_quantity_is_rejected() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = cables(&env);

    let err = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Cable")
                .cantidad("diez")
                .unidad("m")
                .costo_unitario(1.0)
                .atributo(1, "220")
                .build(),
        )
        .unwrap_err();

    assert!(matches!(err, ApiError::ValidationError(_)));
}

#[test]
fn test_unknown_tipo_is_not_found() {
    let env = ApiTestEnv::new().expect("entorno de prueba");

    let err = env
        .material_api
        .create_material(MaterialBuilder::new(99, "Huérfano").build())
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = env.material_api.list_materials_by_tipo(99).unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// ==========================================
// Formulas
// ==========================================

#[test]
fn test_division_by_zero_rolls_nothing_in() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = env
        .tipo_material_api
        .create_tipo(
            TipoMaterialBuilder::new("Rendimientos")
                .atributo(1, "Divisor")
                .atributo_formula(2, "Ratio", OperationKind::Division, vec![4], vec![1])
                .build(),
        )
        .unwrap()
        .id_tipo_material;

    let err = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Pintura")
                .costo_unitario(10.0)
                .atributo(1, "0")
                .atributo(2, "")
                .build(),
        )
        .unwrap_err();

    assert!(matches!(err, ApiError::DivisionByZero));
    assert_eq!(err.status_code(), 400);
    assert_eq!(env.count_material_rows(), 0);

    let tipo = env.tipo_material_api.get_tipo(tipo_id).unwrap();
    assert!(approx_eq(tipo.total_costo_total, 0.0));

    let ok = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Pintura")
                .costo_unitario(10.0)
                .atributo(1, "4")
                .atributo(2, "")
                .build(),
        )
        .unwrap();
    assert_eq!(ok.attribute_value(2), Some("2.5"));
}

#[test]
fn test_mutually_referencing_formulas_resolve() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = env
        .tipo_material_api
        .create_tipo(
            TipoMaterialBuilder::new("Ciclos")
                .atributo_formula(1, "Ida", OperationKind::Suma, vec![], vec![2])
                .atributo_formula(2, "Vuelta", OperationKind::Suma, vec![], vec![1])
                .build(),
        )
        .unwrap()
        .id_tipo_material;

    let material = env
        .material_api
        .create_material(
            MaterialBuilder::new(tipo_id, "Item")
                .costo_unitario(3.0)
                .atributo(1, "")
                .atributo(2, "")
                .build(),
        )
        .unwrap();

    assert_eq!(material.attribute_value(1), Some("0"));
    assert_eq!(material.attribute_value(2), Some("0"));
    assert!(approx_eq(material.costo_total, 3.0));
}

#[test]
fn test_list_materials_by_tipo_keeps_insertion_order() {
    let env = ApiTestEnv::new().expect("entorno de prueba");
    let tipo_id = cables(&env);

    for detalle in ["Primero", "Segundo", "Tercero"] {
        env.material_api
            .create_material(
                MaterialBuilder::new(tipo_id, detalle)
                    .cantidad("1")
                    .unidad("u")
                    .costo_unitario(1.0)
                    .atributo(1, "220")
                    .build(),
            )
            .unwrap();
    }

    let detalles: Vec<String> = env
        .material_api
        .list_materials_by_tipo(tipo_id)
        .unwrap()
        .into_iter()
        .filter_map(|m| m.detalle)
        .collect();
    assert_eq!(detalles, vec!["Primero", "Segundo", "Tercero"]);
    assert_eq!(env.material_api.list_materials().unwrap().len(), 3);
}
