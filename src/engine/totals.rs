// ==========================================
// Materiales Costing - Totals accumulator
// ==========================================
// Symmetric add/remove bookkeeping of the running aggregates
// of a TipoMaterial. A row edit is remove(old) + add(new);
// only a schema edit recomputes from scratch.
// ==========================================

use crate::domain::material::Material;
use crate::domain::tipo_material::TipoMaterial;
use crate::domain::types::BaseHeaderId;
use crate::engine::error::EngineResult;
use crate::engine::formula::apply_formulas;
use crate::engine::numeric::parse_number_lenient;
use crate::engine::schema::reset_totals;
use tracing::{debug, instrument};

/// Adds the contribution of `material` to the aggregates of `tipo`
pub fn add_material(tipo: &mut TipoMaterial, material: &Material) {
    apply_contribution(tipo, material, 1.0);
}

/// Subtracts the contribution of `material`; cost sums never go below zero
pub fn remove_material(tipo: &mut TipoMaterial, material: &Material) {
    apply_contribution(tipo, material, -1.0);
    tipo.total_costo_unitario = tipo.total_costo_unitario.max(0.0);
    tipo.total_costo_total = tipo.total_costo_total.max(0.0);
    tipo.refresh_total_usd();
}

fn apply_contribution(tipo: &mut TipoMaterial, material: &Material, factor: f64) {
    tipo.total_costo_unitario += factor * material.costo_unitario;
    tipo.total_costo_total += factor * material.costo_total;

    for id in [
        BaseHeaderId::Quantity,
        BaseHeaderId::UnitCost,
        BaseHeaderId::TotalCost,
    ] {
        if !tipo.is_base_active(id) {
            continue;
        }
        let value = match id {
            BaseHeaderId::Quantity => material
                .cantidad
                .as_deref()
                .map(parse_number_lenient)
                .unwrap_or(0.0),
            BaseHeaderId::UnitCost => material.costo_unitario,
            _ => material.costo_total,
        };
        tipo.total_cantidad.ensure_entry(id.key()).total += factor * value;
    }

    let tracked: Vec<(i64, f64)> = tipo
        .headers_atributes
        .iter()
        .filter(|h| h.is_quantity_tracked())
        .map(|h| {
            let value = material
                .attribute_value(h.id_header_atribute)
                .map(parse_number_lenient)
                .unwrap_or(0.0);
            (h.id_header_atribute, value)
        })
        .collect();
    for (id, value) in tracked {
        if let Some(header) = tipo.attribute_header_mut(id) {
            header.total_costo_header += factor * value;
            let key = header.key();
            tipo.total_cantidad.ensure_entry(key).total += factor * value;
        }
    }

    refresh_total_cantidades(tipo);
    tipo.refresh_total_usd();
}

/// total_cantidades sums quantity entries only (cost entries are tracked apart)
pub fn refresh_total_cantidades(tipo: &mut TipoMaterial) {
    tipo.total_cantidad.total_cantidades = tipo
        .total_cantidad
        .cantidades
        .iter()
        .filter(|e| e.is_quantity())
        .map(|e| e.total)
        .sum();
}

/// Full recompute after a schema edit: reset, then every row goes through
/// the evaluator and `add_material` again
#[instrument(skip(tipo, materials), fields(tipo_id = tipo.id_tipo_material, rows = materials.len()))]
pub fn recompute_totals(tipo: &mut TipoMaterial, materials: &mut [Material]) -> EngineResult<()> {
    reset_totals(tipo);
    for material in materials.iter_mut() {
        apply_formulas(tipo, material)?;
        add_material(tipo, material);
    }
    tipo.refresh_total_usd();
    debug!(
        total_costo_total = tipo.total_costo_total,
        "totales recalculados"
    );
    Ok(())
}
