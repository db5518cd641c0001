// ==========================================
// Materiales Costing - Material row normalizer
// ==========================================
// Validates a create/update payload against the active header
// schema and materializes the Material entity (not persisted).
// Required fields follow the active base headers.
// ==========================================

use crate::domain::material::{Material, MaterialAtributo, MaterialFields};
use crate::domain::tipo_material::TipoMaterial;
use crate::domain::types::BaseHeaderId;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::numeric::{parse_number, Blank};
use chrono::Utc;
use tracing::instrument;

/// Builds the normalized row.
///
/// `existing` is `None` on create; on update absent fields keep the stored
/// values.
#[instrument(skip_all, fields(tipo_id = tipo.id_tipo_material, update = existing.is_some()))]
pub fn normalize_material(
    tipo: &TipoMaterial,
    fields: MaterialFields<'_>,
    existing: Option<&Material>,
) -> EngineResult<Material> {
    let creating = existing.is_none();
    let mut material = match existing {
        Some(m) => m.clone(),
        None => Material::new(tipo.id_tipo_material),
    };

    // Detail is always active
    match non_blank(fields.detalle) {
        Some(detalle) => material.detalle = Some(detalle),
        None if creating || fields.detalle.is_some() => {
            return Err(required(tipo, BaseHeaderId::Detail));
        }
        None => {}
    }

    if tipo.is_base_active(BaseHeaderId::Quantity) {
        match non_blank(fields.cantidad) {
            Some(cantidad) => {
                let titulo = header_title(tipo, BaseHeaderId::Quantity);
                parse_number(Some(&cantidad), &titulo, Blank::Required)?;
                material.cantidad = Some(cantidad);
            }
            None if creating || fields.cantidad.is_some() => {
                return Err(required(tipo, BaseHeaderId::Quantity));
            }
            None => {}
        }
    } else {
        material.cantidad = None;
    }

    if tipo.is_base_active(BaseHeaderId::Unit) {
        match non_blank(fields.unidad) {
            Some(unidad) => material.unidad = Some(unidad),
            None if creating || fields.unidad.is_some() => {
                return Err(required(tipo, BaseHeaderId::Unit));
            }
            None => {}
        }
    } else {
        material.unidad = None;
    }

    if let Some(costo) = fields.costo_unitario {
        if !costo.is_finite() {
            return Err(EngineError::validation(format!(
                "El campo {} debe ser numérico",
                header_title(tipo, BaseHeaderId::UnitCost)
            )));
        }
        material.costo_unitario = costo;
    }

    material.atributos = normalize_atributos(tipo, fields.atributos, &material.atributos, creating)?;
    material.updated_at = Utc::now();
    Ok(material)
}

/// One value per attribute header of the type, in schema order
fn normalize_atributos(
    tipo: &TipoMaterial,
    input: Option<&[MaterialAtributo]>,
    current: &[MaterialAtributo],
    creating: bool,
) -> EngineResult<Vec<MaterialAtributo>> {
    if tipo.headers_atributes.is_empty() {
        return Ok(Vec::new());
    }

    let source = match input {
        Some(values) => values,
        None if creating => {
            let missing = &tipo.headers_atributes[0];
            return Err(EngineError::validation(format!(
                "Falta el atributo '{}'",
                missing.titulo
            )));
        }
        None => current,
    };

    tipo.headers_atributes
        .iter()
        .map(|header| {
            source
                .iter()
                .find(|a| a.id_header_atribute == header.id_header_atribute)
                .map(|a| MaterialAtributo::new(header.id_header_atribute, a.value.clone()))
                .ok_or_else(|| {
                    EngineError::validation(format!("Falta el atributo '{}'", header.titulo))
                })
        })
        .collect()
}

/// Aligns a stored row with an edited schema: values of removed attribute
/// headers are dropped, new headers get an empty value, inactive optional
/// base fields are cleared.
pub fn sync_material_schema(tipo: &TipoMaterial, material: &mut Material) {
    material.atributos = tipo
        .headers_atributes
        .iter()
        .map(|header| {
            let value = material
                .attribute_value(header.id_header_atribute)
                .unwrap_or_default()
                .to_string();
            MaterialAtributo::new(header.id_header_atribute, value)
        })
        .collect();

    if !tipo.is_base_active(BaseHeaderId::Quantity) {
        material.cantidad = None;
    }
    if !tipo.is_base_active(BaseHeaderId::Unit) {
        material.unidad = None;
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn header_title(tipo: &TipoMaterial, id: BaseHeaderId) -> String {
    tipo.base_header(id)
        .map(|h| h.titulo.clone())
        .unwrap_or_else(|| id.default_title().to_string())
}

fn required(tipo: &TipoMaterial, id: BaseHeaderId) -> EngineError {
    EngineError::validation(format!(
        "El campo {} es obligatorio",
        header_title(tipo, id)
    ))
}
