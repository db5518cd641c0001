// ==========================================
// Materiales Costing - Header schema engine
// ==========================================
// Builds and maintains headers_base / headers_atributes /
// order_headers of a TipoMaterial so that the evaluator,
// the accumulator and the Excel layer see one consistent schema.
// ==========================================

use crate::domain::header::{
    Calculo, HeaderAtributo, HeaderAtributoInput, HeaderBase, HeaderBaseCalc, HeaderSpec,
    OrderHeaderEntry,
};
use crate::domain::tipo_material::{
    TipoMaterial, TipoMaterialCreate, TipoMaterialUpdate, TotalCantidad, TotalCantidadItem,
};
use crate::domain::types::{BaseHeaderId, HeaderKey, HeaderKind};
use crate::engine::error::{EngineError, EngineResult};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

// ==========================================
// Base headers
// ==========================================

/// Builds the five fixed base headers.
///
/// Detail, UnitCost and TotalCost are forced active; Quantity and Unit are
/// active only when listed in `active_ids`. TotalCost gets the default
/// Quantity x UnitCost formula restricted to active columns.
pub fn build_headers_base(active_ids: Option<&[i64]>) -> Vec<HeaderBase> {
    let requested: HashSet<i64> = active_ids.unwrap_or(&[]).iter().copied().collect();
    let active: Vec<BaseHeaderId> = BaseHeaderId::ALL
        .into_iter()
        .filter(|id| id.is_required() || requested.contains(&id.id()))
        .collect();

    BaseHeaderId::ALL
        .into_iter()
        .map(|id| {
            let calculo = if id == BaseHeaderId::TotalCost {
                Calculo::default_total_cost(&active)
            } else {
                Calculo::inactive()
            };
            HeaderBase {
                id_header_base: id.id(),
                titulo: id.default_title().to_string(),
                active: active.contains(&id),
                calculo,
                order: Some(id.default_order()),
            }
        })
        .collect()
}

/// Applies per-header overrides of titulo/calculo/order, then sorts by order
pub fn apply_base_calculations(
    mut headers: Vec<HeaderBase>,
    overrides: Option<&[HeaderBaseCalc]>,
) -> Vec<HeaderBase> {
    for entry in overrides.unwrap_or(&[]) {
        let Some(header) = headers
            .iter_mut()
            .find(|h| h.id_header_base == entry.id_header_base)
        else {
            continue;
        };
        if let Some(titulo) = entry.titulo.as_deref().map(str::trim) {
            if !titulo.is_empty() {
                header.titulo = titulo.to_string();
            }
        }
        if let Some(calculo) = &entry.calculo {
            header.calculo = calculo.clone();
        }
        if let Some(order) = entry.order {
            header.order = Some(order);
        }
    }

    headers.sort_by_key(HeaderBase::effective_order);
    headers
}

// ==========================================
// Attribute headers
// ==========================================

/// Normalizes client attribute headers.
///
/// Missing ids are allocated after the highest known id, missing orders
/// follow input position after the base columns (before TotalCost), missing
/// formulas default to inactive (or keep the
/// formula of the existing header with the same id).
pub fn normalize_headers_atributes(
    input: &[HeaderAtributoInput],
    existing: &[HeaderAtributo],
) -> EngineResult<Vec<HeaderAtributo>> {
    let mut next_id = existing
        .iter()
        .map(|h| h.id_header_atribute)
        .chain(input.iter().filter_map(|h| h.id_header_atribute))
        .max()
        .unwrap_or(0)
        + 1;

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(input.len());

    for (idx, header) in input.iter().enumerate() {
        let titulo = header.titulo.trim();
        if titulo.is_empty() {
            return Err(EngineError::validation(
                "El título del atributo no puede estar vacío",
            ));
        }

        let id = match header.id_header_atribute {
            Some(id) => id,
            None => {
                let id = next_id;
                next_id += 1;
                id
            }
        };
        if !seen.insert(id) {
            return Err(EngineError::validation(format!(
                "El id de atributo {} está duplicado",
                id
            )));
        }

        let previous = existing.iter().find(|h| h.id_header_atribute == id);
        let calculo = header
            .calculo
            .clone()
            .or_else(|| previous.map(|p| p.calculo.clone()))
            .unwrap_or_default();
        let order = header
            .order
            .or_else(|| previous.and_then(|p| p.order))
            .unwrap_or(BaseHeaderId::UnitCost.default_order() + idx as i64 + 1);

        normalized.push(HeaderAtributo {
            id_header_atribute: id,
            titulo: titulo.to_string(),
            is_cantidad: header.is_cantidad,
            calculo,
            total_costo_header: 0.0,
            order: Some(order),
        });
    }

    Ok(normalized)
}

// ==========================================
// Display order
// ==========================================

/// Merges explicit order entries with header defaults into the canonical
/// combined ordering (1..n over active base headers + attribute headers).
///
/// Explicit entries are written back into the headers' own `order` so the
/// next rebuild starts from the same positions.
pub fn apply_order_headers(
    base: &mut [HeaderBase],
    attrs: &mut [HeaderAtributo],
    payload: Option<&[OrderHeaderEntry]>,
) -> Vec<OrderHeaderEntry> {
    let explicit: HashMap<HeaderKey, i64> = payload
        .unwrap_or(&[])
        .iter()
        .map(|e| (e.key(), e.order))
        .collect();

    // (sort key, default sequence, header key)
    let mut slots: Vec<(i64, usize, HeaderKey)> = Vec::new();
    let mut seq = 0usize;

    for header in base.iter_mut().filter(|h| h.active) {
        if let Some(order) = explicit.get(&header.key()) {
            header.order = Some(*order);
        }
        slots.push((header.effective_order(), seq, header.key()));
        seq += 1;
    }
    for header in attrs.iter_mut() {
        if let Some(order) = explicit.get(&header.key()) {
            header.order = Some(*order);
        }
        slots.push((header.effective_order(), seq, header.key()));
        seq += 1;
    }

    slots.sort();
    slots
        .into_iter()
        .enumerate()
        .map(|(idx, (_, _, key))| OrderHeaderEntry::new(key, idx as i64 + 1))
        .collect()
}

/// Displayable headers of a type in canonical column order
pub fn ordered_headers(tipo: &TipoMaterial) -> Vec<HeaderSpec> {
    let mut specs: Vec<HeaderSpec> = Vec::new();
    let mut seen: HashSet<HeaderKey> = HashSet::new();

    let mut entries: Vec<&OrderHeaderEntry> = tipo.order_headers.iter().collect();
    entries.sort_by_key(|e| e.order);

    let mut push = |spec: HeaderSpec, specs: &mut Vec<HeaderSpec>| {
        if seen.insert(spec.key()) {
            specs.push(spec);
        }
    };

    for entry in entries {
        match entry.kind {
            HeaderKind::Base => {
                if let Some(header) = tipo
                    .headers_base
                    .iter()
                    .find(|h| h.id_header_base == entry.id && h.active)
                {
                    push(HeaderSpec::from_base(header), &mut specs);
                }
            }
            HeaderKind::Atribute => {
                if let Some(header) = tipo.attribute_header(entry.id) {
                    push(HeaderSpec::from_atribute(header), &mut specs);
                }
            }
        }
    }

    let mut remaining: Vec<HeaderSpec> = tipo
        .headers_base
        .iter()
        .filter(|h| h.active)
        .map(HeaderSpec::from_base)
        .chain(tipo.headers_atributes.iter().map(HeaderSpec::from_atribute))
        .collect();
    remaining.sort_by_key(|s| s.order);
    for spec in remaining {
        push(spec, &mut specs);
    }

    for (idx, spec) in specs.iter_mut().enumerate() {
        spec.order = idx as i64 + 1;
    }
    specs
}

// ==========================================
// Aggregates
// ==========================================

/// One zeroed entry per tracked column: active numeric base headers and
/// quantity-flagged attributes
pub fn initialize_total_cantidad(base: &[HeaderBase], attrs: &[HeaderAtributo]) -> TotalCantidad {
    let mut cantidades = Vec::new();
    for id in BaseHeaderId::ALL.into_iter().filter(|id| id.is_numeric()) {
        let active = base
            .iter()
            .any(|h| h.id_header_base == id.id() && (h.active || id.is_required()));
        if active {
            cantidades.push(TotalCantidadItem::new(id.key()));
        }
    }
    for header in attrs.iter().filter(|h| h.is_quantity_tracked()) {
        cantidades.push(TotalCantidadItem::new(header.key()));
    }
    TotalCantidad {
        total_cantidades: 0.0,
        cantidades,
    }
}

/// Zeroes every running aggregate and re-seeds the per-column entries
pub fn reset_totals(tipo: &mut TipoMaterial) {
    tipo.total_costo_unitario = 0.0;
    tipo.total_costo_total = 0.0;
    tipo.total_usd = 0.0;
    for header in tipo.headers_atributes.iter_mut() {
        header.total_costo_header = 0.0;
    }
    tipo.total_cantidad = initialize_total_cantidad(&tipo.headers_base, &tipo.headers_atributes);
}

// ==========================================
// Validation
// ==========================================

/// Every formula reference must name an existing header
pub fn validate_calculos(base: &[HeaderBase], attrs: &[HeaderAtributo]) -> EngineResult<()> {
    let base_ids: HashSet<i64> = base.iter().map(|h| h.id_header_base).collect();
    let attr_ids: HashSet<i64> = attrs.iter().map(|h| h.id_header_atribute).collect();

    let calculos = base
        .iter()
        .map(|h| &h.calculo)
        .chain(attrs.iter().map(|h| &h.calculo));
    for calculo in calculos {
        for op in &calculo.operaciones {
            for key in op.references() {
                let known = match key.kind {
                    HeaderKind::Base => base_ids.contains(&key.id),
                    HeaderKind::Atribute => attr_ids.contains(&key.id),
                };
                if !known {
                    return Err(EngineError::HeaderNotFound {
                        kind: key.kind,
                        id: key.id,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Active header titles must be unique after trim + lowercase (the importer
/// matches columns by title)
pub fn validate_titles(base: &[HeaderBase], attrs: &[HeaderAtributo]) -> EngineResult<()> {
    let mut seen = HashSet::new();
    let titles = base
        .iter()
        .filter(|h| h.active)
        .map(|h| h.titulo.as_str())
        .chain(attrs.iter().map(|h| h.titulo.as_str()));
    for titulo in titles {
        let normalized = normalize_title(titulo);
        if normalized.is_empty() {
            return Err(EngineError::Schema("hay un header sin título".to_string()));
        }
        if !seen.insert(normalized) {
            return Err(EngineError::Schema(format!(
                "el título '{}' está repetido",
                titulo.trim()
            )));
        }
    }
    Ok(())
}

pub fn normalize_title(titulo: &str) -> String {
    titulo.trim().to_lowercase()
}

/// Drops formula references to inactive base headers and unknown attributes
pub fn prune_calculo_references(base: &mut [HeaderBase], attrs: &mut [HeaderAtributo]) {
    let active_base: HashSet<i64> = base
        .iter()
        .filter(|h| h.active)
        .map(|h| h.id_header_base)
        .collect();
    let attr_ids: HashSet<i64> = attrs.iter().map(|h| h.id_header_atribute).collect();

    let prune = |calculo: &mut Calculo| {
        for op in calculo.operaciones.iter_mut() {
            op.headers_base.retain(|id| active_base.contains(id));
            op.headers_atributes.retain(|id| attr_ids.contains(id));
        }
    };
    for header in base.iter_mut() {
        prune(&mut header.calculo);
    }
    for header in attrs.iter_mut() {
        prune(&mut header.calculo);
    }
}

// ==========================================
// Whole-schema construction
// ==========================================

/// Builds a new (unpersisted) TipoMaterial from a create payload
pub fn build_tipo_material(
    payload: &TipoMaterialCreate,
    default_valor_dolar: f64,
) -> EngineResult<TipoMaterial> {
    let titulo = payload.titulo.trim();
    if titulo.is_empty() {
        return Err(EngineError::validation(
            "El título del tipo de material es obligatorio",
        ));
    }

    let base = build_headers_base(payload.headers_base_active.as_deref());
    let mut base = apply_base_calculations(base, payload.headers_base_calculations.as_deref());
    let mut attrs = normalize_headers_atributes(
        payload.headers_atributes.as_deref().unwrap_or(&[]),
        &[],
    )?;

    validate_calculos(&base, &attrs)?;
    validate_titles(&base, &attrs)?;

    let order_headers = apply_order_headers(&mut base, &mut attrs, payload.order_headers.as_deref());
    let total_cantidad = initialize_total_cantidad(&base, &attrs);
    let now = Utc::now();

    Ok(TipoMaterial {
        id_tipo_material: 0,
        titulo: titulo.to_string(),
        headers_base: base,
        headers_atributes: attrs,
        order_headers,
        total_costo_unitario: 0.0,
        total_costo_total: 0.0,
        total_usd: 0.0,
        valor_dolar: payload.valor_dolar.unwrap_or(default_valor_dolar),
        total_cantidad,
        created_at: now,
        updated_at: now,
    })
}

/// Produces the edited schema of `current` with all aggregates reset.
///
/// The caller must re-run every material through the evaluator and the
/// accumulator afterwards.
pub fn rebuild_schema(
    current: &TipoMaterial,
    payload: &TipoMaterialUpdate,
) -> EngineResult<TipoMaterial> {
    let titulo = match payload.titulo.as_deref().map(str::trim) {
        Some("") => {
            return Err(EngineError::validation(
                "El título del tipo de material es obligatorio",
            ))
        }
        Some(t) => t.to_string(),
        None => current.titulo.clone(),
    };

    let mut base = match payload.headers_base_active.as_deref() {
        Some(active_ids) => carry_base_headers(current, build_headers_base(Some(active_ids))),
        None => current.headers_base.clone(),
    };
    let mut attrs = match payload.headers_atributes.as_deref() {
        Some(input) => normalize_headers_atributes(input, &current.headers_atributes)?,
        None => current.headers_atributes.clone(),
    };

    prune_calculo_references(&mut base, &mut attrs);
    let mut base = apply_base_calculations(base, payload.headers_base_calculations.as_deref());

    validate_calculos(&base, &attrs)?;
    validate_titles(&base, &attrs)?;

    let order_payload = payload
        .order_headers
        .as_deref()
        .unwrap_or(current.order_headers.as_slice());
    let order_headers = apply_order_headers(&mut base, &mut attrs, Some(order_payload));

    let mut tipo = TipoMaterial {
        id_tipo_material: current.id_tipo_material,
        titulo,
        headers_base: base,
        headers_atributes: attrs,
        order_headers,
        total_costo_unitario: 0.0,
        total_costo_total: 0.0,
        total_usd: 0.0,
        valor_dolar: payload.valor_dolar.unwrap_or(current.valor_dolar),
        total_cantidad: TotalCantidad::default(),
        created_at: current.created_at,
        updated_at: Utc::now(),
    };
    reset_totals(&mut tipo);
    Ok(tipo)
}

/// Keeps titles, orders and formulas of the current base headers when the
/// active set is rebuilt. A TotalCost formula still equal to the old default
/// is regenerated for the new active set.
fn carry_base_headers(current: &TipoMaterial, fresh: Vec<HeaderBase>) -> Vec<HeaderBase> {
    let old_default = Calculo::default_total_cost(&current.active_base_ids());
    fresh
        .into_iter()
        .map(|mut header| {
            if let Some(previous) = current
                .headers_base
                .iter()
                .find(|h| h.id_header_base == header.id_header_base)
            {
                header.titulo = previous.titulo.clone();
                header.order = previous.order;
                let is_default_total = header.identity() == Some(BaseHeaderId::TotalCost)
                    && previous.calculo == old_default;
                if !is_default_total {
                    header.calculo = previous.calculo.clone();
                }
            }
            header
        })
        .collect()
}
