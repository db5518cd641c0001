// ==========================================
// Materiales Costing - Header schema model
// ==========================================
// Column definitions of a TipoMaterial: fixed base headers,
// user-defined attribute headers, their formulas (Calculo)
// and the merged display order.
// ==========================================

use crate::domain::types::{BaseHeaderId, HeaderKey, HeaderKind, OperationKind};
use serde::{Deserialize, Serialize};

// ==========================================
// Calculo - declarative formula attached to a header
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Operacion {
    #[serde(default)]
    pub tipo: OperationKind,
    #[serde(default)]
    pub headers_base: Vec<i64>,
    #[serde(default)]
    pub headers_atributes: Vec<i64>,
}

impl Operacion {
    pub fn new(tipo: OperationKind, headers_base: Vec<i64>, headers_atributes: Vec<i64>) -> Self {
        Self {
            tipo,
            headers_base,
            headers_atributes,
        }
    }

    /// Referenced headers, base first then attributes, in declaration order
    pub fn references(&self) -> impl Iterator<Item = HeaderKey> + '_ {
        self.headers_base
            .iter()
            .map(|id| HeaderKey::base(*id))
            .chain(self.headers_atributes.iter().map(|id| HeaderKey::atribute(*id)))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Calculo {
    #[serde(default)]
    pub activo: bool,
    #[serde(default, rename = "isMultiple")]
    pub is_multiple: bool,
    #[serde(default)]
    pub operaciones: Vec<Operacion>,
}

impl Calculo {
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Default TotalCost formula: Quantity x UnitCost, filtered to active columns
    pub fn default_total_cost(active: &[BaseHeaderId]) -> Self {
        let headers_base = [BaseHeaderId::Quantity, BaseHeaderId::UnitCost]
            .into_iter()
            .filter(|id| active.contains(id))
            .map(BaseHeaderId::id)
            .collect();
        Self {
            activo: true,
            is_multiple: false,
            operaciones: vec![Operacion::new(
                OperationKind::Multiplicacion,
                headers_base,
                Vec::new(),
            )],
        }
    }

    /// Operations that take part in evaluation (all when chained, else the first)
    pub fn effective_operations(&self) -> &[Operacion] {
        if self.is_multiple {
            &self.operaciones
        } else {
            let end = self.operaciones.len().min(1);
            &self.operaciones[..end]
        }
    }

    pub fn is_effective(&self) -> bool {
        self.activo && !self.operaciones.is_empty()
    }
}

// ==========================================
// HeaderBase - one of the five fixed columns
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderBase {
    pub id_header_base: i64,
    pub titulo: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub calculo: Calculo,
    #[serde(default)]
    pub order: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl HeaderBase {
    pub fn identity(&self) -> Option<BaseHeaderId> {
        BaseHeaderId::from_id(self.id_header_base)
    }

    pub fn key(&self) -> HeaderKey {
        HeaderKey::base(self.id_header_base)
    }

    pub fn effective_order(&self) -> i64 {
        self.order.unwrap_or_else(|| {
            self.identity()
                .map(BaseHeaderId::default_order)
                .unwrap_or(self.id_header_base)
        })
    }
}

// ==========================================
// HeaderAtributo - user-defined column
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderAtributo {
    pub id_header_atribute: i64,
    pub titulo: String,
    #[serde(default, rename = "isCantidad")]
    pub is_cantidad: bool,
    #[serde(default)]
    pub calculo: Calculo,
    #[serde(default)]
    pub total_costo_header: f64,
    #[serde(default)]
    pub order: Option<i64>,
}

impl HeaderAtributo {
    pub fn key(&self) -> HeaderKey {
        HeaderKey::atribute(self.id_header_atribute)
    }

    /// Quantity-flagged: explicitly a quantity, or driven by an active formula
    pub fn is_quantity_tracked(&self) -> bool {
        self.is_cantidad || self.calculo.activo
    }

    pub fn effective_order(&self) -> i64 {
        self.order.unwrap_or(self.id_header_atribute)
    }
}

// ==========================================
// OrderHeaderEntry - merged display order
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHeaderEntry {
    #[serde(rename = "type", default)]
    pub kind: HeaderKind,
    pub id: i64,
    pub order: i64,
}

impl OrderHeaderEntry {
    pub fn new(key: HeaderKey, order: i64) -> Self {
        Self {
            kind: key.kind,
            id: key.id,
            order,
        }
    }

    pub fn key(&self) -> HeaderKey {
        HeaderKey {
            kind: self.kind,
            id: self.id,
        }
    }
}

// ==========================================
// Payload inputs
// ==========================================

/// Per-base-header override on create/update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderBaseCalc {
    pub id_header_base: i64,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub calculo: Option<Calculo>,
    #[serde(default)]
    pub order: Option<i64>,
}

/// Attribute header as supplied by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderAtributoInput {
    #[serde(default)]
    pub id_header_atribute: Option<i64>,
    pub titulo: String,
    #[serde(default, rename = "isCantidad")]
    pub is_cantidad: bool,
    #[serde(default)]
    pub calculo: Option<Calculo>,
    #[serde(default)]
    pub order: Option<i64>,
}

impl HeaderAtributoInput {
    pub fn new(titulo: &str) -> Self {
        Self {
            titulo: titulo.to_string(),
            ..Default::default()
        }
    }
}

// ==========================================
// HeaderSpec - resolved column (kind + id + formula)
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSpec {
    pub kind: HeaderKind,
    pub id: i64,
    pub titulo: String,
    pub calculo: Calculo,
    pub is_cantidad: bool,
    pub order: i64,
}

impl HeaderSpec {
    pub fn from_base(header: &HeaderBase) -> Self {
        Self {
            kind: HeaderKind::Base,
            id: header.id_header_base,
            titulo: header.titulo.clone(),
            calculo: header.calculo.clone(),
            is_cantidad: header.identity() == Some(BaseHeaderId::Quantity),
            order: header.effective_order(),
        }
    }

    pub fn from_atribute(header: &HeaderAtributo) -> Self {
        Self {
            kind: HeaderKind::Atribute,
            id: header.id_header_atribute,
            titulo: header.titulo.clone(),
            calculo: header.calculo.clone(),
            is_cantidad: header.is_cantidad,
            order: header.effective_order(),
        }
    }

    pub fn key(&self) -> HeaderKey {
        HeaderKey {
            kind: self.kind,
            id: self.id,
        }
    }

    pub fn base_identity(&self) -> Option<BaseHeaderId> {
        match self.kind {
            HeaderKind::Base => BaseHeaderId::from_id(self.id),
            HeaderKind::Atribute => None,
        }
    }

    /// Values in this column are written/read as numbers
    pub fn numeric_hint(&self) -> bool {
        match self.kind {
            HeaderKind::Base => self.base_identity().map(BaseHeaderId::is_numeric).unwrap_or(false),
            HeaderKind::Atribute => self.is_cantidad || self.calculo.activo,
        }
    }

    pub fn has_formula(&self) -> bool {
        self.calculo.is_effective()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculo_json_shape() {
        let raw = r#"{"activo":true,"isMultiple":false,"operaciones":[{"tipo":"suma","headers_base":[2],"headers_atributes":[1,3]}]}"#;
        let calculo: Calculo = serde_json::from_str(raw).unwrap();
        assert!(calculo.activo);
        assert_eq!(calculo.operaciones[0].tipo, OperationKind::Suma);
        let refs: Vec<_> = calculo.operaciones[0].references().collect();
        assert_eq!(
            refs,
            vec![HeaderKey::base(2), HeaderKey::atribute(1), HeaderKey::atribute(3)]
        );
    }

    #[test]
    fn test_effective_operations_respects_is_multiple() {
        let mut calculo = Calculo {
            activo: true,
            is_multiple: false,
            operaciones: vec![Operacion::default(), Operacion::default()],
        };
        assert_eq!(calculo.effective_operations().len(), 1);
        calculo.is_multiple = true;
        assert_eq!(calculo.effective_operations().len(), 2);
    }

    #[test]
    fn test_default_total_cost_filters_inactive() {
        let calculo = Calculo::default_total_cost(&[BaseHeaderId::UnitCost]);
        assert_eq!(calculo.operaciones[0].headers_base, vec![4]);
    }

    #[test]
    fn test_attribute_quantity_tracking() {
        let mut header = HeaderAtributo {
            id_header_atribute: 1,
            titulo: "Voltaje".to_string(),
            is_cantidad: false,
            calculo: Calculo::inactive(),
            total_costo_header: 0.0,
            order: None,
        };
        assert!(!header.is_quantity_tracked());
        header.calculo.activo = true;
        assert!(header.is_quantity_tracked());
    }
}
