// ==========================================
// Materiales Costing - TipoMaterial (planilla)
// ==========================================
// A material type: header schema + running aggregates.
// Persisted in the tipo_material table; JSON columns are
// serialized from the typed structs below.
// ==========================================

use crate::domain::header::{
    HeaderAtributo, HeaderAtributoInput, HeaderBase, HeaderBaseCalc, OrderHeaderEntry,
};
use crate::domain::types::{BaseHeaderId, HeaderKey, HeaderKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// TotalCantidad - per-column running sums
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalCantidadItem {
    #[serde(rename = "typeOfHeader")]
    pub type_of_header: HeaderKind,
    #[serde(rename = "idHeader")]
    pub id_header: i64,
    #[serde(default)]
    pub total: f64,
}

impl TotalCantidadItem {
    pub fn new(key: HeaderKey) -> Self {
        Self {
            type_of_header: key.kind,
            id_header: key.id,
            total: 0.0,
        }
    }

    pub fn key(&self) -> HeaderKey {
        HeaderKey {
            kind: self.type_of_header,
            id: self.id_header,
        }
    }

    /// Base UnitCost/TotalCost entries are cost sums, everything else is a quantity
    pub fn is_quantity(&self) -> bool {
        match self.type_of_header {
            HeaderKind::Atribute => true,
            HeaderKind::Base => !matches!(
                BaseHeaderId::from_id(self.id_header),
                Some(BaseHeaderId::UnitCost) | Some(BaseHeaderId::TotalCost)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TotalCantidad {
    #[serde(default)]
    pub total_cantidades: f64,
    #[serde(default)]
    pub cantidades: Vec<TotalCantidadItem>,
}

impl TotalCantidad {
    pub fn entry(&self, key: HeaderKey) -> Option<&TotalCantidadItem> {
        self.cantidades.iter().find(|e| e.key() == key)
    }

    /// Returns the entry for `key`, appending a zeroed one when missing
    pub fn ensure_entry(&mut self, key: HeaderKey) -> &mut TotalCantidadItem {
        let pos = match self.cantidades.iter().position(|e| e.key() == key) {
            Some(pos) => pos,
            None => {
                self.cantidades.push(TotalCantidadItem::new(key));
                self.cantidades.len() - 1
            }
        };
        &mut self.cantidades[pos]
    }

    pub fn total_for(&self, key: HeaderKey) -> f64 {
        self.entry(key).map(|e| e.total).unwrap_or(0.0)
    }
}

// ==========================================
// TipoMaterial - entity
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipoMaterial {
    /// 0 until persisted
    pub id_tipo_material: i64,
    pub titulo: String,
    pub headers_base: Vec<HeaderBase>,
    #[serde(default)]
    pub headers_atributes: Vec<HeaderAtributo>,
    #[serde(default)]
    pub order_headers: Vec<OrderHeaderEntry>,
    #[serde(default)]
    pub total_costo_unitario: f64,
    #[serde(default)]
    pub total_costo_total: f64,
    #[serde(default, rename = "total_USD")]
    pub total_usd: f64,
    #[serde(default)]
    pub valor_dolar: f64,
    #[serde(default)]
    pub total_cantidad: TotalCantidad,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TipoMaterial {
    pub fn base_header(&self, id: BaseHeaderId) -> Option<&HeaderBase> {
        self.headers_base
            .iter()
            .find(|h| h.id_header_base == id.id())
    }

    pub fn is_base_active(&self, id: BaseHeaderId) -> bool {
        id.is_required() || self.base_header(id).map(|h| h.active).unwrap_or(false)
    }

    pub fn active_base_ids(&self) -> Vec<BaseHeaderId> {
        BaseHeaderId::ALL
            .into_iter()
            .filter(|id| self.is_base_active(*id))
            .collect()
    }

    pub fn attribute_header(&self, id: i64) -> Option<&HeaderAtributo> {
        self.headers_atributes
            .iter()
            .find(|h| h.id_header_atribute == id)
    }

    pub fn attribute_header_mut(&mut self, id: i64) -> Option<&mut HeaderAtributo> {
        self.headers_atributes
            .iter_mut()
            .find(|h| h.id_header_atribute == id)
    }

    pub fn has_header(&self, key: HeaderKey) -> bool {
        match key.kind {
            HeaderKind::Base => self.headers_base.iter().any(|h| h.id_header_base == key.id),
            HeaderKind::Atribute => self.attribute_header(key.id).is_some(),
        }
    }

    pub fn refresh_total_usd(&mut self) {
        self.total_usd = self.total_costo_total * self.valor_dolar;
    }
}

// ==========================================
// Request payloads
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TipoMaterialCreate {
    pub titulo: String,
    #[serde(default)]
    pub headers_base_calculations: Option<Vec<HeaderBaseCalc>>,
    #[serde(default)]
    pub headers_base_active: Option<Vec<i64>>,
    #[serde(default)]
    pub headers_atributes: Option<Vec<HeaderAtributoInput>>,
    #[serde(default)]
    pub order_headers: Option<Vec<OrderHeaderEntry>>,
    #[serde(default)]
    pub valor_dolar: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TipoMaterialUpdate {
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub headers_base_calculations: Option<Vec<HeaderBaseCalc>>,
    #[serde(default)]
    pub headers_base_active: Option<Vec<i64>>,
    #[serde(default)]
    pub headers_atributes: Option<Vec<HeaderAtributoInput>>,
    #[serde(default)]
    pub order_headers: Option<Vec<OrderHeaderEntry>>,
    #[serde(default)]
    pub valor_dolar: Option<f64>,
}

// ==========================================
// Read model
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipoMaterialRead {
    pub id_tipo_material: i64,
    pub titulo: String,
    pub total_costo_unitario: f64,
    pub total_costo_total: f64,
    #[serde(rename = "total_USD")]
    pub total_usd: f64,
    pub valor_dolar: f64,
    pub total_cantidad: TotalCantidad,
    pub headers_base: Vec<HeaderBase>,
    pub headers_atributes: Vec<HeaderAtributo>,
    pub order_headers: Vec<OrderHeaderEntry>,
    pub materiales_count: usize,
}

impl TipoMaterialRead {
    pub fn from_entity(tipo: TipoMaterial, materiales_count: usize) -> Self {
        Self {
            id_tipo_material: tipo.id_tipo_material,
            titulo: tipo.titulo,
            total_costo_unitario: tipo.total_costo_unitario,
            total_costo_total: tipo.total_costo_total,
            total_usd: tipo.total_usd,
            valor_dolar: tipo.valor_dolar,
            total_cantidad: tipo.total_cantidad,
            headers_base: tipo.headers_base,
            headers_atributes: tipo.headers_atributes,
            order_headers: tipo.order_headers,
            materiales_count,
        }
    }
}
