// ==========================================
// Materiales Costing - Material domain model
// ==========================================
// One row of a TipoMaterial. Base fields map to the fixed
// base headers; atributos carry one value per attribute header.
// ==========================================

use crate::domain::types::BaseHeaderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// MaterialAtributo - value of one attribute header
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialAtributo {
    pub id_header_atribute: i64,
    #[serde(default)]
    pub value: String,
}

impl MaterialAtributo {
    pub fn new(id_header_atribute: i64, value: impl Into<String>) -> Self {
        Self {
            id_header_atribute,
            value: value.into(),
        }
    }
}

// ==========================================
// BaseValue - raw content of a base field
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum BaseValue {
    Empty,
    Text(String),
    Number(f64),
}

// ==========================================
// Material - entity
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// 0 until persisted
    pub id_material: i64,
    pub id_tipo_material: i64,
    pub detalle: Option<String>,
    pub unidad: Option<String>,
    pub cantidad: Option<String>,
    #[serde(default)]
    pub costo_unitario: f64,
    #[serde(default)]
    pub costo_total: f64,
    #[serde(default)]
    pub atributos: Vec<MaterialAtributo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    pub fn new(id_tipo_material: i64) -> Self {
        let now = Utc::now();
        Self {
            id_material: 0,
            id_tipo_material,
            detalle: None,
            unidad: None,
            cantidad: None,
            costo_unitario: 0.0,
            costo_total: 0.0,
            atributos: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attribute_value(&self, id_header_atribute: i64) -> Option<&str> {
        self.atributos
            .iter()
            .find(|a| a.id_header_atribute == id_header_atribute)
            .map(|a| a.value.as_str())
    }

    /// Overwrites an existing attribute value; returns false when absent
    pub fn set_attribute_value(&mut self, id_header_atribute: i64, value: String) -> bool {
        match self
            .atributos
            .iter_mut()
            .find(|a| a.id_header_atribute == id_header_atribute)
        {
            Some(attr) => {
                attr.value = value;
                true
            }
            None => false,
        }
    }

    /// Raw stored value behind a base header
    pub fn base_value(&self, id: BaseHeaderId) -> BaseValue {
        let text = |v: &Option<String>| match v {
            Some(s) => BaseValue::Text(s.clone()),
            None => BaseValue::Empty,
        };
        match id {
            BaseHeaderId::Detail => text(&self.detalle),
            BaseHeaderId::Quantity => text(&self.cantidad),
            BaseHeaderId::Unit => text(&self.unidad),
            BaseHeaderId::UnitCost => BaseValue::Number(self.costo_unitario),
            BaseHeaderId::TotalCost => BaseValue::Number(self.costo_total),
        }
    }

    /// Routes a computed value to the field behind a base header
    pub fn set_base_number(&mut self, id: BaseHeaderId, value: f64) {
        match id {
            BaseHeaderId::Detail => self.detalle = Some(format_number(value)),
            BaseHeaderId::Quantity => self.cantidad = Some(format_number(value)),
            BaseHeaderId::Unit => self.unidad = Some(format_number(value)),
            BaseHeaderId::UnitCost => self.costo_unitario = value,
            BaseHeaderId::TotalCost => self.costo_total = value,
        }
    }
}

/// Canonical text form of a computed number ("50", "37.5")
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ==========================================
// Request payloads
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialCreate {
    pub id_tipo_material: i64,
    #[serde(default)]
    pub detalle: Option<String>,
    #[serde(default)]
    pub unidad: Option<String>,
    #[serde(default)]
    pub cantidad: Option<String>,
    #[serde(default)]
    pub costo_unitario: Option<f64>,
    #[serde(default)]
    pub atributos: Option<Vec<MaterialAtributo>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialUpdate {
    #[serde(default)]
    pub detalle: Option<String>,
    #[serde(default)]
    pub unidad: Option<String>,
    #[serde(default)]
    pub cantidad: Option<String>,
    #[serde(default)]
    pub costo_unitario: Option<f64>,
    #[serde(default)]
    pub atributos: Option<Vec<MaterialAtributo>>,
}

/// Fields common to create and update, as seen by the row normalizer
#[derive(Debug, Clone, Copy)]
pub struct MaterialFields<'a> {
    pub detalle: Option<&'a str>,
    pub unidad: Option<&'a str>,
    pub cantidad: Option<&'a str>,
    pub costo_unitario: Option<f64>,
    pub atributos: Option<&'a [MaterialAtributo]>,
}

impl MaterialCreate {
    pub fn fields(&self) -> MaterialFields<'_> {
        MaterialFields {
            detalle: self.detalle.as_deref(),
            unidad: self.unidad.as_deref(),
            cantidad: self.cantidad.as_deref(),
            costo_unitario: self.costo_unitario,
            atributos: self.atributos.as_deref(),
        }
    }
}

impl MaterialUpdate {
    pub fn fields(&self) -> MaterialFields<'_> {
        MaterialFields {
            detalle: self.detalle.as_deref(),
            unidad: self.unidad.as_deref(),
            cantidad: self.cantidad.as_deref(),
            costo_unitario: self.costo_unitario,
            atributos: self.atributos.as_deref(),
        }
    }
}
