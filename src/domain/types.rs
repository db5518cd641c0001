// ==========================================
// Materiales Costing - Domain value types
// ==========================================
// Header identity, header kind and formula operators.
// Shared by the engine, the Excel layer and the JSON columns.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// HeaderKind - base or attribute column
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeaderKind {
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "atribute", alias = "atributo", alias = "attribute")]
    Atribute,
}

impl HeaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderKind::Base => "base",
            HeaderKind::Atribute => "atribute",
        }
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for HeaderKind {
    fn default() -> Self {
        HeaderKind::Base
    }
}

// ==========================================
// HeaderKey - (kind, id) pair identifying a column
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderKey {
    pub kind: HeaderKind,
    pub id: i64,
}

impl HeaderKey {
    pub fn base(id: i64) -> Self {
        Self { kind: HeaderKind::Base, id }
    }

    pub fn atribute(id: i64) -> Self {
        Self { kind: HeaderKind::Atribute, id }
    }
}

impl fmt::Display for HeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ==========================================
// BaseHeaderId - the five fixed base columns
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseHeaderId {
    Detail = 1,
    Quantity = 2,
    Unit = 3,
    UnitCost = 4,
    TotalCost = 5,
}

impl BaseHeaderId {
    pub const ALL: [BaseHeaderId; 5] = [
        BaseHeaderId::Detail,
        BaseHeaderId::Quantity,
        BaseHeaderId::Unit,
        BaseHeaderId::UnitCost,
        BaseHeaderId::TotalCost,
    ];

    /// Detail, UnitCost and TotalCost are always active
    pub const REQUIRED: [BaseHeaderId; 3] = [
        BaseHeaderId::Detail,
        BaseHeaderId::UnitCost,
        BaseHeaderId::TotalCost,
    ];

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(BaseHeaderId::Detail),
            2 => Some(BaseHeaderId::Quantity),
            3 => Some(BaseHeaderId::Unit),
            4 => Some(BaseHeaderId::UnitCost),
            5 => Some(BaseHeaderId::TotalCost),
            _ => None,
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            BaseHeaderId::Detail => "Detalle",
            BaseHeaderId::Quantity => "Cantidad",
            BaseHeaderId::Unit => "Unidad",
            BaseHeaderId::UnitCost => "$Unitario",
            BaseHeaderId::TotalCost => "$Total",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            BaseHeaderId::Quantity | BaseHeaderId::UnitCost | BaseHeaderId::TotalCost
        )
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Display position used when no explicit order was given (TotalCost last)
    pub fn default_order(self) -> i64 {
        match self {
            BaseHeaderId::TotalCost => 999,
            other => other.id(),
        }
    }

    pub fn key(self) -> HeaderKey {
        HeaderKey::base(self.id())
    }
}

// ==========================================
// OperationKind - formula operator
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Multiplicacion,
    Division,
    Suma,
    Resta,
}

impl OperationKind {
    /// Spreadsheet infix symbol for this operator
    pub fn symbol(self) -> char {
        match self {
            OperationKind::Multiplicacion => '*',
            OperationKind::Division => '/',
            OperationKind::Suma => '+',
            OperationKind::Resta => '-',
        }
    }
}

impl Default for OperationKind {
    fn default() -> Self {
        OperationKind::Multiplicacion
    }
}
