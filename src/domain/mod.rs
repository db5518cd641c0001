// ==========================================
// Materiales Costing - Domain layer
// ==========================================
// Entities, value types and request/read models.
// No data access, no engine logic.
// ==========================================

pub mod header;
pub mod material;
pub mod tipo_material;
pub mod types;

pub use header::{
    Calculo, HeaderAtributo, HeaderAtributoInput, HeaderBase, HeaderBaseCalc, HeaderSpec,
    Operacion, OrderHeaderEntry,
};
pub use material::{
    format_number, BaseValue, Material, MaterialAtributo, MaterialCreate, MaterialFields,
    MaterialUpdate,
};
pub use tipo_material::{
    TipoMaterial, TipoMaterialCreate, TipoMaterialRead, TipoMaterialUpdate, TotalCantidad,
    TotalCantidadItem,
};
pub use types::{BaseHeaderId, HeaderKey, HeaderKind, OperationKind};
