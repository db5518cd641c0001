// ==========================================
// Materiales Costing - Repository layer
// ==========================================
// Data access only; no business rules.
// All queries are parameterized.
// ==========================================

pub mod error;
pub mod material_repo;
pub mod tipo_material_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use material_repo::MaterialRepository;
pub use tipo_material_repo::TipoMaterialRepository;
