// ==========================================
// Materiales Costing - Material API
// ==========================================
// Row lifecycle. Each write keeps the owning type's
// aggregates consistent through symmetric add/remove:
//   create: normalize -> formulas -> add
//   update: remove(old) -> normalize -> formulas -> add(new)
//   delete: remove
// ==========================================

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::material::{Material, MaterialCreate, MaterialUpdate};
use crate::domain::tipo_material::TipoMaterial;
use crate::engine::formula::apply_formulas;
use crate::engine::normalizer::normalize_material;
use crate::engine::totals::{add_material, remove_material};
use crate::repository::material_repo::MaterialRepository;
use crate::repository::tipo_material_repo::TipoMaterialRepository;

// ==========================================
// MaterialApi
// ==========================================
pub struct MaterialApi {
    tipo_repo: Arc<TipoMaterialRepository>,
    material_repo: Arc<MaterialRepository>,
}

impl MaterialApi {
    pub fn new(
        tipo_repo: Arc<TipoMaterialRepository>,
        material_repo: Arc<MaterialRepository>,
    ) -> Self {
        Self {
            tipo_repo,
            material_repo,
        }
    }

    // ==========================================
    // Commands
    // ==========================================

    /// Creates one row under its type.
    ///
    /// # Errors
    /// - `NotFound` when the type does not exist
    /// - `ValidationError` for missing or non-numeric required fields
    /// - `DivisionByZero` when a formula divides by a zero-valued header
    pub fn create_material(&self, payload: MaterialCreate) -> ApiResult<Material> {
        let mut tipo = self.load_tipo(payload.id_tipo_material)?;

        let mut material = normalize_material(&tipo, payload.fields(), None)?;
        apply_formulas(&tipo, &mut material)?;
        add_material(&mut tipo, &material);
        tipo.updated_at = material.updated_at;

        material.id_material = self.material_repo.insert_with_tipo(&material, &tipo)?;

        info!(
            id_material = material.id_material,
            id_tipo_material = tipo.id_tipo_material,
            costo_total = material.costo_total,
            "material creado"
        );
        Ok(material)
    }

    /// Updates one row; absent fields keep their stored values
    pub fn update_material(&self, id: i64, payload: MaterialUpdate) -> ApiResult<Material> {
        let previous = self.load_material(id)?;
        let mut tipo = self.load_tipo(previous.id_tipo_material)?;

        // Aggregates must see the pre-update snapshot
        remove_material(&mut tipo, &previous);

        let mut material = normalize_material(&tipo, payload.fields(), Some(&previous))?;
        apply_formulas(&tipo, &mut material)?;
        add_material(&mut tipo, &material);
        tipo.updated_at = material.updated_at;

        self.material_repo.update_with_tipo(&material, &tipo)?;

        info!(
            id_material = id,
            id_tipo_material = tipo.id_tipo_material,
            costo_total = material.costo_total,
            "material actualizado"
        );
        Ok(material)
    }

    pub fn delete_material(&self, id: i64) -> ApiResult<()> {
        let material = self.load_material(id)?;
        let mut tipo = self.load_tipo(material.id_tipo_material)?;

        remove_material(&mut tipo, &material);
        tipo.updated_at = chrono::Utc::now();

        self.material_repo.delete_with_tipo(id, &tipo)?;

        info!(id_material = id, id_tipo_material = tipo.id_tipo_material, "material eliminado");
        Ok(())
    }

    // ==========================================
    // Queries
    // ==========================================

    pub fn get_material(&self, id: i64) -> ApiResult<Material> {
        self.load_material(id)
    }

    pub fn list_materials(&self) -> ApiResult<Vec<Material>> {
        Ok(self.material_repo.list_all()?)
    }

    pub fn list_materials_by_tipo(&self, id_tipo_material: i64) -> ApiResult<Vec<Material>> {
        // Unknown type is a 404, not an empty list
        self.load_tipo(id_tipo_material)?;
        let materials = self.material_repo.list_by_tipo(id_tipo_material)?;
        debug!(id_tipo_material, materiales = materials.len(), "materiales listados");
        Ok(materials)
    }

    fn load_material(&self, id: i64) -> ApiResult<Material> {
        self.material_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Material con id={} no existe", id)))
    }

    fn load_tipo(&self, id: i64) -> ApiResult<TipoMaterial> {
        self.tipo_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("TipoMaterial con id={} no existe", id)))
    }
}
