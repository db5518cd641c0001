// ==========================================
// Materiales Costing - TipoMaterial API
// ==========================================
// Type lifecycle: create, schema edit with full recompute,
// read models, cascade delete.
// ==========================================

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::tipo_material::{
    TipoMaterial, TipoMaterialCreate, TipoMaterialRead, TipoMaterialUpdate,
};
use crate::engine::normalizer::sync_material_schema;
use crate::engine::schema::{build_tipo_material, rebuild_schema};
use crate::engine::totals::recompute_totals;
use crate::repository::material_repo::MaterialRepository;
use crate::repository::tipo_material_repo::TipoMaterialRepository;

// ==========================================
// TipoMaterialApi
// ==========================================
pub struct TipoMaterialApi {
    tipo_repo: Arc<TipoMaterialRepository>,
    material_repo: Arc<MaterialRepository>,
    config_manager: Arc<ConfigManager>,
}

impl TipoMaterialApi {
    pub fn new(
        tipo_repo: Arc<TipoMaterialRepository>,
        material_repo: Arc<MaterialRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            tipo_repo,
            material_repo,
            config_manager,
        }
    }

    // ==========================================
    // Commands
    // ==========================================

    /// Creates a type with its header schema and zeroed aggregates.
    ///
    /// # Errors
    /// - `Conflict` when another type already uses the title
    /// - `NotFound` when a formula references an unknown header
    /// - `ValidationError` for blank or duplicate titles
    pub fn create_tipo(&self, payload: TipoMaterialCreate) -> ApiResult<TipoMaterialRead> {
        let default_valor_dolar = self.config_manager.get_default_valor_dolar()?;
        let mut tipo = build_tipo_material(&payload, default_valor_dolar)?;

        self.ensure_unique_titulo(&tipo.titulo, None)?;
        tipo.id_tipo_material = self.tipo_repo.insert(&tipo)?;

        info!(
            id_tipo_material = tipo.id_tipo_material,
            titulo = %tipo.titulo,
            atributos = tipo.headers_atributes.len(),
            "tipo de material creado"
        );
        Ok(TipoMaterialRead::from_entity(tipo, 0))
    }

    /// Edits the schema, then re-runs every material through the evaluator
    /// and the accumulator. Type and rows are stored in one transaction.
    #[instrument(skip(self, payload), fields(id_tipo_material = id))]
    pub fn update_tipo(&self, id: i64, payload: TipoMaterialUpdate) -> ApiResult<TipoMaterialRead> {
        let current = self.load_tipo(id)?;
        let mut tipo = rebuild_schema(&current, &payload)?;
        if tipo.titulo != current.titulo {
            self.ensure_unique_titulo(&tipo.titulo, Some(id))?;
        }

        let materiales = self.recompute_and_save(&mut tipo)?;

        info!(
            id_tipo_material = id,
            materiales,
            total_costo_total = tipo.total_costo_total,
            "esquema del tipo actualizado"
        );
        Ok(TipoMaterialRead::from_entity(tipo, materiales))
    }

    /// Rebuilds the aggregates of one type from its stored rows
    #[instrument(skip(self), fields(id_tipo_material = id))]
    pub fn recompute_tipo(&self, id: i64) -> ApiResult<TipoMaterialRead> {
        let mut tipo = self.load_tipo(id)?;
        tipo.updated_at = chrono::Utc::now();
        let materiales = self.recompute_and_save(&mut tipo)?;

        info!(id_tipo_material = id, materiales, "totales recalculados");
        Ok(TipoMaterialRead::from_entity(tipo, materiales))
    }

    /// Deletes a type and, through the foreign key, all of its materials
    pub fn delete_tipo(&self, id: i64) -> ApiResult<()> {
        if !self.tipo_repo.delete(id)? {
            return Err(ApiError::NotFound(format!(
                "TipoMaterial con id={} no existe",
                id
            )));
        }
        warn!(id_tipo_material = id, "tipo de material eliminado con sus materiales");
        Ok(())
    }

    // ==========================================
    // Queries
    // ==========================================

    pub fn get_tipo(&self, id: i64) -> ApiResult<TipoMaterialRead> {
        let tipo = self.load_tipo(id)?;
        let count = self.tipo_repo.count_materials(id)?;
        Ok(TipoMaterialRead::from_entity(tipo, count))
    }

    pub fn list_tipos(&self) -> ApiResult<Vec<TipoMaterialRead>> {
        self.tipo_repo
            .list_all()?
            .into_iter()
            .map(|tipo| {
                let count = self.tipo_repo.count_materials(tipo.id_tipo_material)?;
                Ok(TipoMaterialRead::from_entity(tipo, count))
            })
            .collect()
    }

    // ==========================================
    // Helpers
    // ==========================================

    fn load_tipo(&self, id: i64) -> ApiResult<TipoMaterial> {
        self.tipo_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("TipoMaterial con id={} no existe", id)))
    }

    fn ensure_unique_titulo(&self, titulo: &str, own_id: Option<i64>) -> ApiResult<()> {
        match self.tipo_repo.find_by_titulo(titulo)? {
            Some(existing) if Some(existing.id_tipo_material) != own_id => {
                Err(ApiError::Conflict(format!(
                    "Ya existe un tipo de material con el título '{}'",
                    titulo
                )))
            }
            _ => Ok(()),
        }
    }

    /// Aligns rows with the schema, recomputes, stores; returns the row count
    fn recompute_and_save(&self, tipo: &mut TipoMaterial) -> ApiResult<usize> {
        let mut materials = self.material_repo.list_by_tipo(tipo.id_tipo_material)?;
        let now = chrono::Utc::now();
        for material in materials.iter_mut() {
            sync_material_schema(tipo, material);
            material.updated_at = now;
        }

        recompute_totals(tipo, &mut materials)?;
        self.material_repo.save_tipo_with_materials(tipo, &materials)?;
        Ok(materials.len())
    }
}
