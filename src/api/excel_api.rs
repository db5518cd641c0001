// ==========================================
// Materiales Costing - Excel API
// ==========================================
// Export: one sheet per type with live formulas.
// Import: transactional replace of a type's materials.
//   1. parse rows against the type's headers
//   2. formulas + quantity totals recomputed from rows,
//      unparseable cells count as 0
//   3. cost totals and total_USD taken from the sheet panel
//   4. positive dollar change beyond tolerance -> global repricing
//   5. delete + insert + type update, one transaction
// ==========================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::tipo_material::TipoMaterial;
use crate::engine::formula::apply_formulas_lenient;
use crate::engine::schema::reset_totals;
use crate::engine::totals::add_material;
use crate::excel::exporter::{export_filename, ExcelExporter};
use crate::excel::importer::{ExcelImporter, ParsedWorkbook};
use crate::repository::material_repo::MaterialRepository;
use crate::repository::tipo_material_repo::TipoMaterialRepository;

/// Aggregates of the type after an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalesActualizados {
    pub total_costo_unitario: f64,
    pub total_costo_total: f64,
    #[serde(rename = "total_USD")]
    pub total_usd: f64,
}

/// Import outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcelImportReport {
    /// Correlation id of this import in the logs
    pub lote_id: String,
    pub materiales_creados: usize,
    /// True when the sheet's dollar value triggered a global repricing
    pub valor_dolar_actualizado: bool,
    pub nuevo_valor_dolar: Option<f64>,
    pub totales_actualizados: TotalesActualizados,
    /// Sheet rows (1-based) ignored for lacking a detail value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filas_omitidas: Vec<u32>,
}

// ==========================================
// ExcelApi
// ==========================================
pub struct ExcelApi {
    tipo_repo: Arc<TipoMaterialRepository>,
    material_repo: Arc<MaterialRepository>,
    config_manager: Arc<ConfigManager>,
}

impl ExcelApi {
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

    /// Workbook for one type. Returns `(filename, xlsx bytes)`.
    #[instrument(skip(self), fields(id_tipo_material = id))]
    pub fn export_excel(&self, id: i64) -> ApiResult<(String, Vec<u8>)> {
        let tipo = self.load_tipo(id)?;
        let materials = self.material_repo.list_by_tipo(id)?;

        let exporter = ExcelExporter::new(self.config_manager.get_excel_formula_rows()?);
        let bytes = exporter.export(&tipo, &materials)?;
        let filename = export_filename(&tipo.titulo);

        info!(
            id_tipo_material = id,
            materiales = materials.len(),
            bytes = bytes.len(),
            archivo = %filename,
            "Excel exportado"
        );
        Ok((filename, bytes))
    }

    /// Replaces every material of the type with the rows of `bytes`.
    /// Nothing is written when any step fails.
    #[instrument(skip(self, bytes), fields(id_tipo_material = id, bytes = bytes.len()))]
    pub fn import_excel(&self, id: i64, bytes: &[u8]) -> ApiResult<ExcelImportReport> {
        let lote_id = Uuid::new_v4().to_string();
        let mut tipo = self.load_tipo(id)?;

        let importer = ExcelImporter::new(self.config_manager.get_excel_empty_row_run()?);
        let ParsedWorkbook {
            mut materials,
            totals,
            valor_dolar,
            skipped_rows,
        } = importer.parse(&tipo, bytes)?;

        if !skipped_rows.is_empty() {
            warn!(lote_id = %lote_id, filas = ?skipped_rows, "filas sin detalle omitidas");
        }

        // Quantity totals come from the rows
        reset_totals(&mut tipo);
        for material in materials.iter_mut() {
            apply_formulas_lenient(&tipo, material)?;
            add_material(&mut tipo, material);
        }

        // Cost totals come from the sheet panel when present
        if let Some(value) = totals.total_costo_unitario {
            tipo.total_costo_unitario = value;
        }
        if let Some(value) = totals.total_costo_total {
            tipo.total_costo_total = value;
        }

        let tolerance = self.config_manager.get_valor_dolar_tolerance()?;
        let repricing = valor_dolar
            .filter(|nuevo| *nuevo > 0.0)
            .filter(|nuevo| (nuevo - tipo.valor_dolar).abs() > tolerance);
        if let Some(nuevo) = repricing {
            info!(
                anterior = tipo.valor_dolar,
                nuevo,
                "el Excel trae otro valor del dólar, se aplica a todos los tipos"
            );
            tipo.valor_dolar = nuevo;
        }
        match totals.total_usd {
            Some(value) => tipo.total_usd = value,
            None => tipo.refresh_total_usd(),
        }
        tipo.updated_at = Utc::now();

        let ids = self
            .material_repo
            .replace_all_for_tipo(&tipo, &materials, repricing)?;

        info!(
            id_tipo_material = id,
            lote_id = %lote_id,
            materiales = ids.len(),
            total_costo_total = tipo.total_costo_total,
            "Excel importado"
        );

        Ok(ExcelImportReport {
            lote_id,
            materiales_creados: ids.len(),
            valor_dolar_actualizado: repricing.is_some(),
            nuevo_valor_dolar: repricing,
            totales_actualizados: TotalesActualizados {
                total_costo_unitario: tipo.total_costo_unitario,
                total_costo_total: tipo.total_costo_total,
                total_usd: tipo.total_usd,
            },
            filas_omitidas: skipped_rows,
        })
    }

    fn load_tipo(&self, id: i64) -> ApiResult<TipoMaterial> {
        self.tipo_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("TipoMaterial con id={} no existe", id)))
    }
}
