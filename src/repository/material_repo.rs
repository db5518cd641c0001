// ==========================================
// Materiales Costing - Material repository
// ==========================================
// Table: material (atributos as a JSON column).
// Every write that also touches the owning type's aggregates
// runs in one transaction together with the type update.
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::material::Material;
use crate::domain::tipo_material::TipoMaterial;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::tipo_material_repo::{
    json_column, reprice_all, timestamp_column, update_tipo,
};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const MATERIAL_COLUMNS: &str = r#"
    id_material, id_tipo_material, detalle, unidad, cantidad,
    costo_unitario, costo_total, atributos, created_at, updated_at
"#;

// ==========================================
// MaterialRepository
// ==========================================
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== Reads =====

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM material WHERE id_material = ?1", MATERIAL_COLUMNS);
        let result = conn.query_row(&sql, params![id], map_material_row);

        match result {
            Ok(material) => Ok(Some(material)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM material ORDER BY id_material", MATERIAL_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let materials = stmt
            .query_map([], map_material_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(materials)
    }

    /// Rows of one type in insertion order
    pub fn list_by_tipo(&self, id_tipo_material: i64) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM material WHERE id_tipo_material = ?1 ORDER BY id_material",
            MATERIAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let materials = stmt
            .query_map(params![id_tipo_material], map_material_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(materials)
    }

    // ===== Writes with aggregates =====

    /// Inserts `material` and stores the updated aggregates of `tipo`
    pub fn insert_with_tipo(&self, material: &Material, tipo: &TipoMaterial) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let id = insert_material(&tx, material)?;
        update_tipo(&tx, tipo)?;

        tx.commit()?;
        Ok(id)
    }

    /// Overwrites `material` and stores the updated aggregates of `tipo`
    pub fn update_with_tipo(&self, material: &Material, tipo: &TipoMaterial) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        update_material(&tx, material)?;
        update_tipo(&tx, tipo)?;

        tx.commit()?;
        Ok(())
    }

    /// Deletes one row and stores the updated aggregates of `tipo`
    pub fn delete_with_tipo(&self, id_material: i64, tipo: &TipoMaterial) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let affected = tx.execute("DELETE FROM material WHERE id_material = ?1", params![id_material])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Material", id_material));
        }
        update_tipo(&tx, tipo)?;

        tx.commit()?;
        Ok(())
    }

    /// Schema edit: stores the rebuilt type and every recomputed row
    pub fn save_tipo_with_materials(
        &self,
        tipo: &TipoMaterial,
        materials: &[Material],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        update_tipo(&tx, tipo)?;
        for material in materials {
            update_material(&tx, material)?;
        }

        tx.commit()?;
        debug!(tipo_id = tipo.id_tipo_material, materiales = materials.len(), "esquema guardado");
        Ok(())
    }

    /// Import replace, all or nothing:
    /// 1. optional global repricing of every type
    /// 2. delete every row of the type
    /// 3. insert the new rows
    /// 4. store the type aggregates
    ///
    /// Returns the new row ids in input order.
    pub fn replace_all_for_tipo(
        &self,
        tipo: &TipoMaterial,
        materials: &[Material],
        global_valor_dolar: Option<f64>,
    ) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        if let Some(valor_dolar) = global_valor_dolar {
            reprice_all(&tx, valor_dolar)?;
        }

        let deleted = tx.execute(
            "DELETE FROM material WHERE id_tipo_material = ?1",
            params![tipo.id_tipo_material],
        )?;

        let mut ids = Vec::with_capacity(materials.len());
        for material in materials {
            ids.push(insert_material(&tx, material)?);
        }
        update_tipo(&tx, tipo)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(
            tipo_id = tipo.id_tipo_material,
            eliminados = deleted,
            insertados = ids.len(),
            "materiales reemplazados"
        );
        Ok(ids)
    }
}

fn insert_material(conn: &Connection, material: &Material) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO material (
            id_tipo_material, detalle, unidad, cantidad,
            costo_unitario, costo_total, atributos, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            material.id_tipo_material,
            material.detalle,
            material.unidad,
            material.cantidad,
            material.costo_unitario,
            material.costo_total,
            serde_json::to_string(&material.atributos)?,
            material.created_at.to_rfc3339(),
            material.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_material(conn: &Connection, material: &Material) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"
        UPDATE material SET
            detalle = ?2, unidad = ?3, cantidad = ?4,
            costo_unitario = ?5, costo_total = ?6, atributos = ?7, updated_at = ?8
        WHERE id_material = ?1
        "#,
        params![
            material.id_material,
            material.detalle,
            material.unidad,
            material.cantidad,
            material.costo_unitario,
            material.costo_total,
            serde_json::to_string(&material.atributos)?,
            material.updated_at.to_rfc3339(),
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::not_found("Material", material.id_material));
    }
    Ok(())
}

fn map_material_row(row: &Row<'_>) -> rusqlite::Result<Material> {
    Ok(Material {
        id_material: row.get(0)?,
        id_tipo_material: row.get(1)?,
        detalle: row.get(2)?,
        unidad: row.get(3)?,
        cantidad: row.get(4)?,
        costo_unitario: row.get(5)?,
        costo_total: row.get(6)?,
        atributos: json_column(row, 7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}
