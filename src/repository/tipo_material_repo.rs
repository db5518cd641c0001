// ==========================================
// Materiales Costing - TipoMaterial repository
// ==========================================
// Table: tipo_material. Header schema and total_cantidad are
// JSON columns serialized from the typed domain structs.
// No business logic: aggregates arrive already computed.
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::tipo_material::TipoMaterial;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

const TIPO_COLUMNS: &str = r#"
    id_tipo_material, titulo, headers_base, headers_atributes, order_headers,
    total_costo_unitario, total_costo_total, total_usd, valor_dolar,
    total_cantidad, created_at, updated_at
"#;

// ==========================================
// TipoMaterialRepository
// ==========================================
pub struct TipoMaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TipoMaterialRepository {
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

    /// Inserts a new type and returns its id
    pub fn insert(&self, tipo: &TipoMaterial) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        insert_tipo(&conn, tipo)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<TipoMaterial>> {
        let conn = self.get_conn()?;
        select_tipo(&conn, id)
    }

    /// Exact match on the trimmed title
    pub fn find_by_titulo(&self, titulo: &str) -> RepositoryResult<Option<TipoMaterial>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM tipo_material WHERE titulo = ?1", TIPO_COLUMNS);
        let result = conn.query_row(&sql, params![titulo.trim()], map_tipo_row);

        match result {
            Ok(tipo) => Ok(Some(tipo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<TipoMaterial>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM tipo_material ORDER BY id_tipo_material",
            TIPO_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tipos = stmt
            .query_map([], map_tipo_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tipos)
    }

    /// Deletes a type; its materials go with it (ON DELETE CASCADE).
    /// Returns false when nothing was deleted.
    pub fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM tipo_material WHERE id_tipo_material = ?1",
            params![id],
        )?;
        Ok(affected > 0)
    }

    pub fn count_materials(&self, id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        count_materials(&conn, id)
    }
}

// ==========================================
// Connection-level helpers (shared with MaterialRepository
// so composite writes run in one transaction)
// ==========================================

pub(crate) fn insert_tipo(conn: &Connection, tipo: &TipoMaterial) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO tipo_material (
            titulo, headers_base, headers_atributes, order_headers,
            total_costo_unitario, total_costo_total, total_usd, valor_dolar,
            total_cantidad, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            tipo.titulo,
            serde_json::to_string(&tipo.headers_base)?,
            serde_json::to_string(&tipo.headers_atributes)?,
            serde_json::to_string(&tipo.order_headers)?,
            tipo.total_costo_unitario,
            tipo.total_costo_total,
            tipo.total_usd,
            tipo.valor_dolar,
            serde_json::to_string(&tipo.total_cantidad)?,
            tipo.created_at.to_rfc3339(),
            tipo.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn update_tipo(conn: &Connection, tipo: &TipoMaterial) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"
        UPDATE tipo_material SET
            titulo = ?2, headers_base = ?3, headers_atributes = ?4, order_headers = ?5,
            total_costo_unitario = ?6, total_costo_total = ?7, total_usd = ?8,
            valor_dolar = ?9, total_cantidad = ?10, updated_at = ?11
        WHERE id_tipo_material = ?1
        "#,
        params![
            tipo.id_tipo_material,
            tipo.titulo,
            serde_json::to_string(&tipo.headers_base)?,
            serde_json::to_string(&tipo.headers_atributes)?,
            serde_json::to_string(&tipo.order_headers)?,
            tipo.total_costo_unitario,
            tipo.total_costo_total,
            tipo.total_usd,
            tipo.valor_dolar,
            serde_json::to_string(&tipo.total_cantidad)?,
            tipo.updated_at.to_rfc3339(),
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::not_found("TipoMaterial", tipo.id_tipo_material));
    }
    Ok(())
}

pub(crate) fn select_tipo(conn: &Connection, id: i64) -> RepositoryResult<Option<TipoMaterial>> {
    let sql = format!(
        "SELECT {} FROM tipo_material WHERE id_tipo_material = ?1",
        TIPO_COLUMNS
    );
    let result = conn.query_row(&sql, params![id], map_tipo_row);

    match result {
        Ok(tipo) => Ok(Some(tipo)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn count_materials(conn: &Connection, id: i64) -> RepositoryResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM material WHERE id_tipo_material = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Global repricing step: every type gets the new dollar value
pub(crate) fn reprice_all(conn: &Connection, valor_dolar: f64) -> RepositoryResult<usize> {
    let affected = conn.execute(
        r#"
        UPDATE tipo_material SET
            valor_dolar = ?1,
            total_usd = total_costo_total * ?1,
            updated_at = ?2
        "#,
        params![valor_dolar, Utc::now().to_rfc3339()],
    )?;
    info!(valor_dolar, tipos = affected, "valor del dólar actualizado en todos los tipos");
    Ok(affected)
}

fn map_tipo_row(row: &Row<'_>) -> rusqlite::Result<TipoMaterial> {
    Ok(TipoMaterial {
        id_tipo_material: row.get(0)?,
        titulo: row.get(1)?,
        headers_base: json_column(row, 2)?,
        headers_atributes: json_column(row, 3)?,
        order_headers: json_column(row, 4)?,
        total_costo_unitario: row.get(5)?,
        total_costo_total: row.get(6)?,
        total_usd: row.get(7)?,
        valor_dolar: row.get(8)?,
        total_cantidad: json_column(row, 9)?,
        created_at: timestamp_column(row, 10)?,
        updated_at: timestamp_column(row, 11)?,
    })
}

/// Deserializes a JSON text column
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// RFC 3339 text column; unparseable values fall back to now
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(row
        .get::<_, String>(idx)?
        .parse::<DateTime<Utc>>()
        .unwrap_or_else(|_| Utc::now()))
}
