// ==========================================
// Materiales Costing - Excel importer
// ==========================================
// Reads an exported (or compatible) workbook back into
// Material rows plus the totals panel and dollar value.
// Columns are matched by normalized header title, so their
// order may differ from the current schema.
// Persistence (the transactional replace) lives in the API.
// ==========================================

use crate::domain::header::HeaderSpec;
use crate::domain::material::{format_number, Material, MaterialAtributo};
use crate::domain::tipo_material::TipoMaterial;
use crate::domain::types::{BaseHeaderId, HeaderKind};
use crate::engine::numeric::parse_number_lenient;
use crate::engine::schema::{normalize_title, ordered_headers};
use crate::excel::error::{ExcelError, ExcelResult};
use crate::excel::layout::{
    label_key, SheetLayout, FIRST_DATA_ROW, HEADER_ROW, LABEL_COSTO_TOTAL, LABEL_COSTO_UNITARIO,
    LABEL_TOTAL_USD, LABEL_VALOR_DOLAR, TITLE_ROW, TOTALS_SCAN_ROWS,
};
use calamine::{Data, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, instrument, warn};

/// Default run of consecutive empty rows that ends the scan
pub const DEFAULT_EMPTY_ROW_RUN: u32 = 5;

/// Values read from the totals panel; `None` when the label is absent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTotals {
    pub total_costo_unitario: Option<f64>,
    pub total_costo_total: Option<f64>,
    pub total_usd: Option<f64>,
}

/// Parsed workbook content
#[derive(Debug, Clone)]
pub struct ParsedWorkbook {
    pub materials: Vec<Material>,
    pub totals: SheetTotals,
    pub valor_dolar: Option<f64>,
    /// Sheet rows (1-based) skipped for lacking a detail value
    pub skipped_rows: Vec<u32>,
}

// ==========================================
// ExcelImporter
// ==========================================
pub struct ExcelImporter {
    empty_row_run: u32,
}

impl Default for ExcelImporter {
    fn default() -> Self {
        Self::new(DEFAULT_EMPTY_ROW_RUN)
    }
}

impl ExcelImporter {
    pub fn new(empty_row_run: u32) -> Self {
        Self {
            empty_row_run: empty_row_run.max(1),
        }
    }

    /// Parses the first worksheet of `bytes` against the schema of `tipo`
    #[instrument(skip(self, tipo, bytes), fields(tipo_id = tipo.id_tipo_material, bytes = bytes.len()))]
    pub fn parse(&self, tipo: &TipoMaterial, bytes: &[u8]) -> ExcelResult<ParsedWorkbook> {
        let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ExcelError::Read("el archivo no contiene hojas".to_string()))??;

        let table_width = table_width(&range);
        let matched = match_columns(tipo, &range, table_width);
        if matched.is_empty() {
            return Err(ExcelError::MissingHeaders);
        }
        debug!(columnas = matched.len(), "encabezados reconocidos");

        let (materials, skipped_rows) = self.read_rows(tipo, &range, &matched);
        if materials.is_empty() {
            return Err(ExcelError::NoMaterials);
        }

        let layout = SheetLayout::new(table_width);
        let totals = read_totals(&range, layout);
        let valor_dolar = read_valor_dolar(&range, layout);

        Ok(ParsedWorkbook {
            materials,
            totals,
            valor_dolar,
            skipped_rows,
        })
    }

    fn read_rows(
        &self,
        tipo: &TipoMaterial,
        range: &Range<Data>,
        matched: &[(u32, HeaderSpec)],
    ) -> (Vec<Material>, Vec<u32>) {
        let last_row = range.end().map(|(r, _)| r).unwrap_or(0);
        let mut materials = Vec::new();
        let mut skipped = Vec::new();
        let mut empty_run = 0u32;

        for row in FIRST_DATA_ROW..=last_row {
            // Pre-populated formula cells are not data
            let is_empty = matched
                .iter()
                .filter(|(_, spec)| !spec.has_formula())
                .all(|(col, _)| cell_text(range, row, *col).is_empty());
            if is_empty {
                empty_run += 1;
                if empty_run >= self.empty_row_run {
                    break;
                }
                continue;
            }
            empty_run = 0;

            match build_material(tipo, range, matched, row) {
                Some(material) => materials.push(material),
                None => {
                    warn!(fila = row + 1, "fila sin detalle, se omite");
                    skipped.push(row + 1);
                }
            }
        }
        (materials, skipped)
    }
}

/// Width of the data table: consecutive non-empty header cells from column A
fn table_width(range: &Range<Data>) -> u16 {
    let mut width = 0u16;
    while !cell_text(range, HEADER_ROW, width as u32).is_empty() {
        width += 1;
    }
    width
}

/// Header columns matched to active headers by normalized title
fn match_columns(tipo: &TipoMaterial, range: &Range<Data>, width: u16) -> Vec<(u32, HeaderSpec)> {
    let by_title: HashMap<String, HeaderSpec> = ordered_headers(tipo)
        .into_iter()
        .map(|spec| (normalize_title(&spec.titulo), spec))
        .collect();

    let mut matched = Vec::new();
    for col in 0..width as u32 {
        let title = normalize_title(&cell_text(range, HEADER_ROW, col));
        match by_title.get(&title) {
            Some(spec) if !matched.iter().any(|(_, s): &(u32, HeaderSpec)| s.key() == spec.key()) => {
                matched.push((col, spec.clone()));
            }
            Some(_) => {}
            None => debug!(columna = col + 1, titulo = %title, "columna sin header, se ignora"),
        }
    }
    matched
}

/// Material from one sheet row; `None` when the detail cell is empty
fn build_material(
    tipo: &TipoMaterial,
    range: &Range<Data>,
    matched: &[(u32, HeaderSpec)],
    row: u32,
) -> Option<Material> {
    let mut material = Material::new(tipo.id_tipo_material);
    let mut atributos: HashMap<i64, String> = HashMap::new();

    for (col, spec) in matched {
        let text = cell_text(range, row, *col);
        match spec.kind {
            HeaderKind::Base => match spec.base_identity() {
                Some(BaseHeaderId::Detail) => material.detalle = non_empty(text),
                Some(BaseHeaderId::Unit) => material.unidad = non_empty(text),
                Some(BaseHeaderId::Quantity) => material.cantidad = non_empty(text),
                Some(BaseHeaderId::UnitCost) => {
                    material.costo_unitario = cell_number(range, row, *col).unwrap_or(0.0)
                }
                Some(BaseHeaderId::TotalCost) => {
                    material.costo_total = cell_number(range, row, *col).unwrap_or(0.0)
                }
                None => {}
            },
            HeaderKind::Atribute => {
                atributos.insert(spec.id, text);
            }
        }
    }

    material.detalle.as_ref()?;

    material.atributos = tipo
        .headers_atributes
        .iter()
        .map(|h| {
            let value = atributos.remove(&h.id_header_atribute).unwrap_or_default();
            MaterialAtributo::new(h.id_header_atribute, value)
        })
        .collect();
    Some(material)
}

/// Totals panel values by label; the value sits right of its label.
/// The quantity total is not read: it is recomputed from the rows.
fn read_totals(range: &Range<Data>, layout: SheetLayout) -> SheetTotals {
    let mut totals = SheetTotals::default();
    let last_col = range.end().map(|(_, c)| c).unwrap_or(0);
    let first_col = layout.columns as u32;

    for row in HEADER_ROW..TOTALS_SCAN_ROWS {
        for col in first_col..last_col {
            let label = label_key(&cell_text(range, row, col));
            let slot = if label == label_key(LABEL_COSTO_UNITARIO) {
                &mut totals.total_costo_unitario
            } else if label == label_key(LABEL_COSTO_TOTAL) {
                &mut totals.total_costo_total
            } else if label == label_key(LABEL_TOTAL_USD) {
                &mut totals.total_usd
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = cell_number(range, row, col + 1);
            }
        }
    }
    totals
}

/// Dollar value: the cell right of the "Valor del dólar" label on row 1,
/// else the fixed offset cell
fn read_valor_dolar(range: &Range<Data>, layout: SheetLayout) -> Option<f64> {
    let last_col = range.end().map(|(_, c)| c).unwrap_or(0);
    let wanted = label_key(LABEL_VALOR_DOLAR);
    (0..last_col)
        .find(|col| label_key(&cell_text(range, TITLE_ROW, *col)) == wanted)
        .and_then(|col| cell_number(range, TITLE_ROW, col + 1))
        .or_else(|| cell_number(range, TITLE_ROW, layout.dollar_value_col() as u32))
}

// ==========================================
// Cell helpers
// ==========================================

/// Cell content as trimmed text; numbers use the canonical form ("10", "2.5")
fn cell_text(range: &Range<Data>, row: u32, col: u32) -> String {
    match range.get_value((row, col)) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Float(f)) => format_number(*f),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Bool(b)) => b.to_string(),
        Some(Data::Error(_)) => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// Numeric cell content; text falls back to a lenient parse
fn cell_number(range: &Range<Data>, row: u32, col: u32) -> Option<f64> {
    match range.get_value((row, col))? {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) if !s.trim().is_empty() => Some(parse_number_lenient(s)),
        Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
