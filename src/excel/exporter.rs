// ==========================================
// Materiales Costing - Excel exporter
// ==========================================
// Renders a TipoMaterial and its materials as an .xlsx:
// row 1 merged title, row 2 headers in display order,
// rows 3.. one material per row. Formula headers become live
// spreadsheet formulas; a totals panel and the dollar cell
// sit to the right of the table.
// ==========================================

use crate::domain::header::HeaderSpec;
use crate::domain::material::{format_number, Material};
use crate::domain::tipo_material::TipoMaterial;
use crate::domain::types::{BaseHeaderId, HeaderKey, HeaderKind};
use crate::engine::formula::FormulaEvaluator;
use crate::engine::numeric::{base_value_to_number, parse_number, Blank};
use crate::engine::schema::ordered_headers;
use crate::excel::error::{ExcelError, ExcelResult};
use crate::excel::formula_text::{cell_ref, column_range, compile_calculo};
use crate::excel::layout::{
    SheetLayout, FIRST_DATA_ROW, HEADER_ROW, LABEL_COSTO_TOTAL, LABEL_COSTO_UNITARIO,
    LABEL_TOTAL_CANTIDADES, LABEL_TOTAL_USD, LABEL_VALOR_DOLAR, TITLE_ROW,
};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Formula, Workbook, Worksheet};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Default last sheet row (1-based) with pre-populated formulas
pub const DEFAULT_FORMULA_ROWS: u32 = 1000;

struct Formats {
    title: Format,
    header: Format,
    text: Format,
    number: Format,
    formula: Format,
    panel_label: Format,
    panel_value: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center)
                .set_background_color(Color::RGB(0xE0F2FE))
                .set_border(FormatBorder::Thin),
            header: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_background_color(Color::RGB(0xBAE6FD))
                .set_border(FormatBorder::Thin),
            text: Format::new().set_border(FormatBorder::Thin),
            number: Format::new()
                .set_num_format("#,##0.00")
                .set_border(FormatBorder::Thin),
            formula: Format::new()
                .set_num_format("#,##0.00")
                .set_background_color(Color::RGB(0xF1F5F9))
                .set_border(FormatBorder::Thin),
            panel_label: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xFEF3C7))
                .set_border(FormatBorder::Thin),
            panel_value: Format::new()
                .set_num_format("#,##0.00")
                .set_border(FormatBorder::Thin),
        }
    }
}

// ==========================================
// ExcelExporter
// ==========================================
pub struct ExcelExporter {
    /// Last sheet row (1-based) that receives pre-populated formulas
    formula_rows: u32,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self::new(DEFAULT_FORMULA_ROWS)
    }
}

impl ExcelExporter {
    pub fn new(formula_rows: u32) -> Self {
        Self { formula_rows }
    }

    /// Workbook bytes for `tipo` and its `materials`
    #[instrument(skip(self, tipo, materials), fields(tipo_id = tipo.id_tipo_material, rows = materials.len()))]
    pub fn export(&self, tipo: &TipoMaterial, materials: &[Material]) -> ExcelResult<Vec<u8>> {
        let headers = ordered_headers(tipo);
        if headers.is_empty() {
            return Err(ExcelError::MissingHeaders);
        }
        let columns: HashMap<HeaderKey, u16> = headers
            .iter()
            .enumerate()
            .map(|(idx, spec)| (spec.key(), idx as u16))
            .collect();
        let layout = SheetLayout::new(headers.len() as u16);
        let formats = Formats::new();
        // Formula rows and SUM ranges end at the configured row or the last
        // material, whichever is further down
        let last_material_row = (FIRST_DATA_ROW + materials.len() as u32).saturating_sub(1);
        let last_row = self
            .formula_rows
            .saturating_sub(1)
            .max(last_material_row)
            .max(FIRST_DATA_ROW);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&tipo.titulo))?;

        write_title(worksheet, tipo, &headers, &formats)?;
        for (col, spec) in headers.iter().enumerate() {
            worksheet.write_string_with_format(HEADER_ROW, col as u16, &spec.titulo, &formats.header)?;
        }

        // Imported rows may carry text in numeric columns
        let evaluator = FormulaEvaluator::lenient(tipo);
        let mut sums: HashMap<u16, f64> = HashMap::new();
        for (idx, material) in materials.iter().enumerate() {
            let row = FIRST_DATA_ROW + idx as u32;
            for (col, spec) in headers.iter().enumerate() {
                let col = col as u16;
                let written =
                    write_material_cell(worksheet, &evaluator, spec, material, &columns, row, col, &formats)?;
                if let Some(value) = written {
                    *sums.entry(col).or_insert(0.0) += value;
                }
            }
        }

        // Formula columns stay live for rows added by hand
        for row in (FIRST_DATA_ROW + materials.len() as u32)..=last_row {
            for (col, spec) in headers.iter().enumerate() {
                if let Some(text) = compile_calculo(&spec.calculo, &columns, row) {
                    worksheet.write_formula_with_format(row, col as u16, Formula::new(text), &formats.formula)?;
                }
            }
        }

        write_totals_panel(worksheet, tipo, &headers, &columns, &sums, layout, last_row, &formats)?;

        worksheet.autofit();
        let buffer = workbook.save_to_buffer()?;
        debug!(bytes = buffer.len(), "excel generado");
        Ok(buffer)
    }
}

fn write_title(
    worksheet: &mut Worksheet,
    tipo: &TipoMaterial,
    headers: &[HeaderSpec],
    formats: &Formats,
) -> ExcelResult<()> {
    let last_col = headers.len() as u16 - 1;
    if last_col > 0 {
        worksheet.merge_range(TITLE_ROW, 0, TITLE_ROW, last_col, &tipo.titulo, &formats.title)?;
    } else {
        worksheet.write_string_with_format(TITLE_ROW, 0, &tipo.titulo, &formats.title)?;
    }
    Ok(())
}

/// Writes one cell of a material row; returns the numeric value written
#[allow(clippy::too_many_arguments)]
fn write_material_cell(
    worksheet: &mut Worksheet,
    evaluator: &FormulaEvaluator<'_>,
    spec: &HeaderSpec,
    material: &Material,
    columns: &HashMap<HeaderKey, u16>,
    row: u32,
    col: u16,
    formats: &Formats,
) -> ExcelResult<Option<f64>> {
    if let Some(text) = compile_calculo(&spec.calculo, columns, row) {
        let value = evaluator.evaluate_header(spec.key(), material)?.unwrap_or(0.0);
        let formula = Formula::new(text).set_result(format_number(value));
        worksheet.write_formula_with_format(row, col, formula, &formats.formula)?;
        return Ok(Some(value));
    }

    match spec.kind {
        HeaderKind::Base => match spec.base_identity() {
            Some(id @ (BaseHeaderId::UnitCost | BaseHeaderId::TotalCost)) => {
                let value = base_value_to_number(&material.base_value(id), &spec.titulo, Blank::Zero)?;
                worksheet.write_number_with_format(row, col, value, &formats.number)?;
                Ok(Some(value))
            }
            Some(BaseHeaderId::Quantity) => {
                write_text_or_number(worksheet, material.cantidad.as_deref(), row, col, formats, true)
            }
            Some(BaseHeaderId::Detail) => {
                write_text_or_number(worksheet, material.detalle.as_deref(), row, col, formats, false)
            }
            Some(BaseHeaderId::Unit) => {
                write_text_or_number(worksheet, material.unidad.as_deref(), row, col, formats, false)
            }
            None => Ok(None),
        },
        HeaderKind::Atribute => write_text_or_number(
            worksheet,
            material.attribute_value(spec.id),
            row,
            col,
            formats,
            spec.numeric_hint(),
        ),
    }
}

/// Numeric columns write parseable values as numbers; anything else is
/// written verbatim so it reads back unchanged
fn write_text_or_number(
    worksheet: &mut Worksheet,
    value: Option<&str>,
    row: u32,
    col: u16,
    formats: &Formats,
    numeric: bool,
) -> ExcelResult<Option<f64>> {
    let text = value.unwrap_or("").trim();
    if text.is_empty() {
        worksheet.write_blank(row, col, &formats.text)?;
        return Ok(None);
    }
    if numeric {
        if let Ok(number) = parse_number(Some(text), "", Blank::Zero) {
            worksheet.write_number_with_format(row, col, number, &formats.number)?;
            return Ok(Some(number));
        }
    }
    worksheet.write_string_with_format(row, col, text, &formats.text)?;
    Ok(None)
}

/// Side panel: cost sums, one SUM per quantity column, combined quantity
/// total (only with 2+ quantity columns), dollar value and Total USD
#[allow(clippy::too_many_arguments)]
fn write_totals_panel(
    worksheet: &mut Worksheet,
    tipo: &TipoMaterial,
    headers: &[HeaderSpec],
    columns: &HashMap<HeaderKey, u16>,
    sums: &HashMap<u16, f64>,
    layout: SheetLayout,
    last_row: u32,
    formats: &Formats,
) -> ExcelResult<()> {
    let label_col = layout.totals_label_col();
    let value_col = layout.totals_value_col();

    worksheet.merge_range(
        HEADER_ROW,
        label_col,
        HEADER_ROW,
        value_col,
        &format!("Totales de {}", tipo.titulo),
        &formats.header,
    )?;

    let mut row = FIRST_DATA_ROW;
    let mut write_sum = |worksheet: &mut Worksheet, label: &str, col: u16| -> ExcelResult<(String, f64)> {
        let total = sums.get(&col).copied().unwrap_or(0.0);
        let formula = Formula::new(format!("=SUM({})", column_range(col, FIRST_DATA_ROW, last_row)))
            .set_result(format_number(total));
        worksheet.write_string_with_format(row, label_col, label, &formats.panel_label)?;
        worksheet.write_formula_with_format(row, value_col, formula, &formats.panel_value)?;
        let cell = cell_ref(value_col, row);
        row += 1;
        Ok((cell, total))
    };

    if let Some(col) = columns.get(&BaseHeaderId::UnitCost.key()) {
        write_sum(worksheet, LABEL_COSTO_UNITARIO, *col)?;
    }
    let costo_total = match columns.get(&BaseHeaderId::TotalCost.key()) {
        Some(col) => Some(write_sum(worksheet, LABEL_COSTO_TOTAL, *col)?),
        None => None,
    };

    let mut quantity_cells = Vec::new();
    for spec in headers.iter().filter(|s| is_quantity_column(tipo, s)) {
        if let Some(col) = columns.get(&spec.key()) {
            quantity_cells.push(write_sum(worksheet, &spec.titulo, *col)?);
        }
    }

    if quantity_cells.len() > 1 {
        let refs: Vec<&str> = quantity_cells.iter().map(|(cell, _)| cell.as_str()).collect();
        let total: f64 = quantity_cells.iter().map(|(_, value)| value).sum();
        let formula = Formula::new(format!("={}", refs.join("+"))).set_result(format_number(total));
        worksheet.write_string_with_format(row, label_col, LABEL_TOTAL_CANTIDADES, &formats.panel_label)?;
        worksheet.write_formula_with_format(row, value_col, formula, &formats.panel_value)?;
        row += 1;
    }

    let dollar_cell = cell_ref(layout.dollar_value_col(), TITLE_ROW);
    worksheet.write_string_with_format(TITLE_ROW, layout.dollar_label_col(), LABEL_VALOR_DOLAR, &formats.panel_label)?;
    worksheet.write_number_with_format(TITLE_ROW, layout.dollar_value_col(), tipo.valor_dolar, &formats.panel_value)?;

    if let Some((total_cell, total)) = costo_total {
        let formula = Formula::new(format!("={}*{}", total_cell, dollar_cell))
            .set_result(format_number(total * tipo.valor_dolar));
        worksheet.write_string_with_format(row, label_col, LABEL_TOTAL_USD, &formats.panel_label)?;
        worksheet.write_formula_with_format(row, value_col, formula, &formats.panel_value)?;
    }
    Ok(())
}

/// Worksheet name: type title without characters Excel rejects, at most 31 chars
pub fn sheet_name(titulo: &str) -> String {
    let cleaned: String = titulo
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Materiales".to_string()
    } else {
        cleaned
    }
}

/// Download filename `<titulo>.xlsx` with path-hostile characters replaced
pub fn export_filename(titulo: &str) -> String {
    let stem: String = titulo
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "materiales.xlsx".to_string()
    } else {
        format!("{}.xlsx", stem)
    }
}

/// Base Quantity plus quantity-flagged attributes
fn is_quantity_column(tipo: &TipoMaterial, spec: &HeaderSpec) -> bool {
    match spec.kind {
        HeaderKind::Base => spec.base_identity() == Some(BaseHeaderId::Quantity),
        HeaderKind::Atribute => tipo
            .attribute_header(spec.id)
            .map(|h| h.is_quantity_tracked())
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::header::HeaderAtributoInput;
    use crate::domain::material::MaterialAtributo;
    use crate::domain::tipo_material::TipoMaterialCreate;
    use crate::engine::formula::apply_formulas;
    use crate::engine::schema::build_tipo_material;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn cables() -> (TipoMaterial, Vec<Material>) {
        let mut metros = HeaderAtributoInput::new("Metros");
        metros.is_cantidad = true;
        let payload = TipoMaterialCreate {
            titulo: "Cables".to_string(),
            headers_base_active: Some(vec![2, 3]),
            headers_atributes: Some(vec![HeaderAtributoInput::new("Voltaje"), metros]),
            valor_dolar: Some(1000.0),
            ..Default::default()
        };
        let tipo = build_tipo_material(&payload, 1.0).unwrap();

        let mut material = Material::new(1);
        material.detalle = Some("Cable 2x1.5".to_string());
        material.unidad = Some("rollo".to_string());
        material.cantidad = Some("3".to_string());
        material.costo_unitario = 12.5;
        material.atributos = vec![MaterialAtributo::new(1, "220"), MaterialAtributo::new(2, "100")];
        apply_formulas(&tipo, &mut material).unwrap();
        (tipo, vec![material])
    }

    fn number_at(range: &calamine::Range<Data>, pos: (u32, u32)) -> Option<f64> {
        match range.get_value(pos)? {
            Data::Float(f) => Some(*f),
            Data::Int(i) => Some(*i as f64),
            Data::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn find_cell(range: &calamine::Range<Data>, text: &str) -> Option<(u32, u32)> {
        range
            .cells()
            .find(|(_, _, cell)| matches!(cell, Data::String(s) if s == text))
            .map(|(r, c, _)| (r as u32, c as u32))
    }

    #[test]
    fn test_export_layout() {
        let (tipo, materials) = cables();
        let bytes = ExcelExporter::new(20).export(&tipo, &materials).unwrap();

        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Cables".to_string()]);
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();

        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Cables".to_string())));
        let headers = ordered_headers(&tipo);
        for (col, spec) in headers.iter().enumerate() {
            assert_eq!(
                range.get_value((1, col as u32)),
                Some(&Data::String(spec.titulo.clone()))
            );
        }

        let total_col = headers.iter().position(|s| s.id == 5 && s.kind == HeaderKind::Base).unwrap();
        assert_eq!(number_at(&range, (2, total_col as u32)), Some(37.5));

        let n = headers.len() as u32;
        assert_eq!(find_cell(&range, LABEL_VALOR_DOLAR), Some((0, n + 4)));
        assert_eq!(number_at(&range, (0, n + 5)), Some(1000.0));
        assert_eq!(find_cell(&range, LABEL_TOTAL_CANTIDADES).map(|(_, c)| c), Some(n + 2));

        let (usd_row, _) = find_cell(&range, LABEL_TOTAL_USD).unwrap();
        assert_eq!(number_at(&range, (usd_row, n + 3)), Some(37500.0));
    }

    #[test]
    fn test_export_single_quantity_column_has_no_combined_row() {
        let payload = TipoMaterialCreate {
            titulo: "Arena".to_string(),
            headers_base_active: Some(vec![2]),
            ..Default::default()
        };
        let tipo = build_tipo_material(&payload, 1.0).unwrap();
        let bytes = ExcelExporter::default().export(&tipo, &[]).unwrap();

        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert!(find_cell(&range, LABEL_TOTAL_CANTIDADES).is_none());
        assert!(find_cell(&range, LABEL_COSTO_TOTAL).is_some());
    }

    #[test]
    fn test_sum_ranges_end_at_last_material_when_rows_exceed_formula_rows() {
        let (tipo, template) = cables();
        let materials: Vec<Material> = (0..4).map(|_| template[0].clone()).collect();
        let bytes = ExcelExporter::new(3).export(&tipo, &materials).unwrap();

        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let formulas = workbook.worksheet_formula("Cables").unwrap();

        let headers = ordered_headers(&tipo);
        let n = headers.len() as u32;
        let total_col = headers.iter().position(|s| s.id == 5 && s.kind == HeaderKind::Base).unwrap();

        let (row, _) = find_cell(&range, LABEL_COSTO_TOTAL).unwrap();
        let sum = formulas.get_value((row, n + 3)).cloned().unwrap_or_default();
        assert_eq!(sum, format!("SUM({})", column_range(total_col as u16, FIRST_DATA_ROW, 5)));
        assert_eq!(number_at(&range, (row, n + 3)), Some(150.0));

        // No pre-populated formula row after the fourth material
        let below = formulas.get_value((6, total_col as u32)).cloned().unwrap_or_default();
        assert!(below.is_empty());
    }

    #[test]
    fn test_sheet_and_file_names() {
        assert_eq!(sheet_name("Caños [PVC]: 1/2"), "Caños PVC 12");
        assert_eq!(sheet_name("???"), "Materiales");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(export_filename("Cables 2/3"), "Cables 2_3.xlsx");
        assert_eq!(export_filename("  "), "materiales.xlsx");
    }
}
