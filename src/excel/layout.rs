// ==========================================
// Materiales Costing - Sheet layout
// ==========================================
// Fixed positions shared by exporter and importer.
// All indices are 0-based (row 0 = sheet row 1).
// ==========================================

pub const TITLE_ROW: u32 = 0;
pub const HEADER_ROW: u32 = 1;
pub const FIRST_DATA_ROW: u32 = 2;

/// Rows scanned for totals panel labels
pub const TOTALS_SCAN_ROWS: u32 = 40;

pub const LABEL_COSTO_UNITARIO: &str = "Costo Unitario";
pub const LABEL_COSTO_TOTAL: &str = "Costo Total";
pub const LABEL_TOTAL_CANTIDADES: &str = "Total costo cantidades";
pub const LABEL_TOTAL_USD: &str = "Total USD";
pub const LABEL_VALOR_DOLAR: &str = "Valor del dólar:";

/// Column positions derived from the width of the data table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    /// Number of data columns
    pub columns: u16,
}

impl SheetLayout {
    pub fn new(columns: u16) -> Self {
        Self { columns }
    }

    pub fn totals_label_col(&self) -> u16 {
        self.columns + 2
    }

    pub fn totals_value_col(&self) -> u16 {
        self.columns + 3
    }

    pub fn dollar_label_col(&self) -> u16 {
        self.columns + 4
    }

    pub fn dollar_value_col(&self) -> u16 {
        self.columns + 5
    }
}

/// Label comparison key (trim + lowercase, trailing ':' ignored)
pub fn label_key(label: &str) -> String {
    label.trim().trim_end_matches(':').trim().to_lowercase()
}
