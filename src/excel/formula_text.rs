// ==========================================
// Materiales Costing - Calculo to spreadsheet formula
// ==========================================
// Compiles the same Calculo model the evaluator runs into
// cell-reference formula text, so both share one operator
// table (OperationKind::symbol) and one chaining rule.
// ==========================================

use crate::domain::header::{Calculo, Operacion};
use crate::domain::types::HeaderKey;
use std::collections::HashMap;

/// 0-based column index to letters (0 -> "A", 26 -> "AA")
pub fn column_letter(col: u16) -> String {
    let mut n = col as u32 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// 0-based (col, row) to an A1 reference
pub fn cell_ref(col: u16, row: u32) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// A1 range over one column
pub fn column_range(col: u16, first_row: u32, last_row: u32) -> String {
    format!("{}:{}", cell_ref(col, first_row), cell_ref(col, last_row))
}

/// Formula text for `calculo` on sheet row `row`, or `None` when no
/// operation references anything.
///
/// Headers without a column (inactive) contribute a literal 0, the same
/// value the evaluator resolves for them.
pub fn compile_calculo(
    calculo: &Calculo,
    columns: &HashMap<HeaderKey, u16>,
    row: u32,
) -> Option<String> {
    if !calculo.activo {
        return None;
    }

    let mut acc: Option<String> = None;
    for op in calculo.effective_operations() {
        let Some(expr) = compile_operation(op, columns, row) else {
            continue;
        };
        acc = Some(match acc {
            None => expr,
            Some(prev) => format!("({}){}({})", prev, op.tipo.symbol(), expr),
        });
    }
    acc.map(|body| format!("={}", body))
}

fn compile_operation(op: &Operacion, columns: &HashMap<HeaderKey, u16>, row: u32) -> Option<String> {
    let operands: Vec<String> = op
        .references()
        .map(|key| match columns.get(&key) {
            Some(col) => cell_ref(*col, row),
            None => "0".to_string(),
        })
        .collect();
    if operands.is_empty() {
        return None;
    }
    Some(operands.join(&op.tipo.symbol().to_string()))
}
