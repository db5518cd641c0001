// ==========================================
// Materiales Costing - Formula evaluator
// ==========================================
// Computes header values of one material row from the header
// Calculo definitions. Resolution is memoized per row and
// cycle-guarded: re-entering a header still being resolved
// yields no value instead of recursing.
// Lenient coercion (spreadsheet rows): unparseable operands
// count as 0 and a zero divisor yields 0.
// ==========================================

use crate::domain::header::{Calculo, Operacion};
use crate::domain::material::{format_number, BaseValue, Material};
use crate::domain::tipo_material::TipoMaterial;
use crate::domain::types::{HeaderKey, HeaderKind, OperationKind};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::numeric::{base_value_to_number, parse_number, parse_number_lenient, Blank};
use std::collections::{HashMap, HashSet};
use tracing::{instrument, trace};

// ==========================================
// RowContext - per-row resolution state
// ==========================================
/// Discarded after the row; never shared across rows
#[derive(Debug, Default)]
pub struct RowContext {
    memo: HashMap<HeaderKey, Option<f64>>,
    visiting: HashSet<HeaderKey>,
}

impl RowContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Non-numeric operands and zero divisors are errors
    Strict,
    /// Non-numeric operands count as 0.0, zero divisors yield 0.0
    Lenient,
}

// ==========================================
// FormulaEvaluator
// ==========================================
pub struct FormulaEvaluator<'a> {
    tipo: &'a TipoMaterial,
    coercion: Coercion,
}

impl<'a> FormulaEvaluator<'a> {
    pub fn new(tipo: &'a TipoMaterial) -> Self {
        Self {
            tipo,
            coercion: Coercion::Strict,
        }
    }

    /// Evaluator for imported spreadsheet rows
    pub fn lenient(tipo: &'a TipoMaterial) -> Self {
        Self {
            tipo,
            coercion: Coercion::Lenient,
        }
    }

    /// Value of one header for `row` with a fresh row context
    pub fn evaluate_header(&self, key: HeaderKey, row: &Material) -> EngineResult<Option<f64>> {
        self.resolve(key, row, &mut RowContext::new())
    }

    /// Raw or computed value of `key`.
    ///
    /// Returns `Ok(None)` only when `key` is already being resolved higher up
    /// the chain.
    pub fn resolve(
        &self,
        key: HeaderKey,
        row: &Material,
        ctx: &mut RowContext,
    ) -> EngineResult<Option<f64>> {
        if let Some(value) = ctx.memo.get(&key) {
            return Ok(*value);
        }
        if ctx.visiting.contains(&key) {
            trace!(header = %key, "ciclo detectado, se resuelve como vacío");
            return Ok(None);
        }

        ctx.visiting.insert(key);
        let result = self.resolve_uncached(key, row, ctx);
        ctx.visiting.remove(&key);

        let value = result?;
        ctx.memo.insert(key, value);
        Ok(value)
    }

    fn resolve_uncached(
        &self,
        key: HeaderKey,
        row: &Material,
        ctx: &mut RowContext,
    ) -> EngineResult<Option<f64>> {
        let not_found = || EngineError::HeaderNotFound {
            kind: key.kind,
            id: key.id,
        };

        match key.kind {
            HeaderKind::Base => {
                let header = self
                    .tipo
                    .headers_base
                    .iter()
                    .find(|h| h.id_header_base == key.id)
                    .ok_or_else(not_found)?;
                let id = header.identity().ok_or_else(not_found)?;

                if header.calculo.activo {
                    if let Some(value) = self.compute(&header.calculo, row, ctx)? {
                        return Ok(Some(value));
                    }
                }
                let value = row.base_value(id);
                match (self.coercion, &value) {
                    (Coercion::Lenient, BaseValue::Text(text)) => {
                        Ok(Some(parse_number_lenient(text)))
                    }
                    _ => base_value_to_number(&value, &header.titulo, Blank::Zero).map(Some),
                }
            }
            HeaderKind::Atribute => {
                let header = self.tipo.attribute_header(key.id).ok_or_else(not_found)?;

                if header.calculo.activo {
                    if let Some(value) = self.compute(&header.calculo, row, ctx)? {
                        return Ok(Some(value));
                    }
                }
                let raw = row.attribute_value(key.id);
                match self.coercion {
                    Coercion::Lenient => Ok(Some(raw.map(parse_number_lenient).unwrap_or(0.0))),
                    Coercion::Strict => parse_number(raw, &header.titulo, Blank::Zero).map(Some),
                }
            }
        }
    }

    /// Result of a formula, or `None` when no operation produced a value
    pub fn compute(
        &self,
        calculo: &Calculo,
        row: &Material,
        ctx: &mut RowContext,
    ) -> EngineResult<Option<f64>> {
        if !calculo.activo {
            return Ok(None);
        }

        let mut result: Option<f64> = None;
        for op in calculo.effective_operations() {
            let Some(value) = self.compute_operation(op, row, ctx)? else {
                continue;
            };
            result = Some(match result {
                None => value,
                Some(acc) => self.absorb(combine(op.tipo, acc, value))?,
            });
        }
        Ok(result)
    }

    fn compute_operation(
        &self,
        op: &Operacion,
        row: &Material,
        ctx: &mut RowContext,
    ) -> EngineResult<Option<f64>> {
        let mut values = Vec::new();
        for key in op.references() {
            values.push(self.resolve(key, row, ctx)?.unwrap_or(0.0));
        }
        self.absorb(fold_values(op.tipo, &values))
    }

    /// Lenient mode turns a zero divisor into 0.0
    fn absorb<T: From<f64>>(&self, result: EngineResult<T>) -> EngineResult<T> {
        match (self.coercion, result) {
            (Coercion::Lenient, Err(EngineError::DivisionByZero)) => {
                trace!("división por cero, se usa 0");
                Ok(T::from(0.0))
            }
            (_, result) => result,
        }
    }

    /// Formula result of one header, with the header itself marked as
    /// visiting. Agrees with `evaluate_header` whenever the formula yields
    /// a value.
    fn compute_header(
        &self,
        key: HeaderKey,
        calculo: &Calculo,
        row: &Material,
    ) -> EngineResult<Option<f64>> {
        let mut ctx = RowContext::new();
        ctx.visiting.insert(key);
        self.compute(calculo, row, &mut ctx)
    }

    /// Evaluates every active formula of the row and writes the results back:
    /// attribute headers first, then base headers.
    #[instrument(skip(self, material), fields(tipo_id = self.tipo.id_tipo_material))]
    pub fn apply(&self, material: &mut Material) -> EngineResult<()> {
        let snapshot = material.clone();

        let mut attribute_results = Vec::new();
        for header in self.tipo.headers_atributes.iter().filter(|h| h.calculo.activo) {
            if let Some(value) = self.compute_header(header.key(), &header.calculo, &snapshot)? {
                attribute_results.push((header.id_header_atribute, value));
            }
        }

        let mut base_results = Vec::new();
        for header in self
            .tipo
            .headers_base
            .iter()
            .filter(|h| h.active && h.calculo.activo)
        {
            let Some(id) = header.identity() else {
                continue;
            };
            if let Some(value) = self.compute_header(header.key(), &header.calculo, &snapshot)? {
                base_results.push((id, value));
            }
        }

        for (id, value) in attribute_results {
            material.set_attribute_value(id, format_number(value));
        }
        for (id, value) in base_results {
            material.set_base_number(id, value);
        }
        Ok(())
    }
}

/// Runs every active formula of `tipo` over `material`
pub fn apply_formulas(tipo: &TipoMaterial, material: &mut Material) -> EngineResult<()> {
    FormulaEvaluator::new(tipo).apply(material)
}

/// Lenient variant for imported spreadsheet rows
pub fn apply_formulas_lenient(tipo: &TipoMaterial, material: &mut Material) -> EngineResult<()> {
    FormulaEvaluator::lenient(tipo).apply(material)
}

/// Applies one operator to an ordered value list; empty lists yield `None`
pub fn fold_values(kind: OperationKind, values: &[f64]) -> EngineResult<Option<f64>> {
    let Some((first, rest)) = values.split_first() else {
        return Ok(None);
    };
    let mut acc = *first;
    for value in rest {
        acc = combine(kind, acc, *value)?;
    }
    Ok(Some(acc))
}

fn combine(kind: OperationKind, acc: f64, value: f64) -> EngineResult<f64> {
    match kind {
        OperationKind::Multiplicacion => Ok(acc * value),
        OperationKind::Division => {
            if value == 0.0 {
                Err(EngineError::DivisionByZero)
            } else {
                Ok(acc / value)
            }
        }
        OperationKind::Suma => Ok(acc + value),
        OperationKind::Resta => Ok(acc - value),
    }
}
