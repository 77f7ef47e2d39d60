//! Cell evaluation.
//!
//! A raw cell value is either a literal or a formula (text starting with `=`).
//! Literals are classified (numeric text becomes a number, `true`/`false`
//! become 1/0); formulas are upper-cased, parsed into an [`Expr`] tree and
//! walked. Nothing here returns an error to the caller: any parse or
//! evaluation failure becomes [`CellError::Error`], shown as `#ERROR!`.
//!
//! Bare references read the referenced cell's *raw* value through a
//! [`ReferenceResolver`]. The default [`RawValueResolver`] does not evaluate
//! referenced formulas (they read as 0); dependency-aware resolution can be
//! plugged in without touching the parser or the function code.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cell::{CellSource, CellValue, Row, SheetView};
use super::cell_ref::{CellRef, RangeRef};
use super::error::FormulaError;
use super::format::{format_number, format_value};
use super::parser::{Expr, Op, parse};
use super::range::{Criterion, sum_if, values_in};
use crate::builtins::{self, Aggregate, Builtin};

/// Error values a cell can evaluate to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellError {
    /// Any parse or evaluation failure.
    Error,
    /// A lookup found nothing.
    NotAvailable,
    /// A lookup or offset pointed outside its range or the grid.
    Ref,
}

impl CellError {
    pub fn code(self) -> &'static str {
        match self {
            CellError::Error => "#ERROR!",
            CellError::NotAvailable => "#N/A",
            CellError::Ref => "#REF!",
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The evaluated value of a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EvalValue {
    Null,
    Number(f64),
    Text(String),
    Error(CellError),
}

impl EvalValue {
    /// Numeric view of the value: numbers as-is, numeric text parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvalValue::Number(n) => Some(*n),
            EvalValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            EvalValue::Null | EvalValue::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EvalValue::Error(_))
    }

    /// True for Null and the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            EvalValue::Null => true,
            EvalValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self))
    }
}

/// Supplies the number a bare cell reference stands for.
pub trait ReferenceResolver {
    fn resolve_reference(&self, at: CellRef) -> f64;
}

/// Reads the referenced cell's raw value by its leading number: missing,
/// out-of-bounds, formula cells and text without a leading number resolve
/// to 0.
pub struct RawValueResolver<'a, S: CellSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: CellSource + ?Sized> RawValueResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        RawValueResolver { source }
    }
}

impl<S: CellSource + ?Sized> ReferenceResolver for RawValueResolver<'_, S> {
    fn resolve_reference(&self, at: CellRef) -> f64 {
        self.source
            .cell(at)
            .and_then(CellValue::leading_number)
            .unwrap_or(0.0)
    }
}

/// Evaluate a raw cell value against a grid given as rows plus column names.
pub fn evaluate_cell_value(value: &CellValue, rows: &[Row], columns: &[String]) -> EvalValue {
    evaluate_with(value, &SheetView::new(rows, columns))
}

/// Evaluate a raw cell value against any [`CellSource`].
pub fn evaluate_with<S: CellSource + ?Sized>(value: &CellValue, source: &S) -> EvalValue {
    evaluate_with_resolver(value, source, &RawValueResolver::new(source))
}

/// Evaluate with a custom reference resolver.
pub fn evaluate_with_resolver<S, R>(value: &CellValue, source: &S, resolver: &R) -> EvalValue
where
    S: CellSource + ?Sized,
    R: ReferenceResolver + ?Sized,
{
    match value.formula_body() {
        Some(body) => evaluate_formula(body, source, resolver),
        None => classify_literal(value),
    }
}

/// Classify a non-formula value.
///
/// Text becomes a number only if it prints back exactly as written (so `"42"`
/// is a number but `"042"` and `"4e1"` stay text).
pub fn classify_literal(value: &CellValue) -> EvalValue {
    match value {
        CellValue::Empty => EvalValue::Null,
        CellValue::Number(n) => EvalValue::Number(*n),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() && format_number(n) == trimmed {
                    return EvalValue::Number(n);
                }
            }
            if trimmed.eq_ignore_ascii_case("true") {
                EvalValue::Number(1.0)
            } else if trimmed.eq_ignore_ascii_case("false") {
                EvalValue::Number(0.0)
            } else {
                EvalValue::Text(s.clone())
            }
        }
    }
}

/// Round to 4 decimal places, halves towards positive infinity.
pub fn round4(n: f64) -> f64 {
    (n * 10_000.0 + 0.5).floor() / 10_000.0
}

fn evaluate_formula<S, R>(body: &str, source: &S, resolver: &R) -> EvalValue
where
    S: CellSource + ?Sized,
    R: ReferenceResolver + ?Sized,
{
    let body = body.trim().to_uppercase();
    let result = parse(&body).and_then(|expr| {
        let evaluator = Evaluator { source, resolver };
        evaluator.eval(&expr)
    });

    match result {
        Ok(Value::Number(n)) if n.is_finite() => EvalValue::Number(round4(n)),
        Ok(Value::Number(_)) => {
            log::debug!("formula ={} produced a non-finite result", body);
            EvalValue::Error(CellError::Error)
        }
        Ok(Value::Text(s)) => EvalValue::Text(s),
        Ok(Value::Error(e)) => EvalValue::Error(e),
        Err(e) => {
            log::debug!("formula ={} failed: {}", body, e);
            EvalValue::Error(CellError::Error)
        }
    }
}

/// Intermediate value while walking a formula.
#[derive(Clone, Debug, PartialEq)]
enum Value {
    Number(f64),
    Text(String),
    Error(CellError),
}

impl Value {
    fn into_number(self) -> Result<Result<f64, CellError>, FormulaError> {
        match self {
            Value::Number(n) => Ok(Ok(n)),
            Value::Error(e) => Ok(Err(e)),
            Value::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Ok(n)),
                Err(_) => Err(FormulaError::NotANumber(s)),
            },
        }
    }

    fn into_text(self) -> Result<String, CellError> {
        match self {
            Value::Number(n) => Ok(format_number(n)),
            Value::Text(s) => Ok(s),
            Value::Error(e) => Err(e),
        }
    }
}

impl From<EvalValue> for Value {
    fn from(value: EvalValue) -> Self {
        match value {
            EvalValue::Null => Value::Text(String::new()),
            EvalValue::Number(n) => Value::Number(n),
            EvalValue::Text(s) => Value::Text(s),
            EvalValue::Error(e) => Value::Error(e),
        }
    }
}

// Propagate a cell error value out of the current function.
macro_rules! try_cell {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(cell_error) => return Ok(Value::Error(cell_error)),
        }
    };
}

struct Evaluator<'a, S: ?Sized, R: ?Sized> {
    source: &'a S,
    resolver: &'a R,
}

impl<S, R> Evaluator<'_, S, R>
where
    S: CellSource + ?Sized,
    R: ReferenceResolver + ?Sized,
{
    fn eval(&self, expr: &Expr) -> Result<Value, FormulaError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Cell(at) => Ok(Value::Number(self.resolver.resolve_reference(*at))),
            Expr::Range(range) => Err(FormulaError::BareRange(range.to_string())),
            Expr::Neg(inner) => {
                let n = try_cell!(self.eval(inner)?.into_number()?);
                Ok(Value::Number(-n))
            }
            Expr::BinaryOp { op, left, right } => {
                let left = self.eval(left)?.into_number()?;
                let right = self.eval(right)?.into_number()?;
                let (l, r) = (try_cell!(left), try_cell!(right));
                Ok(Value::Number(match op {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    Op::Div => l / r,
                }))
            }
            Expr::Function { name, args } => self.call(name, args),
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Value, FormulaError> {
        let builtin =
            Builtin::from_name(name).ok_or_else(|| FormulaError::UnknownFunction(name.into()))?;
        match builtin {
            Builtin::Aggregate(kind) => self.call_aggregate(builtin, kind, args),
            Builtin::SumIf => self.call_sum_if(args),
            Builtin::VLookup => self.call_vlookup(args),
            Builtin::Index => self.call_index(args),
            Builtin::Match => self.call_match(args),
        }
    }

    fn call_aggregate(
        &self,
        builtin: Builtin,
        kind: Aggregate,
        args: &[Expr],
    ) -> Result<Value, FormulaError> {
        if args.is_empty() {
            return Err(FormulaError::bad_args(
                builtin.sheet_name(),
                "expects at least one argument",
            ));
        }
        let mut values = Vec::new();
        for arg in args {
            match arg {
                Expr::Range(range) => values.extend(values_in(range, self.source)),
                Expr::Cell(at) => values.extend(values_in(&RangeRef::new(*at, *at), self.source)),
                other => values.push(try_cell!(self.eval(other)?.into_number()?)),
            }
        }
        Ok(Value::Number(builtins::aggregate(kind, &values)))
    }

    fn call_sum_if(&self, args: &[Expr]) -> Result<Value, FormulaError> {
        const NAME: &str = "SUMIF";
        if !(2..=3).contains(&args.len()) {
            return Err(FormulaError::bad_args(NAME, "expects 2 or 3 arguments"));
        }
        let condition = range_arg(NAME, &args[0])?;
        let criterion = try_cell!(self.eval(&args[1])?.into_text());
        let sum = args.get(2).map(|arg| range_arg(NAME, arg)).transpose()?;
        let total = sum_if(
            &condition,
            &Criterion::parse(&criterion),
            sum.as_ref(),
            self.source,
        )?;
        Ok(Value::Number(total))
    }

    fn call_vlookup(&self, args: &[Expr]) -> Result<Value, FormulaError> {
        const NAME: &str = "VLOOKUP";
        if !(3..=4).contains(&args.len()) {
            return Err(FormulaError::bad_args(NAME, "expects 3 or 4 arguments"));
        }
        let key = try_cell!(self.lookup_key(&args[0]));
        let table = range_arg(NAME, &args[1])?;
        let col_index = try_cell!(self.position_arg(NAME, &args[2])?);
        // Only exact matching is supported; range_lookup is evaluated and ignored.
        if let Some(range_lookup) = args.get(3) {
            try_cell!(self.eval(range_lookup)?.into_text());
        }
        let at = try_cell!(builtins::vlookup(&key, &table, col_index, self.source));
        Ok(self.referenced_literal(at))
    }

    fn call_index(&self, args: &[Expr]) -> Result<Value, FormulaError> {
        const NAME: &str = "INDEX";
        if !(2..=3).contains(&args.len()) {
            return Err(FormulaError::bad_args(NAME, "expects 2 or 3 arguments"));
        }
        let range = range_arg(NAME, &args[0])?;
        let row_num = try_cell!(self.position_arg(NAME, &args[1])?);
        let col_num = match args.get(2) {
            Some(arg) => try_cell!(self.position_arg(NAME, arg)?),
            None => 1,
        };
        let at = try_cell!(builtins::index(&range, row_num, col_num, self.source));
        Ok(self.referenced_literal(at))
    }

    fn call_match(&self, args: &[Expr]) -> Result<Value, FormulaError> {
        const NAME: &str = "MATCH";
        if !(2..=3).contains(&args.len()) {
            return Err(FormulaError::bad_args(NAME, "expects 2 or 3 arguments"));
        }
        let key = try_cell!(self.lookup_key(&args[0]));
        let range = range_arg(NAME, &args[1])?;
        let match_type = match args.get(2) {
            Some(arg) => try_cell!(self.eval(arg)?.into_number()?),
            None => 1.0,
        };
        if ![-1.0, 0.0, 1.0].contains(&match_type) {
            return Err(FormulaError::bad_args(NAME, "match type must be -1, 0 or 1"));
        }
        let position = try_cell!(builtins::match_position(
            &key,
            &range,
            match_type as i64,
            self.source
        ));
        Ok(Value::Number(position as f64))
    }

    /// Text a lookup compares against raw cell text. A cell argument uses the
    /// referenced cell's own text rather than its numeric coercion.
    fn lookup_key(&self, arg: &Expr) -> Result<String, CellError> {
        match arg {
            Expr::Cell(at) => self.referenced_literal(*at).into_text(),
            other => match self.eval(other) {
                Ok(value) => value.into_text(),
                Err(_) => Err(CellError::Error),
            },
        }
    }

    /// A positive whole-number argument such as a 1-based column index.
    fn position_arg(
        &self,
        name: &'static str,
        arg: &Expr,
    ) -> Result<Result<usize, CellError>, FormulaError> {
        let n = match self.eval(arg)?.into_number()? {
            Ok(n) => n,
            Err(e) => return Ok(Err(e)),
        };
        if !n.is_finite() || n < 0.0 {
            return Err(FormulaError::bad_args(name, "position must be a positive number"));
        }
        Ok(Ok(n.trunc() as usize))
    }

    /// Value of a cell fetched by a lookup. Literals are classified like
    /// literal cells; formulas are not evaluated and read as 0.
    fn referenced_literal(&self, at: CellRef) -> Value {
        match self.source.cell(at) {
            None | Some(CellValue::Empty) => Value::Number(0.0),
            Some(cell) if cell.is_formula() => Value::Number(0.0),
            Some(cell) => classify_literal(cell).into(),
        }
    }
}

fn range_arg(name: &'static str, arg: &Expr) -> Result<RangeRef, FormulaError> {
    match arg {
        Expr::Range(range) => Ok(*range),
        Expr::Cell(at) => Ok(RangeRef::new(*at, *at)),
        _ => Err(FormulaError::bad_args(name, "expects a range argument")),
    }
}
