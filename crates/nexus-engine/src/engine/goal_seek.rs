//! Goal seek: find the value of one literal cell that drives a formula cell
//! to a desired result.
//!
//! The solver uses the secant method on `f(x) = target(x) - desired`. Every
//! trial value is evaluated against a [`ShadowRow`] so the caller's grid is
//! never modified; committing the solution is the caller's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cell::{CellSource, CellValue, Row, ShadowRow, SheetView};
use super::cell_ref::{CellRef, parse_cell_reference};
use super::eval::evaluate_with;

/// Solver tuning knobs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Convergence tolerance on `|target(x) - desired|`.
    pub epsilon: f64,
    /// Secant slopes smaller than this are treated as flat.
    pub min_slope: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_iterations: 100,
            epsilon: 0.001,
            min_slope: 1e-9,
        }
    }
}

/// Why a goal seek did not produce a solution. The display strings are the
/// messages shown to users.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GoalSeekError {
    #[error("Invalid cell reference")]
    InvalidReference,

    #[error("Target cell out of bounds")]
    TargetOutOfBounds,

    #[error("Changing cell out of bounds")]
    ChangingOutOfBounds,

    #[error("Target cell must contain a formula")]
    TargetNotFormula,

    #[error("Changing cell must not contain a formula")]
    ChangingIsFormula,

    #[error("Target value must be a finite number")]
    NonFiniteTarget,

    #[error("Could not converge")]
    NoConvergence { last_value: f64 },
}

/// Outcome of a goal seek.
///
/// `new_value` is the solution on success, the last attempted value when the
/// solver gave up, and 0 when a precondition failed.
#[derive(Clone, Debug, PartialEq)]
pub struct GoalSeekResult {
    pub success: bool,
    pub new_value: f64,
    pub error: Option<GoalSeekError>,
}

impl GoalSeekResult {
    fn solved(new_value: f64) -> Self {
        GoalSeekResult {
            success: true,
            new_value,
            error: None,
        }
    }

    fn failed(error: GoalSeekError) -> Self {
        let new_value = match error {
            GoalSeekError::NoConvergence { last_value } => last_value,
            _ => 0.0,
        };
        GoalSeekResult {
            success: false,
            new_value,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<f64, GoalSeekError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.new_value),
        }
    }
}

/// Goal seek with the default [`SolverSettings`].
pub fn goal_seek(
    target_ref: &str,
    target_value: f64,
    changing_ref: &str,
    rows: &[Row],
    columns: &[String],
) -> GoalSeekResult {
    goal_seek_with(
        &SolverSettings::default(),
        target_ref,
        target_value,
        changing_ref,
        rows,
        columns,
    )
}

pub fn goal_seek_with(
    settings: &SolverSettings,
    target_ref: &str,
    target_value: f64,
    changing_ref: &str,
    rows: &[Row],
    columns: &[String],
) -> GoalSeekResult {
    let view = SheetView::new(rows, columns);
    match solve(settings, target_ref, target_value, changing_ref, view) {
        Ok(x) => GoalSeekResult::solved(x),
        Err(e) => {
            log::debug!("goal seek {} -> {} failed: {}", changing_ref, target_ref, e);
            GoalSeekResult::failed(e)
        }
    }
}

fn solve(
    settings: &SolverSettings,
    target_ref: &str,
    target_value: f64,
    changing_ref: &str,
    view: SheetView<'_>,
) -> Result<f64, GoalSeekError> {
    let target = parse_cell_reference(target_ref).ok_or(GoalSeekError::InvalidReference)?;
    let changing = parse_cell_reference(changing_ref).ok_or(GoalSeekError::InvalidReference)?;
    if !view.in_bounds(target) {
        return Err(GoalSeekError::TargetOutOfBounds);
    }
    if !view.in_bounds(changing) {
        return Err(GoalSeekError::ChangingOutOfBounds);
    }

    let target_raw = view.cell(target).cloned().unwrap_or_default();
    if !target_raw.is_formula() {
        return Err(GoalSeekError::TargetNotFormula);
    }
    let changing_raw = view.cell(changing);
    if changing_raw.is_some_and(CellValue::is_formula) {
        return Err(GoalSeekError::ChangingIsFormula);
    }
    if !target_value.is_finite() {
        return Err(GoalSeekError::NonFiniteTarget);
    }

    let probe = Probe {
        view,
        target_raw,
        changing,
        target_value,
    };

    let mut x0 = changing_raw.and_then(CellValue::as_number).unwrap_or(0.0);
    let mut y0 = probe.residual(x0);
    if y0.abs() < settings.epsilon {
        return Ok(x0);
    }

    let step = if x0.abs() < 0.1 { 0.1 } else { x0 * 0.01 };
    let mut x1 = x0 + step;
    let mut y1 = probe.residual(x1);

    for iteration in 0..settings.max_iterations {
        if y1.abs() < settings.epsilon {
            log::debug!("goal seek converged after {} iterations: {}", iteration, x1);
            return Ok(x1);
        }

        let slope = y1 - y0;
        if slope.abs() < settings.min_slope {
            log::warn!("goal seek hit a flat region at x = {}, stepping by 1", x1);
            x1 += 1.0;
            y1 = probe.residual(x1);
            continue;
        }

        let next = x1 - y1 * (x1 - x0) / slope;
        log::trace!("goal seek iteration {}: x = {}, residual = {}", iteration, next, y1);
        x0 = x1;
        y0 = y1;
        x1 = next;
        y1 = probe.residual(x1);
    }

    Err(GoalSeekError::NoConvergence { last_value: x1 })
}

/// Evaluates the target formula with the changing cell overridden.
struct Probe<'a> {
    view: SheetView<'a>,
    target_raw: CellValue,
    changing: CellRef,
    target_value: f64,
}

impl Probe<'_> {
    fn value_at(&self, x: f64) -> f64 {
        let Some(mut shadow) = ShadowRow::new(self.view, self.changing.row) else {
            return 0.0;
        };
        shadow.set(self.changing.col, CellValue::Number(x));
        evaluate_with(&self.target_raw, &shadow)
            .as_number()
            .unwrap_or(0.0)
    }

    fn residual(&self, x: f64) -> f64 {
        self.value_at(x) - self.target_value
    }
}
