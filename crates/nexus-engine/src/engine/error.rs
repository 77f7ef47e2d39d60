//! Error types for formula parsing and evaluation.
//!
//! None of these cross [`evaluate_cell_value`](super::evaluate_cell_value):
//! the evaluator turns every one of them into the `#ERROR!` value.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Empty formula")]
    Empty,

    #[error("Unexpected character: {0}")]
    UnexpectedChar(char),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unterminated string literal")]
    UnterminatedString,

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Unexpected token at position {0}")]
    UnexpectedToken(usize),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Formula nested too deeply")]
    TooDeep,

    #[error("Formula has too many operators")]
    TooManyOperators,

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{name}: {message}")]
    BadArguments { name: &'static str, message: String },

    #[error("Range {0} used outside a function argument")]
    BareRange(String),

    #[error("Value is not a number: {0}")]
    NotANumber(String),

    #[error("Result is not a finite number")]
    NonFinite,

    #[error("Condition range and sum range have different shapes")]
    RangeMismatch,
}

impl FormulaError {
    pub(crate) fn bad_args(name: &'static str, message: impl Into<String>) -> Self {
        FormulaError::BadArguments {
            name,
            message: message.into(),
        }
    }
}
