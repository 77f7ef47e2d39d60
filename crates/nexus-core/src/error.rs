//! Error types for Nexus core.

use std::path::PathBuf;

use nexus_engine::engine::{CellRef, GoalSeekError};
use thiserror::Error;

/// Errors that can occur editing a sheet or loading configuration
#[derive(Error, Debug)]
pub enum NexusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Refusing to read {}: file too large ({size} bytes, max {max})", path.display())]
    ConfigTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Cell {0} is outside the sheet")]
    OutOfBounds(CellRef),

    #[error("Row {0} is outside the sheet")]
    RowOutOfBounds(usize),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Column name must not be blank")]
    BlankColumnName,

    #[error(transparent)]
    GoalSeek(#[from] GoalSeekError),
}

pub type Result<T> = std::result::Result<T, NexusError>;
