//! nexus-core - UI-agnostic sheet model, watch list and configuration.

pub mod config;
pub mod document;
pub mod error;

pub use config::Config;
pub use document::{ColumnExtent, SelectionStats, Sheet, WatchEntry};
pub use error::{NexusError, Result};

pub use nexus_engine::engine::CellRef;
