//! nexus_engine - Spreadsheet formula engine and goal-seek solver.

pub mod builtins;
pub mod engine;
