//! Sheet state and logic (UI-agnostic).

mod ops;
mod state;
mod stats;
mod watch;

pub use state::Sheet;
pub use stats::{ColumnExtent, SelectionStats};
pub use watch::WatchEntry;
