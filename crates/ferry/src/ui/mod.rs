//! Terminal output: progress bars and result tables.

mod table;
mod tracker;

pub use table::{Formatter, object_table, outcome_table};
pub use tracker::ProgressBars;
