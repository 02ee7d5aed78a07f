// src/process/mod.rs

pub mod convert;
pub mod normalize;
pub mod schema;
pub mod summary;

pub use normalize::{normalize, NormalizedTable};
pub use schema::{ColumnRole, ColumnSpec, SheetSchema};
pub use summary::{summarize, CategoryTotals, SheetSummary};
