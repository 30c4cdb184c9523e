//! PostgreSQL store backend
//!
//! Rows travel as JSON: reads project `to_jsonb(row)` and writes go through
//! `jsonb_populate_record`, so entities only need serde to be stored.

mod binding;
pub mod context;
pub mod table;

pub use binding::ROW_COLUMN;
pub use context::PgContext;
pub use table::PgTable;
