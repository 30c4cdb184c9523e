//! In-memory store backend
//!
//! Tables of JSON rows shared between connection handles. Each handle stages
//! its own changes and commits them all-or-nothing, which makes this backend
//! the test double for the PostgreSQL one.

pub mod context;
pub mod store;
pub mod table;

pub use context::MemoryContext;
pub use store::MemoryStore;
pub use table::MemoryTable;
