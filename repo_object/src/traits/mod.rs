//! Traits for store access
//!
//! The entity contract plus the two store-side contracts every backend
//! implements: the connection handle and its per-entity table handles.

pub mod context;
pub mod entity;
pub mod table;

pub use context::StoreContext;
pub use entity::{key_identity, row_identity, Entity, TableMeta};
pub use table::{ensure_active, run_cancellable, TableHandle};
