//! Category hierarchy domain module.
//!
//! Categories form a tree linked by parent references. Each category stores a
//! materialized ancestor path and depth so ancestor lookups never walk the
//! tree. This crate is pure domain logic (no IO, no storage).

pub mod category;
pub mod tree;

pub use category::{Category, CategoryDraft, CategoryId, CategoryUpdate, validate_slug};
pub use tree::CategoryTree;
