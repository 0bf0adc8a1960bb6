//! Product catalog domain module.
//!
//! This crate contains business rules for catalog products: validation,
//! localization overlays, stock arithmetic and list filters. It performs no
//! IO; persistence and atomic stock updates live in `forgeshop-infra`.

pub mod filter;
pub mod product;

pub use filter::{FilterCriterion, ProductFilter};
pub use product::{LocalizedProduct, Product, ProductDraft, ProductId};
