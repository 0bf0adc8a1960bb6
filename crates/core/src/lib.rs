//! `forgeshop-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns)
//! shared by the catalog, cart, order and review modules.

pub mod aggregate;
pub mod attribute;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod localization;
pub mod money;
pub mod pagination;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use attribute::{AttributeMap, AttributeValue};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use event::Event;
pub use id::{AggregateId, UserId};
pub use localization::{LanguageCode, Translation, Translations};
pub use money::{Money, adjust_total, line_subtotal};
pub use pagination::{Page, PageRequest};
pub use value_object::ValueObject;
