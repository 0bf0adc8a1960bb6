//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: two value objects with the same
//! attributes are the same value. Translations, shipping addresses and order
//! line snapshots are modelled this way.

/// Marker trait for value objects.
///
/// Value objects are immutable once built and compared by value. To "modify"
/// one, build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct TrackingInfo {
///     carrier: String,
///     tracking_number: String,
/// }
///
/// impl ValueObject for TrackingInfo {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
