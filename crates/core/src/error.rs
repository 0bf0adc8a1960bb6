//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse error taxonomy exposed to transport adapters.
///
/// Adapters map kinds (not individual variants) to their own status codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    InsufficientStock,
    Unauthorized,
    Forbidden,
    Infrastructure,
}

/// Domain-level error.
///
/// Deterministic business failures plus one `Infrastructure` variant that
/// carries storage failures through unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A category referenced a parent that does not exist.
    #[error("parent category not found: {0}")]
    ParentNotFound(String),

    /// A cart or order line does not exist.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Checkout was attempted on a cart without items.
    #[error("cart is empty")]
    EmptyCart,

    /// Requested quantity exceeds the available stock.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// A conflict occurred (duplicate key, stale version, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A category cannot be deleted while it has children.
    #[error("category {0} has child categories")]
    HasChildren(String),

    /// A category cannot be deleted while products reference it.
    #[error("category {0} is referenced by products")]
    HasProducts(String),

    /// The requested order status is not a successor of the current one.
    #[error("invalid order status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The order can no longer be modified in the requested way.
    #[error("order is locked: {0}")]
    OrderLocked(String),

    /// The review gate rejected the request.
    #[error("review not allowed: {0}")]
    ReviewNotAllowed(String),

    /// Authentication failure (delegated to the auth collaborator).
    #[error("unauthorized")]
    Unauthorized,

    /// Authorization failure (delegated to the auth collaborator).
    #[error("forbidden")]
    Forbidden,

    /// Storage-layer failure (timeouts, connection loss, serialization).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn infrastructure(msg: impl Into<String>) -> Self {
        Self::Infrastructure(msg.into())
    }

    pub fn insufficient_stock(
        product_id: impl core::fmt::Display,
        requested: i64,
        available: i64,
    ) -> Self {
        Self::InsufficientStock {
            product_id: product_id.to_string(),
            requested,
            available,
        }
    }

    pub fn invalid_transition(from: impl core::fmt::Display, to: impl core::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Fold this error into the adapter-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound(_) | DomainError::ParentNotFound(_) | DomainError::ItemNotFound(_) => {
                ErrorKind::NotFound
            }
            DomainError::Validation(_) | DomainError::InvalidId(_) | DomainError::EmptyCart => {
                ErrorKind::Validation
            }
            DomainError::InvariantViolation(_)
            | DomainError::Conflict(_)
            | DomainError::HasChildren(_)
            | DomainError::HasProducts(_)
            | DomainError::InvalidTransition { .. }
            | DomainError::OrderLocked(_) => ErrorKind::Conflict,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::Unauthorized => ErrorKind::Unauthorized,
            DomainError::Forbidden | DomainError::ReviewNotAllowed(_) => ErrorKind::Forbidden,
            DomainError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}
