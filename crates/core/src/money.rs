//! Monetary amounts.
//!
//! Prices are exact decimals (never floats). Currency is a store-wide setting
//! and is not carried per amount.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Monetary amount in the store currency.
pub type Money = Decimal;

/// `unit_price * quantity`, rejecting overflow.
pub fn line_subtotal(unit_price: Money, quantity: i64) -> DomainResult<Money> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| DomainError::validation("line subtotal overflows"))
}

/// Move a running total by `current -> replacement`, rejecting overflow.
pub fn adjust_total(total: Money, current: Money, replacement: Money) -> DomainResult<Money> {
    total
        .checked_sub(current)
        .and_then(|t| t.checked_add(replacement))
        .ok_or_else(|| DomainError::validation("total overflows"))
}

/// Require a strictly positive price.
pub fn ensure_positive_price(price: Money) -> DomainResult<()> {
    if price <= Decimal::ZERO {
        return Err(DomainError::validation("price must be positive"));
    }
    Ok(())
}

/// Require a strictly positive quantity.
pub fn ensure_positive_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}
