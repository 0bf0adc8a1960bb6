//! Order value objects: line-item snapshots and shipping/payment/tracking metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeshop_core::money::{ensure_positive_price, ensure_positive_quantity};
use forgeshop_core::{DomainError, DomainResult, Money, ValueObject, line_subtotal};
use forgeshop_products::ProductId;

use crate::status::OrderStatus;

const MAX_FIELD_LEN: usize = 256;

/// Frozen copy of product identity and price taken when the line was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

impl ValueObject for LineItem {}

impl LineItem {
    pub fn snapshot(
        product_id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> DomainResult<Self> {
        ensure_positive_price(unit_price)?;
        ensure_positive_quantity(quantity)?;
        Ok(Self {
            product_id,
            sku: sku.into(),
            name: name.into(),
            unit_price,
            quantity,
            subtotal: line_subtotal(unit_price, quantity)?,
        })
    }

    /// Check a snapshot that arrived from outside (e.g. a deserialized command).
    pub fn validate(&self) -> DomainResult<()> {
        ensure_positive_price(self.unit_price)?;
        ensure_positive_quantity(self.quantity)?;
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("line item sku must not be empty"));
        }
        if self.subtotal != line_subtotal(self.unit_price, self.quantity)? {
            return Err(DomainError::invariant("line item subtotal does not match price * quantity"));
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> DomainResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_FIELD_LEN {
        return Err(DomainError::validation(format!(
            "{field} must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(())
}

/// Delivery address and contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2.
    pub country: String,
}

impl ValueObject for ShippingInfo {}

impl ShippingInfo {
    pub fn validate(&self) -> DomainResult<()> {
        require("recipient_name", &self.recipient_name)?;
        require("phone", &self.phone)?;
        require("address_line1", &self.address_line1)?;
        require("city", &self.city)?;
        require("postal_code", &self.postal_code)?;

        let phone_ok = self
            .phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !phone_ok || !self.phone.chars().any(|c| c.is_ascii_digit()) {
            return Err(DomainError::validation("phone must contain only digits and separators"));
        }

        if self.country.len() != 2 || !self.country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(
                "country must be an ISO 3166-1 alpha-2 code (e.g. 'US')",
            ));
        }
        Ok(())
    }
}

/// Payment state as reported by the (external) payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Paid,
    Failed,
    Refunded,
}

/// Opaque payment metadata. No gateway integration happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: String,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl ValueObject for PaymentInfo {}

impl PaymentInfo {
    pub fn validate(&self) -> DomainResult<()> {
        require("payment method", &self.method)?;
        if let Some(reference) = &self.reference {
            require("payment reference", reference)?;
        }
        if self.status == PaymentStatus::Paid && self.paid_at.is_none() {
            return Err(DomainError::validation("paid_at is required when payment status is paid"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub carrier: String,
    pub tracking_number: String,
}

impl ValueObject for TrackingInfo {}

impl TrackingInfo {
    pub fn validate(&self) -> DomainResult<()> {
        require("carrier", &self.carrier)?;
        require("tracking_number", &self.tracking_number)
    }
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// `None` for the initial `created` entry.
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeshop_core::AggregateId;
    use rust_decimal::Decimal;

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            recipient_name: "Ada Lovelace".into(),
            phone: "+44 20 7946 0958".into(),
            address_line1: "12 St James's Square".into(),
            address_line2: None,
            city: "London".into(),
            region: None,
            postal_code: "SW1Y 4JH".into(),
            country: "GB".into(),
        }
    }

    #[test]
    fn snapshot_computes_subtotal() {
        let item = LineItem::snapshot(
            ProductId::new(AggregateId::new()),
            "SKU-1",
            "Widget",
            Decimal::new(1000, 2),
            2,
        )
        .unwrap();
        assert_eq!(item.subtotal, Decimal::new(2000, 2));
        assert!(item.validate().is_ok());
    }

    #[test]
    fn tampered_subtotal_is_rejected() {
        let mut item = LineItem::snapshot(
            ProductId::new(AggregateId::new()),
            "SKU-1",
            "Widget",
            Decimal::new(1000, 2),
            2,
        )
        .unwrap();
        item.subtotal = Decimal::new(1, 0);
        assert!(matches!(item.validate(), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn shipping_validation() {
        assert!(shipping().validate().is_ok());

        let mut bad = shipping();
        bad.city = "  ".into();
        assert!(bad.validate().is_err());

        let mut bad = shipping();
        bad.country = "gbr".into();
        assert!(bad.validate().is_err());

        let mut bad = shipping();
        bad.phone = "call me".into();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn paid_payment_requires_timestamp() {
        let mut payment = PaymentInfo {
            method: "card".into(),
            status: PaymentStatus::Paid,
            reference: Some("pi_123".into()),
            paid_at: None,
        };
        assert!(payment.validate().is_err());
        payment.paid_at = Some(Utc::now());
        assert!(payment.validate().is_ok());
    }

    #[test]
    fn tracking_requires_both_fields() {
        let tracking = TrackingInfo {
            carrier: "DHL".into(),
            tracking_number: "".into(),
        };
        assert!(tracking.validate().is_err());
    }
}
