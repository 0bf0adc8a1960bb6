//! Order listing filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeshop_core::{DomainError, DomainResult, UserId};
use forgeshop_products::ProductId;

use crate::order::Order;
use crate::status::OrderStatus;

/// Conjunctive filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilter {
    pub customer_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub product_id: Option<ProductId>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn for_customer(customer_id: UserId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn created_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from >= to {
                return Err(DomainError::validation("created_from must be before created_to"));
            }
        }
        self.created_from = from;
        self.created_to = to;
        Ok(self)
    }

    pub fn matches(&self, order: &Order) -> bool {
        if self.customer_id.is_some_and(|c| c != order.customer_id()) {
            return false;
        }
        if self.status.is_some_and(|s| s != order.status()) {
            return false;
        }
        if self.product_id.is_some_and(|p| !order.contains_product(p)) {
            return false;
        }
        let Some(created_at) = order.created_at() else {
            return false;
        };
        if self.created_from.is_some_and(|from| created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| created_at >= to) {
            return false;
        }
        true
    }
}
