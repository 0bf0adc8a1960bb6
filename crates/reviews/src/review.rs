use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeshop_core::{AggregateRoot, DomainError, DomainResult, Entity, UserId, domain_id};
use forgeshop_orders::{Order, OrderId};
use forgeshop_products::ProductId;

use crate::eligibility::ensure_order_qualifies;

pub const MAX_COMMENT_LEN: usize = 2000;

domain_id!(
    /// Review identifier.
    ReviewId
);

/// Review input as submitted by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(DomainError::validation("rating must be between 1 and 5"));
        }
        if let Some(comment) = &self.comment {
            if comment.chars().count() > MAX_COMMENT_LEN {
                return Err(DomainError::validation(format!(
                    "comment must be at most {MAX_COMMENT_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Review {
    /// Create a review for the purchase recorded in `order`.
    ///
    /// Uniqueness of the (user, product, order) triple is a storage concern.
    pub fn create(
        id: ReviewId,
        draft: ReviewDraft,
        order: &Order,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        draft.validate()?;
        if *order.id() != draft.order_id {
            return Err(DomainError::invariant("order does not match the review's order_id"));
        }
        ensure_order_qualifies(order, draft.user_id, draft.product_id)?;

        let comment = draft
            .comment
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(Self {
            id,
            product_id: draft.product_id,
            user_id: draft.user_id,
            order_id: draft.order_id,
            rating: draft.rating,
            comment,
            created_at: now,
            updated_at: now,
        })
    }

    /// Key enforced unique by review stores.
    pub fn triple(&self) -> (UserId, ProductId, OrderId) {
        (self.user_id, self.product_id, self.order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeshop_core::{Aggregate, AggregateId, ErrorKind};
    use forgeshop_orders::{
        ChangeStatus, LineItem, OrderCommand, OrderStatus, PlaceOrder, ShippingInfo,
    };
    use rust_decimal::Decimal;

    fn delivered_order(user: UserId, product: ProductId) -> Order {
        let (mut order, _) = Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id: user,
            items: vec![LineItem::snapshot(product, "SKU-1", "Kettle", Decimal::new(2500, 2), 1).unwrap()],
            shipping: ShippingInfo {
                recipient_name: "Buyer".into(),
                phone: "+49 30 123456".into(),
                address_line1: "Hauptstr. 5".into(),
                address_line2: None,
                city: "Berlin".into(),
                region: None,
                postal_code: "10115".into(),
                country: "DE".into(),
            },
            occurred_at: Utc::now(),
        })
        .unwrap();
        for status in [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered] {
            order
                .execute(&OrderCommand::ChangeStatus(ChangeStatus {
                    order_id: *order.id(),
                    status,
                    occurred_at: Utc::now(),
                }))
                .unwrap();
        }
        order
    }

    fn draft(order: &Order, product: ProductId, rating: u8) -> ReviewDraft {
        ReviewDraft {
            product_id: product,
            user_id: order.customer_id(),
            order_id: *order.id(),
            rating,
            comment: Some("  Boils fast.  ".into()),
        }
    }

    #[test]
    fn create_for_delivered_purchase() {
        let user = UserId::new();
        let product = ProductId::new(AggregateId::new());
        let order = delivered_order(user, product);

        let review = Review::create(ReviewId::generate(), draft(&order, product, 4), &order, Utc::now()).unwrap();
        assert_eq!(review.rating, 4);
        assert_eq!(review.comment.as_deref(), Some("Boils fast."));
        assert_eq!(review.triple(), (user, product, *order.id()));
    }

    #[test]
    fn rating_bounds() {
        let product = ProductId::new(AggregateId::new());
        let order = delivered_order(UserId::new(), product);
        for rating in [0, 6] {
            let err = Review::create(ReviewId::generate(), draft(&order, product, rating), &order, Utc::now())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn overlong_comment_rejected() {
        let product = ProductId::new(AggregateId::new());
        let order = delivered_order(UserId::new(), product);
        let mut d = draft(&order, product, 5);
        d.comment = Some("x".repeat(MAX_COMMENT_LEN + 1));
        assert!(d.validate().is_err());
        d.comment = Some("x".repeat(MAX_COMMENT_LEN));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn someone_elses_order_is_forbidden() {
        let product = ProductId::new(AggregateId::new());
        let order = delivered_order(UserId::new(), product);
        let mut d = draft(&order, product, 5);
        d.user_id = UserId::new();
        let err = Review::create(ReviewId::generate(), d, &order, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::ReviewNotAllowed(_)));
    }
}
