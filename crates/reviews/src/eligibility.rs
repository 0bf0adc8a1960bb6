use serde::{Deserialize, Serialize};

use forgeshop_core::{AggregateRoot, DomainError, DomainResult, UserId};
use forgeshop_orders::{Order, OrderId, OrderStatus};
use forgeshop_products::ProductId;

/// Outcome of an eligibility check for `(user, product)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEligibility {
    pub eligible: bool,
    /// Delivered orders of the user that contain the product.
    pub qualifying_orders: Vec<OrderId>,
}

/// Require `order` to be a delivered purchase of `product_id` by `user_id`.
pub fn ensure_order_qualifies(
    order: &Order,
    user_id: UserId,
    product_id: ProductId,
) -> DomainResult<()> {
    if order.customer_id() != user_id {
        return Err(DomainError::ReviewNotAllowed(
            "order does not belong to the reviewer".into(),
        ));
    }
    if !order.contains_product(product_id) {
        return Err(DomainError::ReviewNotAllowed(
            "order does not contain the product".into(),
        ));
    }
    if order.status() != OrderStatus::Delivered {
        return Err(DomainError::ReviewNotAllowed(format!(
            "order is {}, reviews open once it is delivered",
            order.status()
        )));
    }
    Ok(())
}

pub fn check_eligibility<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    user_id: UserId,
    product_id: ProductId,
) -> ReviewEligibility {
    let qualifying_orders: Vec<OrderId> = orders
        .into_iter()
        .filter(|order| ensure_order_qualifies(order, user_id, product_id).is_ok())
        .map(|order| *order.id())
        .collect();

    ReviewEligibility {
        eligible: !qualifying_orders.is_empty(),
        qualifying_orders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forgeshop_core::{Aggregate, AggregateId, ErrorKind};
    use forgeshop_orders::{ChangeStatus, LineItem, OrderCommand, PlaceOrder, ShippingInfo};
    use rust_decimal::Decimal;

    fn order_with(user: UserId, product: ProductId, reach: &[OrderStatus]) -> Order {
        let (mut order, _) = Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id: user,
            items: vec![LineItem::snapshot(product, "SKU-9", "Lamp", Decimal::new(4999, 2), 1).unwrap()],
            shipping: ShippingInfo {
                recipient_name: "Reviewer".into(),
                phone: "5550100".into(),
                address_line1: "Main St 1".into(),
                address_line2: None,
                city: "Springfield".into(),
                region: None,
                postal_code: "12345".into(),
                country: "US".into(),
            },
            occurred_at: Utc::now(),
        })
        .unwrap();
        for status in reach {
            order
                .execute(&OrderCommand::ChangeStatus(ChangeStatus {
                    order_id: *order.id(),
                    status: *status,
                    occurred_at: Utc::now(),
                }))
                .unwrap();
        }
        order
    }

    const DELIVERED: &[OrderStatus] = &[OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered];

    #[test]
    fn delivered_purchase_qualifies() {
        let user = UserId::new();
        let product = ProductId::new(AggregateId::new());
        let order = order_with(user, product, DELIVERED);
        assert!(ensure_order_qualifies(&order, user, product).is_ok());

        let eligibility = check_eligibility([&order], user, product);
        assert!(eligibility.eligible);
        assert_eq!(eligibility.qualifying_orders, vec![*order.id()]);
    }

    #[test]
    fn shipped_but_not_delivered_does_not_qualify() {
        let user = UserId::new();
        let product = ProductId::new(AggregateId::new());
        let order = order_with(user, product, &[OrderStatus::Paid, OrderStatus::Shipped]);
        let err = ensure_order_qualifies(&order, user, product).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(!check_eligibility([&order], user, product).eligible);
    }

    #[test]
    fn foreign_order_or_other_product_does_not_qualify() {
        let user = UserId::new();
        let product = ProductId::new(AggregateId::new());
        let order = order_with(user, product, DELIVERED);

        assert!(ensure_order_qualifies(&order, UserId::new(), product).is_err());
        assert!(ensure_order_qualifies(&order, user, ProductId::new(AggregateId::new())).is_err());
    }

    #[test]
    fn no_orders_means_not_eligible() {
        let eligibility = check_eligibility(
            std::iter::empty::<&Order>(),
            UserId::new(),
            ProductId::new(AggregateId::new()),
        );
        assert!(!eligibility.eligible);
        assert!(eligibility.qualifying_orders.is_empty());
    }
}
