use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgeshop_core::money::ensure_positive_quantity;
use forgeshop_core::{
    Aggregate, AggregateRoot, DomainError, Event, Money, UserId, adjust_total, domain_id,
    line_subtotal,
};
use forgeshop_products::ProductId;

use crate::status::OrderStatus;
use crate::types::{LineItem, PaymentInfo, ShippingInfo, StatusChange, TrackingInfo};

domain_id!(
    /// Order identifier.
    OrderId
);

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: UserId,
    items: Vec<LineItem>,
    total: Money,
    status: OrderStatus,
    shipping: Option<ShippingInfo>,
    payment: Option<PaymentInfo>,
    tracking: Option<TrackingInfo>,
    history: Vec<StatusChange>,
    version: u64,
    placed: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Pre-placement shell; only `PlaceOrder` is accepted in this state.
    pub fn empty(id: OrderId, customer_id: UserId) -> Self {
        Self {
            id,
            customer_id,
            items: Vec::new(),
            total: Decimal::ZERO,
            status: OrderStatus::Created,
            shipping: None,
            payment: None,
            tracking: None,
            history: Vec::new(),
            version: 0,
            placed: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Build and place an order in one step.
    pub fn place(cmd: PlaceOrder) -> Result<(Self, Vec<OrderEvent>), DomainError> {
        let mut order = Self::empty(cmd.order_id, cmd.customer_id);
        let events = order.execute(&OrderCommand::PlaceOrder(cmd))?;
        Ok((order, events))
    }

    pub fn customer_id(&self) -> UserId {
        self.customer_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.item(product_id).is_some()
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn shipping(&self) -> Option<&ShippingInfo> {
        self.shipping.as_ref()
    }

    pub fn payment(&self) -> Option<&PaymentInfo> {
        self.payment.as_ref()
    }

    pub fn tracking(&self) -> Option<&TrackingInfo> {
        self.tracking.as_ref()
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn computed_total(&self) -> Money {
        self.items.iter().map(|i| i.subtotal).sum()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder (issued by checkout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping: ShippingInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPaymentInfo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPaymentInfo {
    pub order_id: OrderId,
    pub payment: PaymentInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetTrackingInfo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTrackingInfo {
    pub order_id: OrderId,
    pub tracking: TrackingInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItem. The snapshot is taken from the live product by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItem {
    pub order_id: OrderId,
    pub item: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLineItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeLineItemQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLineItemQuantity {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ChangeStatus(ChangeStatus),
    SetPaymentInfo(SetPaymentInfo),
    SetTrackingInfo(SetTrackingInfo),
    AddLineItem(AddLineItem),
    RemoveLineItem(RemoveLineItem),
    ChangeLineItemQuantity(ChangeLineItemQuantity),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub shipping: ShippingInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentInfoSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfoSet {
    pub order_id: OrderId,
    pub payment: PaymentInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TrackingInfoSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfoSet {
    pub order_id: OrderId,
    pub tracking: TrackingInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemAdded {
    pub order_id: OrderId,
    pub item: LineItem,
    /// Order total after the event.
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRemoved {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemQuantityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemQuantityChanged {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub subtotal: Money,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    StatusChanged(StatusChanged),
    PaymentInfoSet(PaymentInfoSet),
    TrackingInfoSet(TrackingInfoSet),
    LineItemAdded(LineItemAdded),
    LineItemRemoved(LineItemRemoved),
    LineItemQuantityChanged(LineItemQuantityChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
            OrderEvent::PaymentInfoSet(_) => "orders.order.payment_info_set",
            OrderEvent::TrackingInfoSet(_) => "orders.order.tracking_info_set",
            OrderEvent::LineItemAdded(_) => "orders.order.line_item_added",
            OrderEvent::LineItemRemoved(_) => "orders.order.line_item_removed",
            OrderEvent::LineItemQuantityChanged(_) => "orders.order.line_item_quantity_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
            OrderEvent::PaymentInfoSet(e) => e.occurred_at,
            OrderEvent::TrackingInfoSet(e) => e.occurred_at,
            OrderEvent::LineItemAdded(e) => e.occurred_at,
            OrderEvent::LineItemRemoved(e) => e.occurred_at,
            OrderEvent::LineItemQuantityChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.customer_id = e.customer_id;
                self.items = e.items.clone();
                self.total = e.total;
                self.shipping = Some(e.shipping.clone());
                self.status = OrderStatus::Created;
                self.history.push(StatusChange {
                    from: None,
                    to: OrderStatus::Created,
                    at: e.occurred_at,
                });
                self.placed = true;
                self.created_at = Some(e.occurred_at);
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.history.push(StatusChange {
                    from: Some(e.from),
                    to: e.to,
                    at: e.occurred_at,
                });
            }
            OrderEvent::PaymentInfoSet(e) => {
                self.payment = Some(e.payment.clone());
            }
            OrderEvent::TrackingInfoSet(e) => {
                self.tracking = Some(e.tracking.clone());
            }
            OrderEvent::LineItemAdded(e) => {
                self.items.push(e.item.clone());
                self.total = e.total;
            }
            OrderEvent::LineItemRemoved(e) => {
                self.items.retain(|i| i.product_id != e.product_id);
                self.total = e.total;
            }
            OrderEvent::LineItemQuantityChanged(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.product_id == e.product_id) {
                    item.quantity = e.quantity;
                    item.subtotal = e.subtotal;
                }
                self.total = e.total;
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            OrderCommand::SetPaymentInfo(cmd) => self.handle_set_payment(cmd),
            OrderCommand::SetTrackingInfo(cmd) => self.handle_set_tracking(cmd),
            OrderCommand::AddLineItem(cmd) => self.handle_add_item(cmd),
            OrderCommand::RemoveLineItem(cmd) => self.handle_remove_item(cmd),
            OrderCommand::ChangeLineItemQuantity(cmd) => self.handle_change_quantity(cmd),
        }
    }
}

impl Order {
    fn ensure_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_placed(&self) -> Result<(), DomainError> {
        if !self.placed {
            return Err(DomainError::not_found(format!("order {}", self.id)));
        }
        Ok(())
    }

    fn total_after(&self, current: Money, replacement: Money) -> Result<Money, DomainError> {
        adjust_total(self.total, current, replacement)
            .map_err(|_| DomainError::validation("order total overflows"))
    }

    fn ensure_items_mutable(&self) -> Result<(), DomainError> {
        if self.status != OrderStatus::Created {
            return Err(DomainError::OrderLocked(format!(
                "line items cannot change once the order is {}",
                self.status
            )));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_id(cmd.order_id)?;
        if self.placed {
            return Err(DomainError::conflict("order already placed"));
        }
        if cmd.customer_id != self.customer_id {
            return Err(DomainError::invariant("customer_id mismatch"));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        cmd.shipping.validate()?;

        let mut total = Decimal::ZERO;
        for (idx, item) in cmd.items.iter().enumerate() {
            item.validate()?;
            if cmd.items[..idx].iter().any(|other| other.product_id == item.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears on more than one line",
                    item.product_id
                )));
            }
            total = total
                .checked_add(item.subtotal)
                .ok_or_else(|| DomainError::validation("order total overflows"))?;
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            customer_id: cmd.customer_id,
            items: cmd.items.clone(),
            total,
            shipping: cmd.shipping.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_id(cmd.order_id)?;
        self.ensure_placed()?;
        if !self.status.can_transition_to(cmd.status) {
            return Err(DomainError::invalid_transition(self.status, cmd.status));
        }
        Ok(vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_payment(&self, cmd: &SetPaymentInfo) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_id(cmd.order_id)?;
        self.ensure_placed()?;
        if !matches!(self.status, OrderStatus::Created | OrderStatus::Paid) {
            return Err(DomainError::OrderLocked(format!(
                "payment info cannot change once the order is {}",
                self.status
            )));
        }
        cmd.payment.validate()?;
        Ok(vec![OrderEvent::PaymentInfoSet(PaymentInfoSet {
            order_id: cmd.order_id,
            payment: cmd.payment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_tracking(&self, cmd: &SetTrackingInfo) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_id(cmd.order_id)?;
        self.ensure_placed()?;
        if !matches!(self.status, OrderStatus::Shipped | OrderStatus::Delivered) {
            return Err(DomainError::conflict(format!(
                "tracking info requires a shipped order (status is {})",
                self.status
            )));
        }
        cmd.tracking.validate()?;
        Ok(vec![OrderEvent::TrackingInfoSet(TrackingInfoSet {
            order_id: cmd.order_id,
            tracking: cmd.tracking.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddLineItem) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_id(cmd.order_id)?;
        self.ensure_placed()?;
        self.ensure_items_mutable()?;
        cmd.item.validate()?;
        if self.contains_product(cmd.item.product_id) {
            return Err(DomainError::conflict(format!(
                "product {} is already on the order",
                cmd.item.product_id
            )));
        }
        Ok(vec![OrderEvent::LineItemAdded(LineItemAdded {
            order_id: cmd.order_id,
            item: cmd.item.clone(),
            total: self.total_after(Decimal::ZERO, cmd.item.subtotal)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveLineItem) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_id(cmd.order_id)?;
        self.ensure_placed()?;
        self.ensure_items_mutable()?;
        let item = self
            .item(cmd.product_id)
            .ok_or_else(|| DomainError::ItemNotFound(cmd.product_id.to_string()))?;
        if self.items.len() == 1 {
            return Err(DomainError::validation("an order must keep at least one line item"));
        }
        Ok(vec![OrderEvent::LineItemRemoved(LineItemRemoved {
            order_id: cmd.order_id,
            product_id: cmd.product_id,
            total: self.total_after(item.subtotal, Decimal::ZERO)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_quantity(
        &self,
        cmd: &ChangeLineItemQuantity,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_id(cmd.order_id)?;
        self.ensure_placed()?;
        self.ensure_items_mutable()?;
        ensure_positive_quantity(cmd.quantity)?;
        let item = self
            .item(cmd.product_id)
            .ok_or_else(|| DomainError::ItemNotFound(cmd.product_id.to_string()))?;
        let subtotal = line_subtotal(item.unit_price, cmd.quantity)?;
        Ok(vec![OrderEvent::LineItemQuantityChanged(LineItemQuantityChanged {
            order_id: cmd.order_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            subtotal,
            total: self.total_after(item.subtotal, subtotal)?,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentStatus;
    use forgeshop_core::{AggregateId, ErrorKind};

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            recipient_name: "Grace Hopper".into(),
            phone: "+1 555 0100".into(),
            address_line1: "1 Navy Way".into(),
            address_line2: Some("Suite 2".into()),
            city: "Arlington".into(),
            region: Some("VA".into()),
            postal_code: "22202".into(),
            country: "US".into(),
        }
    }

    fn line(price_cents: i64, quantity: i64) -> LineItem {
        LineItem::snapshot(
            ProductId::new(AggregateId::new()),
            format!("SKU-{price_cents}"),
            "Thing",
            Decimal::new(price_cents, 2),
            quantity,
        )
        .unwrap()
    }

    fn placed(items: Vec<LineItem>) -> Order {
        let id = OrderId::generate();
        let (order, events) = Order::place(PlaceOrder {
            order_id: id,
            customer_id: UserId::new(),
            items,
            shipping: shipping(),
            occurred_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(events.len(), 1);
        order
    }

    fn transition(order: &mut Order, status: OrderStatus) -> Result<Vec<OrderEvent>, DomainError> {
        let cmd = OrderCommand::ChangeStatus(ChangeStatus {
            order_id: *order.id(),
            status,
            occurred_at: Utc::now(),
        });
        order.execute(&cmd)
    }

    #[test]
    fn place_order_sums_line_subtotals() {
        let order = placed(vec![line(1000, 2), line(350, 1)]);
        assert_eq!(order.total(), Decimal::new(2350, 2));
        assert_eq!(order.total(), order.computed_total());
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.history().len(), 1);
        assert_eq!(order.version(), 1);
        assert!(order.is_placed());
    }

    #[test]
    fn place_order_rejects_empty_and_duplicate_lines() {
        let err = Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id: UserId::new(),
            items: vec![],
            shipping: shipping(),
            occurred_at: Utc::now(),
        })
        .unwrap_err();
        assert_eq!(err, DomainError::EmptyCart);

        let item = line(500, 1);
        let err = Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id: UserId::new(),
            items: vec![item.clone(), item],
            shipping: shipping(),
            occurred_at: Utc::now(),
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn total_overflow_is_rejected_before_state_changes() {
        let huge = Decimal::MAX / Decimal::from(2) + Decimal::ONE;
        let huge_line = || {
            LineItem::snapshot(ProductId::generate(), "SKU-HUGE", "Huge", huge, 1).unwrap()
        };

        let err = Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id: UserId::new(),
            items: vec![huge_line(), huge_line()],
            shipping: shipping(),
            occurred_at: Utc::now(),
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut order = placed(vec![huge_line()]);
        let before = order.clone();
        let err = order
            .execute(&OrderCommand::AddLineItem(AddLineItem {
                order_id: *order.id(),
                item: huge_line(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(order, before);
    }

    #[test]
    fn placing_twice_conflicts() {
        let order = placed(vec![line(100, 1)]);
        let cmd = OrderCommand::PlaceOrder(PlaceOrder {
            order_id: *order.id(),
            customer_id: order.customer_id(),
            items: vec![line(100, 1)],
            shipping: shipping(),
            occurred_at: Utc::now(),
        });
        assert!(matches!(order.handle(&cmd), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn full_lifecycle_succeeds_in_sequence() {
        let mut order = placed(vec![line(100, 1)]);
        for status in [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered] {
            transition(&mut order, status).unwrap();
        }
        assert_eq!(order.status(), OrderStatus::Delivered);
        let trail: Vec<_> = order.history().iter().map(|h| h.to).collect();
        assert_eq!(
            trail,
            vec![
                OrderStatus::Created,
                OrderStatus::Paid,
                OrderStatus::Shipped,
                OrderStatus::Delivered
            ]
        );
    }

    #[test]
    fn delivered_to_paid_is_invalid() {
        let mut order = placed(vec![line(100, 1)]);
        for status in [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered] {
            transition(&mut order, status).unwrap();
        }
        let err = transition(&mut order, OrderStatus::Paid).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(transition(&mut order, OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn cancel_reachable_from_each_non_terminal_state() {
        let prefixes: [&[OrderStatus]; 3] = [
            &[],
            &[OrderStatus::Paid],
            &[OrderStatus::Paid, OrderStatus::Shipped],
        ];
        for prefix in prefixes {
            let mut order = placed(vec![line(100, 1)]);
            for status in prefix {
                transition(&mut order, *status).unwrap();
            }
            transition(&mut order, OrderStatus::Cancelled).unwrap();
            assert_eq!(order.status(), OrderStatus::Cancelled);
        }
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut order = placed(vec![line(100, 1)]);
        assert!(transition(&mut order, OrderStatus::Shipped).is_err());
        assert!(transition(&mut order, OrderStatus::Created).is_err());
        assert_eq!(order.version(), 1);
    }

    #[test]
    fn payment_locked_after_paid() {
        let mut order = placed(vec![line(100, 1)]);
        let set_payment = |order: &mut Order| {
            order.execute(&OrderCommand::SetPaymentInfo(SetPaymentInfo {
                order_id: *order.id(),
                payment: PaymentInfo {
                    method: "card".into(),
                    status: PaymentStatus::Authorized,
                    reference: None,
                    paid_at: None,
                },
                occurred_at: Utc::now(),
            }))
        };
        set_payment(&mut order).unwrap();
        transition(&mut order, OrderStatus::Paid).unwrap();
        set_payment(&mut order).unwrap();
        transition(&mut order, OrderStatus::Shipped).unwrap();
        assert!(matches!(set_payment(&mut order), Err(DomainError::OrderLocked(_))));
        assert_eq!(order.payment().map(|p| p.status), Some(PaymentStatus::Authorized));
    }

    #[test]
    fn tracking_requires_shipment() {
        let mut order = placed(vec![line(100, 1)]);
        let set_tracking = |order: &mut Order| {
            order.execute(&OrderCommand::SetTrackingInfo(SetTrackingInfo {
                order_id: *order.id(),
                tracking: TrackingInfo {
                    carrier: "UPS".into(),
                    tracking_number: "1Z999".into(),
                },
                occurred_at: Utc::now(),
            }))
        };
        assert!(matches!(set_tracking(&mut order), Err(DomainError::Conflict(_))));
        transition(&mut order, OrderStatus::Paid).unwrap();
        transition(&mut order, OrderStatus::Shipped).unwrap();
        set_tracking(&mut order).unwrap();
        assert_eq!(order.tracking().map(|t| t.carrier.as_str()), Some("UPS"));
    }

    #[test]
    fn line_items_mutable_only_while_created() {
        let first = line(1000, 2);
        let mut order = placed(vec![first.clone()]);

        let extra = line(250, 4);
        order
            .execute(&OrderCommand::AddLineItem(AddLineItem {
                order_id: *order.id(),
                item: extra.clone(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(order.total(), Decimal::new(3000, 2));

        order
            .execute(&OrderCommand::ChangeLineItemQuantity(ChangeLineItemQuantity {
                order_id: *order.id(),
                product_id: first.product_id,
                quantity: 1,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(order.total(), Decimal::new(2000, 2));

        order
            .execute(&OrderCommand::RemoveLineItem(RemoveLineItem {
                order_id: *order.id(),
                product_id: extra.product_id,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(order.total(), Decimal::new(1000, 2));
        assert_eq!(order.total(), order.computed_total());

        let remove_last = OrderCommand::RemoveLineItem(RemoveLineItem {
            order_id: *order.id(),
            product_id: first.product_id,
            occurred_at: Utc::now(),
        });
        assert_eq!(order.handle(&remove_last).unwrap_err().kind(), ErrorKind::Validation);

        transition(&mut order, OrderStatus::Paid).unwrap();
        let err = order
            .handle(&OrderCommand::AddLineItem(AddLineItem {
                order_id: *order.id(),
                item: line(100, 1),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderLocked(_)));
    }

    #[test]
    fn commands_on_unplaced_order_are_not_found() {
        let order = Order::empty(OrderId::generate(), UserId::new());
        let err = order
            .handle(&OrderCommand::ChangeStatus(ChangeStatus {
                order_id: *order.id(),
                status: OrderStatus::Paid,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn status_strategy() -> impl Strategy<Value = OrderStatus> {
            prop::sample::select(OrderStatus::ALL.to_vec())
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

            #[test]
            fn terminal_states_are_never_left(requests in prop::collection::vec(status_strategy(), 1..12)) {
                let mut order = placed(vec![line(100, 1)]);
                for next in requests {
                    let before = order.status();
                    let outcome = transition(&mut order, next);
                    if before.is_terminal() {
                        prop_assert!(outcome.is_err());
                        prop_assert_eq!(order.status(), before);
                    }
                    if outcome.is_ok() {
                        prop_assert!(before.can_transition_to(order.status()));
                    }
                }
                prop_assert_eq!(order.history().len() as u64, order.version());
            }
        }
    }
}
