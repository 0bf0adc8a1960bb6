use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use forgeshop_core::money::ensure_positive_quantity;
use forgeshop_core::{Aggregate, AggregateRoot, DomainError, DomainResult, Event, Page, UserId};
use forgeshop_orders::{
    AddLineItem, ChangeLineItemQuantity, ChangeStatus, LineItem, Order, OrderCommand, OrderEvent,
    OrderFilter, OrderId, OrderStatus, PaymentInfo, RemoveLineItem, SetPaymentInfo, SetTrackingInfo,
    TrackingInfo,
};
use forgeshop_products::ProductId;

use crate::config::CommerceConfig;
use crate::store::{OrderStore, ProductStore};

/// Post-checkout order management.
///
/// Line item edits keep stock in step with the order: units are reserved
/// before a line grows and released after it shrinks or disappears.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    config: CommerceConfig,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
        config: CommerceConfig,
    ) -> Self {
        Self {
            orders,
            products,
            config,
        }
    }

    pub async fn get(&self, id: OrderId) -> DomainResult<Order> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))
    }

    async fn execute(&self, id: OrderId, command: OrderCommand) -> DomainResult<Order> {
        let (order, events) = self
            .orders
            .update(id, Box::new(move |order: &mut Order| order.execute(&command)))
            .await?;
        record(&order, &events);
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status), err)]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> DomainResult<Order> {
        self.execute(
            id,
            OrderCommand::ChangeStatus(ChangeStatus {
                order_id: id,
                status,
                occurred_at: Utc::now(),
            }),
        )
        .await
    }

    #[instrument(skip(self, payment), fields(order_id = %id), err)]
    pub async fn set_payment_info(&self, id: OrderId, payment: PaymentInfo) -> DomainResult<Order> {
        self.execute(
            id,
            OrderCommand::SetPaymentInfo(SetPaymentInfo {
                order_id: id,
                payment,
                occurred_at: Utc::now(),
            }),
        )
        .await
    }

    #[instrument(skip(self, tracking), fields(order_id = %id), err)]
    pub async fn set_tracking_info(
        &self,
        id: OrderId,
        tracking: TrackingInfo,
    ) -> DomainResult<Order> {
        self.execute(
            id,
            OrderCommand::SetTrackingInfo(SetTrackingInfo {
                order_id: id,
                tracking,
                occurred_at: Utc::now(),
            }),
        )
        .await
    }

    /// A customer's orders, newest first.
    pub async fn list_by_customer(
        &self,
        customer_id: UserId,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> DomainResult<Page<Order>> {
        self.list(&OrderFilter::for_customer(customer_id), page, limit)
            .await
    }

    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> DomainResult<Page<Order>> {
        let request = self.config.page(page, limit)?;
        self.orders.list(filter, request).await
    }

    /// Add a new line priced from the live product, reserving its stock.
    #[instrument(skip(self), fields(order_id = %id, product_id = %product_id), err)]
    pub async fn add_item(
        &self,
        id: OrderId,
        product_id: ProductId,
        quantity: i64,
    ) -> DomainResult<Order> {
        ensure_positive_quantity(quantity)?;
        let order = self.get(id).await?;
        ensure_items_mutable(&order)?;
        if order.contains_product(product_id) {
            return Err(DomainError::conflict(format!(
                "product {product_id} is already on the order"
            )));
        }

        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;
        let item = LineItem::snapshot(
            product.id,
            product.sku.clone(),
            product.base_name(&self.config.base_language),
            product.price,
            quantity,
        )?;

        self.products.adjust_stock(product_id, -quantity).await?;
        let result = self
            .execute(
                id,
                OrderCommand::AddLineItem(AddLineItem {
                    order_id: id,
                    item,
                    occurred_at: Utc::now(),
                }),
            )
            .await;
        if result.is_err() {
            self.release(product_id, quantity).await;
        }
        result
    }

    /// Set a line's quantity, reserving or releasing the difference.
    #[instrument(skip(self), fields(order_id = %id, product_id = %product_id), err)]
    pub async fn change_item_quantity(
        &self,
        id: OrderId,
        product_id: ProductId,
        quantity: i64,
    ) -> DomainResult<Order> {
        ensure_positive_quantity(quantity)?;
        let order = self.get(id).await?;
        ensure_items_mutable(&order)?;
        let previous = order
            .item(product_id)
            .map(|item| item.quantity)
            .ok_or_else(|| DomainError::ItemNotFound(format!("product {product_id} on order {id}")))?;

        let delta = quantity - previous;
        if delta == 0 {
            return Ok(order);
        }
        if delta > 0 {
            self.products.adjust_stock(product_id, -delta).await?;
        }

        let command = ChangeLineItemQuantity {
            order_id: id,
            product_id,
            quantity,
            occurred_at: Utc::now(),
        };
        let result = self
            .orders
            .update(
                id,
                Box::new(move |order: &mut Order| {
                    ensure_line_unchanged(order, product_id, previous)?;
                    order.execute(&OrderCommand::ChangeLineItemQuantity(command))
                }),
            )
            .await
            .map(|(order, events)| {
                record(&order, &events);
                order
            });

        match (&result, delta > 0) {
            (Err(_), true) => self.release(product_id, delta).await,
            (Ok(_), false) => self.release(product_id, -delta).await,
            _ => {}
        }
        result
    }

    /// Drop a line and return its units to stock.
    #[instrument(skip(self), fields(order_id = %id, product_id = %product_id), err)]
    pub async fn remove_item(&self, id: OrderId, product_id: ProductId) -> DomainResult<Order> {
        let order = self.get(id).await?;
        ensure_items_mutable(&order)?;
        let previous = order
            .item(product_id)
            .map(|item| item.quantity)
            .ok_or_else(|| DomainError::ItemNotFound(format!("product {product_id} on order {id}")))?;

        let command = RemoveLineItem {
            order_id: id,
            product_id,
            occurred_at: Utc::now(),
        };
        let (order, events) = self
            .orders
            .update(
                id,
                Box::new(move |order: &mut Order| {
                    ensure_line_unchanged(order, product_id, previous)?;
                    order.execute(&OrderCommand::RemoveLineItem(command))
                }),
            )
            .await?;
        record(&order, &events);

        self.release(product_id, previous).await;
        Ok(order)
    }

    async fn release(&self, product_id: ProductId, quantity: i64) {
        if let Err(err) = self.products.adjust_stock(product_id, quantity).await {
            tracing::error!(
                product_id = %product_id,
                quantity,
                error = %err,
                "failed to return stock"
            );
        }
    }
}

fn record(order: &Order, events: &[OrderEvent]) {
    for event in events {
        tracing::info!(
            order_id = %order.id(),
            event_type = event.event_type(),
            status = %order.status(),
            total = %order.total(),
            "order updated"
        );
    }
}

fn ensure_items_mutable(order: &Order) -> DomainResult<()> {
    if order.status() != OrderStatus::Created {
        return Err(DomainError::OrderLocked(format!(
            "line items cannot change once the order is {}",
            order.status()
        )));
    }
    Ok(())
}

/// Stock was sized against `expected`; refuse to apply on top of a newer line.
fn ensure_line_unchanged(order: &Order, product_id: ProductId, expected: i64) -> DomainResult<()> {
    match order.item(product_id) {
        Some(item) if item.quantity == expected => Ok(()),
        Some(_) => Err(DomainError::conflict(
            "order line changed concurrently, retry",
        )),
        None => Err(DomainError::ItemNotFound(format!(
            "product {product_id} on order {}",
            order.id()
        ))),
    }
}
