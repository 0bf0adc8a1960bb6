//! Cart-to-order checkout.
//!
//! Stock is reserved with the store's conditional `adjust_stock`, one line at
//! a time. Any failure after the first reservation releases what was already
//! taken, so a failed checkout leaves stock, cart and orders as they were.
//!
//! ```text
//! load cart ─▶ price lines from live products ─▶ reserve stock ─▶ clear cart ─▶ persist order
//!                                                   │ fail           │ fail         │ fail
//!                                                   ▼                ▼              ▼
//!                                             release taken    release all    release all,
//!                                                                              restore cart
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use forgeshop_carts::{Cart, CartCommand, CartItem, ClearCart, RestoreItems};
use forgeshop_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, Event, ExpectedVersion, UserId,
};
use forgeshop_orders::{LineItem, Order, OrderId, PlaceOrder, ShippingInfo};
use forgeshop_products::ProductId;

use crate::config::CommerceConfig;
use crate::store::{CartStore, OrderStore, ProductStore};

#[derive(Clone)]
pub struct CheckoutService {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    config: CommerceConfig,
}

impl CheckoutService {
    pub fn new(
        carts: Arc<dyn CartStore>,
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        config: CommerceConfig,
    ) -> Self {
        Self {
            carts,
            products,
            orders,
            config,
        }
    }

    /// Convert the user's cart into an order.
    #[instrument(skip(self, shipping), fields(user_id = %user_id), err)]
    pub async fn checkout(&self, user_id: UserId, shipping: ShippingInfo) -> DomainResult<Order> {
        shipping.validate()?;

        let cart = self.carts.get_or_create(user_id).await?;
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let lines = self.price_lines(&cart).await?;
        let (order, events) = Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id: user_id,
            items: lines,
            shipping,
            occurred_at: Utc::now(),
        })?;

        let reserved = self.reserve(order.items()).await?;

        if let Err(err) = self.clear_cart(user_id, cart.version()).await {
            self.release(&reserved).await;
            return Err(err);
        }

        if let Err(err) = self.orders.insert(order.clone()).await {
            tracing::error!(order_id = %order.id(), error = %err, "order persist failed, compensating");
            self.release(&reserved).await;
            self.restore_cart(user_id, cart.items().to_vec()).await;
            return Err(err);
        }

        for event in &events {
            tracing::info!(
                order_id = %order.id(),
                event_type = event.event_type(),
                total = %order.total(),
                lines = order.items().len(),
                "order placed"
            );
        }
        Ok(order)
    }

    /// Snapshot every cart line from the current product record.
    ///
    /// Fails with `InsufficientStock` before anything is mutated.
    async fn price_lines(&self, cart: &Cart) -> DomainResult<Vec<LineItem>> {
        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let product = self
                .products
                .get(item.product_id)
                .await?
                .ok_or_else(|| DomainError::not_found(format!("product {}", item.product_id)))?;
            product.ensure_stock_for(item.quantity)?;
            lines.push(LineItem::snapshot(
                product.id,
                product.sku.clone(),
                product.base_name(&self.config.base_language),
                product.price,
                item.quantity,
            )?);
        }
        Ok(lines)
    }

    async fn reserve(&self, lines: &[LineItem]) -> DomainResult<Vec<(ProductId, i64)>> {
        let mut reserved = Vec::with_capacity(lines.len());
        for line in lines {
            match self.products.adjust_stock(line.product_id, -line.quantity).await {
                Ok(product) => {
                    tracing::debug!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        remaining = product.stock,
                        "stock reserved"
                    );
                    reserved.push((line.product_id, line.quantity));
                }
                Err(err) => {
                    self.release(&reserved).await;
                    return Err(err);
                }
            }
        }
        Ok(reserved)
    }

    async fn release(&self, reserved: &[(ProductId, i64)]) {
        for (product_id, quantity) in reserved {
            match self.products.adjust_stock(*product_id, *quantity).await {
                Ok(_) => tracing::warn!(product_id = %product_id, quantity, "reserved stock released"),
                Err(err) => tracing::error!(
                    product_id = %product_id,
                    quantity,
                    error = %err,
                    "failed to release reserved stock"
                ),
            }
        }
    }

    /// Clear only the cart revision that was priced.
    async fn clear_cart(&self, user_id: UserId, priced_version: u64) -> DomainResult<()> {
        let command = CartCommand::ClearCart(ClearCart {
            user_id,
            expected_version: ExpectedVersion::Exact(priced_version),
            occurred_at: Utc::now(),
        });
        self.carts
            .update(user_id, Box::new(move |cart: &mut Cart| cart.execute(&command)))
            .await
            .map(|_| ())
    }

    async fn restore_cart(&self, user_id: UserId, items: Vec<CartItem>) {
        let command = CartCommand::RestoreItems(RestoreItems {
            user_id,
            items,
            occurred_at: Utc::now(),
        });
        if let Err(err) = self
            .carts
            .update(user_id, Box::new(move |cart: &mut Cart| cart.execute(&command)))
            .await
        {
            tracing::error!(user_id = %user_id, error = %err, "failed to restore cart after checkout failure");
        }
    }
}
