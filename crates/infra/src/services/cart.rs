use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use forgeshop_carts::{
    AddItem, Cart, CartCommand, CartItemId, ClearCart, RemoveItem, UpdateItemQuantity,
};
use forgeshop_core::money::ensure_positive_quantity;
use forgeshop_core::{Aggregate, DomainError, DomainResult, Event, ExpectedVersion, UserId};
use forgeshop_products::{Product, ProductId};

use crate::store::{CartStore, ProductStore};

/// Cart operations. Price and stock always come from the live product record.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartStore>, products: Arc<dyn ProductStore>) -> Self {
        Self { carts, products }
    }

    async fn live_product(&self, id: ProductId) -> DomainResult<Product> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    async fn execute(&self, user_id: UserId, command: CartCommand) -> DomainResult<Cart> {
        let (cart, events) = self
            .carts
            .update(user_id, Box::new(move |cart: &mut Cart| cart.execute(&command)))
            .await?;
        for event in &events {
            tracing::info!(
                user_id = %user_id,
                event_type = event.event_type(),
                total = %cart.total(),
                "cart updated"
            );
        }
        Ok(cart)
    }

    /// The user's cart; an empty one is created on first touch.
    pub async fn get_or_create(&self, user_id: UserId) -> DomainResult<Cart> {
        self.carts.get_or_create(user_id).await
    }

    /// Add `quantity` units, merging into an existing line for the same product.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> DomainResult<Cart> {
        ensure_positive_quantity(quantity)?;
        let product = self.live_product(product_id).await?;
        self.execute(
            user_id,
            CartCommand::AddItem(AddItem {
                user_id,
                product_id,
                quantity,
                unit_price: product.price,
                available_stock: product.stock,
                new_item_id: CartItemId::generate(),
                occurred_at: Utc::now(),
            }),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id), err)]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> DomainResult<Cart> {
        ensure_positive_quantity(quantity)?;
        let cart = self.carts.get_or_create(user_id).await?;
        let product_id = cart
            .item(item_id)
            .map(|item| item.product_id)
            .ok_or_else(|| DomainError::ItemNotFound(item_id.to_string()))?;
        let product = self.live_product(product_id).await?;
        self.execute(
            user_id,
            CartCommand::UpdateItemQuantity(UpdateItemQuantity {
                user_id,
                item_id,
                quantity,
                available_stock: product.stock,
                occurred_at: Utc::now(),
            }),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id), err)]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> DomainResult<Cart> {
        self.execute(
            user_id,
            CartCommand::RemoveItem(RemoveItem {
                user_id,
                item_id,
                occurred_at: Utc::now(),
            }),
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn clear(&self, user_id: UserId) -> DomainResult<Cart> {
        self.execute(
            user_id,
            CartCommand::ClearCart(ClearCart {
                user_id,
                expected_version: ExpectedVersion::Any,
                occurred_at: Utc::now(),
            }),
        )
        .await
    }
}
