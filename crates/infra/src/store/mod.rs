//! Storage abstraction for the commerce aggregates.
//!
//! Each aggregate has its own async store trait. Multi-field changes are
//! passed in as boxed mutation closures so the backend can run them
//! atomically: under the collection write lock in memory, inside a
//! `SELECT ... FOR UPDATE` transaction in Postgres. A closure that returns an
//! error leaves the stored document untouched.

use async_trait::async_trait;

use forgeshop_carts::{Cart, CartEvent};
use forgeshop_categories::{Category, CategoryId};
use forgeshop_core::{DomainResult, Page, PageRequest, UserId};
use forgeshop_orders::{Order, OrderEvent, OrderFilter, OrderId};
use forgeshop_products::{Product, ProductFilter, ProductId};
use forgeshop_reviews::{RatingSummary, Review};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type CategoryMutation = Box<dyn FnOnce(&mut Category) -> DomainResult<()> + Send>;
pub type ProductMutation = Box<dyn FnOnce(&mut Product) -> DomainResult<()> + Send>;
pub type CartMutation = Box<dyn FnOnce(&mut Cart) -> DomainResult<Vec<CartEvent>> + Send>;
pub type OrderMutation = Box<dyn FnOnce(&mut Order) -> DomainResult<Vec<OrderEvent>> + Send>;

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Fails with `Conflict` if the id or slug is taken.
    async fn insert(&self, category: Category) -> DomainResult<()>;

    async fn get(&self, id: CategoryId) -> DomainResult<Option<Category>>;

    async fn get_by_slug(&self, slug: &str) -> DomainResult<Option<Category>>;

    /// Fails with `NotFound` if absent and `Conflict` if the new slug is taken.
    async fn modify(&self, id: CategoryId, mutation: CategoryMutation) -> DomainResult<Category>;

    async fn delete(&self, id: CategoryId) -> DomainResult<()>;

    /// All categories ordered by `(level, slug)`.
    async fn list(&self, page: PageRequest) -> DomainResult<Page<Category>>;

    async fn list_roots(&self) -> DomainResult<Vec<Category>>;

    /// Direct children ordered by slug.
    async fn list_children(&self, parent_id: CategoryId) -> DomainResult<Vec<Category>>;

    /// Every category whose materialized path contains `root`.
    async fn list_descendants(&self, root: CategoryId) -> DomainResult<Vec<Category>>;

    async fn has_children(&self, id: CategoryId) -> DomainResult<bool>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fails with `Conflict` if the id or SKU is taken.
    async fn insert(&self, product: Product) -> DomainResult<()>;

    async fn get(&self, id: ProductId) -> DomainResult<Option<Product>>;

    /// Fails with `NotFound` if absent and `Conflict` if the new SKU is taken.
    async fn modify(&self, id: ProductId, mutation: ProductMutation) -> DomainResult<Product>;

    async fn delete(&self, id: ProductId) -> DomainResult<()>;

    /// Products matching `filter`, ordered by SKU.
    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> DomainResult<Page<Product>>;

    /// Products referencing any of `category_ids`, ordered by SKU.
    async fn list_in_categories(
        &self,
        category_ids: &[CategoryId],
        page: PageRequest,
    ) -> DomainResult<Page<Product>>;

    async fn count_in_category(&self, category_id: CategoryId) -> DomainResult<u64>;

    /// Atomically apply `stock += delta` if the result stays non-negative.
    ///
    /// Fails with `InsufficientStock` (nothing changed) otherwise.
    async fn adjust_stock(&self, id: ProductId, delta: i64) -> DomainResult<Product>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> DomainResult<Option<Cart>>;

    /// Materialize an empty cart on first touch.
    async fn get_or_create(&self, user_id: UserId) -> DomainResult<Cart>;

    /// Run `mutation` against the user's cart (created if absent).
    async fn update(
        &self,
        user_id: UserId,
        mutation: CartMutation,
    ) -> DomainResult<(Cart, Vec<CartEvent>)>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fails with `Conflict` if the id is taken.
    async fn insert(&self, order: Order) -> DomainResult<()>;

    async fn get(&self, id: OrderId) -> DomainResult<Option<Order>>;

    async fn update(
        &self,
        id: OrderId,
        mutation: OrderMutation,
    ) -> DomainResult<(Order, Vec<OrderEvent>)>;

    /// Matching orders, newest first.
    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> DomainResult<Page<Order>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with `Conflict` if the (user, product, order) triple is taken.
    async fn insert(&self, review: Review) -> DomainResult<()>;

    async fn find_by_triple(
        &self,
        user_id: UserId,
        product_id: ProductId,
        order_id: OrderId,
    ) -> DomainResult<Option<Review>>;

    /// Reviews of a product, newest first.
    async fn list_for_product(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> DomainResult<Page<Review>>;

    async fn rating_summary(&self, product_id: ProductId) -> DomainResult<RatingSummary>;
}
