use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use forgeshop_carts::{Cart, CartEvent};
use forgeshop_categories::{Category, CategoryId};
use forgeshop_core::{AggregateRoot, DomainError, DomainResult, Page, PageRequest, UserId};
use forgeshop_orders::{Order, OrderEvent, OrderFilter, OrderId};
use forgeshop_products::{Product, ProductFilter, ProductId};
use forgeshop_reviews::{RatingSummary, Review, ReviewId};

use super::{
    CartMutation, CartStore, CategoryMutation, CategoryStore, OrderMutation, OrderStore,
    ProductMutation, ProductStore, ReviewStore,
};

/// In-memory document store implementing every store trait.
///
/// Intended for tests/dev. Each collection sits behind its own lock, and
/// mutation closures run while that lock is held.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    categories: RwLock<HashMap<CategoryId, Category>>,
    products: RwLock<HashMap<ProductId, Product>>,
    carts: RwLock<HashMap<UserId, Cart>>,
    orders: RwLock<HashMap<OrderId, Order>>,
    reviews: RwLock<HashMap<ReviewId, Review>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> DomainResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| DomainError::infrastructure("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> DomainResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| DomainError::infrastructure("in-memory store lock poisoned"))
}

#[async_trait]
impl CategoryStore for InMemoryStore {
    async fn insert(&self, category: Category) -> DomainResult<()> {
        let mut map = write(&self.categories)?;
        if map.contains_key(&category.id) {
            return Err(DomainError::conflict(format!("category {} already exists", category.id)));
        }
        if map.values().any(|c| c.slug == category.slug) {
            return Err(DomainError::conflict(format!("slug '{}' is already in use", category.slug)));
        }
        map.insert(category.id, category);
        Ok(())
    }

    async fn get(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        Ok(read(&self.categories)?.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> DomainResult<Option<Category>> {
        Ok(read(&self.categories)?
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn modify(&self, id: CategoryId, mutation: CategoryMutation) -> DomainResult<Category> {
        let mut map = write(&self.categories)?;
        let mut category = map
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("category {id}")))?;
        mutation(&mut category)?;
        if category.id != id {
            return Err(DomainError::invariant("category id cannot change"));
        }
        if map.values().any(|c| c.id != id && c.slug == category.slug) {
            return Err(DomainError::conflict(format!("slug '{}' is already in use", category.slug)));
        }
        map.insert(id, category.clone());
        Ok(category)
    }

    async fn delete(&self, id: CategoryId) -> DomainResult<()> {
        write(&self.categories)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("category {id}")))
    }

    async fn list(&self, page: PageRequest) -> DomainResult<Page<Category>> {
        let mut all: Vec<Category> = read(&self.categories)?.values().cloned().collect();
        all.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.slug.cmp(&b.slug)));
        Ok(page.paginate(all))
    }

    async fn list_roots(&self) -> DomainResult<Vec<Category>> {
        let mut roots: Vec<Category> = read(&self.categories)?
            .values()
            .filter(|c| c.is_root())
            .cloned()
            .collect();
        roots.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(roots)
    }

    async fn list_children(&self, parent_id: CategoryId) -> DomainResult<Vec<Category>> {
        let mut children: Vec<Category> = read(&self.categories)?
            .values()
            .filter(|c| c.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(children)
    }

    async fn list_descendants(&self, root: CategoryId) -> DomainResult<Vec<Category>> {
        Ok(read(&self.categories)?
            .values()
            .filter(|c| c.descends_from(root))
            .cloned()
            .collect())
    }

    async fn has_children(&self, id: CategoryId) -> DomainResult<bool> {
        Ok(read(&self.categories)?
            .values()
            .any(|c| c.parent_id == Some(id)))
    }
}

fn sorted_by_sku(mut products: Vec<Product>) -> Vec<Product> {
    products.sort_by(|a, b| a.sku.cmp(&b.sku));
    products
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert(&self, product: Product) -> DomainResult<()> {
        let mut map = write(&self.products)?;
        if map.contains_key(&product.id) {
            return Err(DomainError::conflict(format!("product {} already exists", product.id)));
        }
        if map.values().any(|p| p.sku == product.sku) {
            return Err(DomainError::conflict(format!("sku '{}' is already in use", product.sku)));
        }
        map.insert(product.id, product);
        Ok(())
    }

    async fn get(&self, id: ProductId) -> DomainResult<Option<Product>> {
        Ok(read(&self.products)?.get(&id).cloned())
    }

    async fn modify(&self, id: ProductId, mutation: ProductMutation) -> DomainResult<Product> {
        let mut map = write(&self.products)?;
        let mut product = map
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        mutation(&mut product)?;
        if product.id != id {
            return Err(DomainError::invariant("product id cannot change"));
        }
        if map.values().any(|p| p.id != id && p.sku == product.sku) {
            return Err(DomainError::conflict(format!("sku '{}' is already in use", product.sku)));
        }
        map.insert(id, product.clone());
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> DomainResult<()> {
        write(&self.products)?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> DomainResult<Page<Product>> {
        let matching = read(&self.products)?
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(page.paginate(sorted_by_sku(matching)))
    }

    async fn list_in_categories(
        &self,
        category_ids: &[CategoryId],
        page: PageRequest,
    ) -> DomainResult<Page<Product>> {
        let matching = read(&self.products)?
            .values()
            .filter(|p| p.belongs_to_any(category_ids))
            .cloned()
            .collect();
        Ok(page.paginate(sorted_by_sku(matching)))
    }

    async fn count_in_category(&self, category_id: CategoryId) -> DomainResult<u64> {
        Ok(read(&self.products)?
            .values()
            .filter(|p| p.belongs_to(category_id))
            .count() as u64)
    }

    async fn adjust_stock(&self, id: ProductId, delta: i64) -> DomainResult<Product> {
        let mut map = write(&self.products)?;
        let product = map
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        product.adjust_stock(delta, Utc::now())?;
        Ok(product.clone())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn get(&self, user_id: UserId) -> DomainResult<Option<Cart>> {
        Ok(read(&self.carts)?.get(&user_id).cloned())
    }

    async fn get_or_create(&self, user_id: UserId) -> DomainResult<Cart> {
        let mut map = write(&self.carts)?;
        Ok(map
            .entry(user_id)
            .or_insert_with(|| Cart::new(user_id, Utc::now()))
            .clone())
    }

    async fn update(
        &self,
        user_id: UserId,
        mutation: CartMutation,
    ) -> DomainResult<(Cart, Vec<CartEvent>)> {
        let mut map = write(&self.carts)?;
        let mut cart = map
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::new(user_id, Utc::now()));
        let events = mutation(&mut cart)?;
        map.insert(user_id, cart.clone());
        Ok((cart, events))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert(&self, order: Order) -> DomainResult<()> {
        let mut map = write(&self.orders)?;
        let id = *order.id();
        if map.contains_key(&id) {
            return Err(DomainError::conflict(format!("order {id} already exists")));
        }
        map.insert(id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> DomainResult<Option<Order>> {
        Ok(read(&self.orders)?.get(&id).cloned())
    }

    async fn update(
        &self,
        id: OrderId,
        mutation: OrderMutation,
    ) -> DomainResult<(Order, Vec<OrderEvent>)> {
        let mut map = write(&self.orders)?;
        let mut order = map
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
        let events = mutation(&mut order)?;
        map.insert(id, order.clone());
        Ok((order, events))
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> DomainResult<Page<Order>> {
        let mut matching: Vec<Order> = read(&self.orders)?
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        Ok(page.paginate(matching))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn insert(&self, review: Review) -> DomainResult<()> {
        let mut map = write(&self.reviews)?;
        if map.values().any(|r| r.triple() == review.triple()) {
            return Err(DomainError::conflict(
                "this purchase has already been reviewed",
            ));
        }
        if map.contains_key(&review.id) {
            return Err(DomainError::conflict(format!("review {} already exists", review.id)));
        }
        map.insert(review.id, review);
        Ok(())
    }

    async fn find_by_triple(
        &self,
        user_id: UserId,
        product_id: ProductId,
        order_id: OrderId,
    ) -> DomainResult<Option<Review>> {
        Ok(read(&self.reviews)?
            .values()
            .find(|r| r.triple() == (user_id, product_id, order_id))
            .cloned())
    }

    async fn list_for_product(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> DomainResult<Page<Review>> {
        let mut reviews: Vec<Review> = read(&self.reviews)?
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page.paginate(reviews))
    }

    async fn rating_summary(&self, product_id: ProductId) -> DomainResult<RatingSummary> {
        let map = read(&self.reviews)?;
        Ok(RatingSummary::from_reviews(
            map.values().filter(|r| r.product_id == product_id),
        ))
    }
}
