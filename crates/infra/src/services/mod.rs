//! Application services.
//!
//! Services own no state of their own; they orchestrate domain aggregates
//! over the store traits. [`CommerceServices`] wires one backend into every
//! service.

use std::sync::Arc;

use forgeshop_core::{DomainError, DomainResult};

use crate::config::{CommerceConfig, StorageBackend};
use crate::store::{
    CartStore, CategoryStore, InMemoryStore, OrderStore, PostgresStore, ProductStore, ReviewStore,
};

mod cart;
mod catalog;
mod categories;
mod checkout;
mod orders;
mod reviews;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use categories::CategoryService;
pub use checkout::CheckoutService;
pub use orders::OrderService;
pub use reviews::ReviewService;

#[derive(Clone)]
pub struct CommerceServices {
    pub config: CommerceConfig,
    pub categories: CategoryService,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub reviews: ReviewService,
}

impl CommerceServices {
    /// Wire every service to a single backend.
    pub fn with_store<S>(store: Arc<S>, config: CommerceConfig) -> Self
    where
        S: CategoryStore + ProductStore + CartStore + OrderStore + ReviewStore + 'static,
    {
        let categories: Arc<dyn CategoryStore> = store.clone();
        let products: Arc<dyn ProductStore> = store.clone();
        let carts: Arc<dyn CartStore> = store.clone();
        let orders: Arc<dyn OrderStore> = store.clone();
        let reviews: Arc<dyn ReviewStore> = store;

        let category_service =
            CategoryService::new(categories.clone(), products.clone(), config.clone());

        Self {
            catalog: CatalogService::new(
                products.clone(),
                categories,
                category_service.clone(),
                config.clone(),
            ),
            categories: category_service,
            carts: CartService::new(carts.clone(), products.clone()),
            checkout: CheckoutService::new(carts, products.clone(), orders.clone(), config.clone()),
            orders: OrderService::new(orders.clone(), products, config.clone()),
            reviews: ReviewService::new(reviews, orders, config.clone()),
            config,
        }
    }

    pub fn in_memory(config: CommerceConfig) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), config)
    }

    /// Connect, apply the schema and wire a Postgres backend.
    pub async fn postgres(config: CommerceConfig) -> DomainResult<Self> {
        let url = config
            .database_url
            .clone()
            .ok_or_else(|| DomainError::validation("postgres storage requires a database url"))?;
        let store = PostgresStore::connect(&url).await?;
        store.migrate().await?;
        tracing::info!("postgres storage ready");
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub async fn from_config(config: CommerceConfig) -> DomainResult<Self> {
        match config.storage {
            StorageBackend::Memory => {
                tracing::info!("using in-memory storage");
                Ok(Self::in_memory(config))
            }
            StorageBackend::Postgres => Self::postgres(config).await,
        }
    }
}
