//! Infrastructure layer: storage adapters, configuration and the service
//! layer that orchestrates the domain crates.

pub mod config;
pub mod services;
pub mod store;

pub use config::{CommerceConfig, StorageBackend};
pub use services::{
    CartService, CatalogService, CategoryService, CheckoutService, CommerceServices, OrderService,
    ReviewService,
};
pub use store::{
    CartStore, CategoryStore, InMemoryStore, OrderStore, PostgresStore, ProductStore, ReviewStore,
};
