use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use forgeshop_categories::CategoryId;
use forgeshop_core::{DomainError, DomainResult, Page, Translation, Translations};
use forgeshop_products::{LocalizedProduct, Product, ProductDraft, ProductFilter, ProductId};

use crate::config::CommerceConfig;
use crate::services::CategoryService;
use crate::store::{CategoryStore, ProductStore};

/// Product catalog operations.
///
/// Reads return [`LocalizedProduct`] views resolved against the requested
/// language with fallback to the configured base language.
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    categories: Arc<dyn CategoryStore>,
    category_service: CategoryService,
    config: CommerceConfig,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        categories: Arc<dyn CategoryStore>,
        category_service: CategoryService,
        config: CommerceConfig,
    ) -> Self {
        Self {
            products,
            categories,
            category_service,
            config,
        }
    }

    async fn ensure_categories_exist(&self, ids: &[CategoryId]) -> DomainResult<()> {
        for id in ids {
            if self.categories.get(*id).await?.is_none() {
                return Err(DomainError::not_found(format!("category {id}")));
            }
        }
        Ok(())
    }

    fn localize(&self, product: &Product, lang: Option<&str>) -> LocalizedProduct {
        product.localized(lang, &self.config.base_language)
    }

    #[instrument(skip(self, draft), fields(sku = %draft.sku), err)]
    pub async fn create(&self, draft: ProductDraft, initial_stock: i64) -> DomainResult<Product> {
        self.ensure_categories_exist(&draft.category_ids).await?;
        let product = Product::create(
            ProductId::generate(),
            draft,
            initial_stock,
            &self.config.base_language,
            Utc::now(),
        )?;
        self.products.insert(product.clone()).await?;
        tracing::info!(product_id = %product.id, stock = product.stock, "product created");
        Ok(product)
    }

    /// Raw product record (all translations).
    pub async fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    pub async fn get(&self, id: ProductId, lang: Option<&str>) -> DomainResult<LocalizedProduct> {
        Ok(self.localize(&self.product(id).await?, lang))
    }

    /// Full replace of everything except stock. Missing ids are not upserted.
    #[instrument(skip(self, draft), fields(product_id = %id), err)]
    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> DomainResult<Product> {
        self.ensure_categories_exist(&draft.category_ids).await?;
        let base = self.config.base_language.clone();
        self.products
            .modify(
                id,
                Box::new(move |product: &mut Product| product.replace(draft, &base, Utc::now())),
            )
            .await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete(&self, id: ProductId) -> DomainResult<()> {
        self.products.delete(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: Option<u32>,
        limit: Option<u32>,
        lang: Option<&str>,
    ) -> DomainResult<Page<LocalizedProduct>> {
        let page = self.config.page(page, limit)?;
        let products = self.products.list(filter, page).await?;
        Ok(products.map(|p| self.localize(&p, lang)))
    }

    /// Products of one category, optionally including every descendant category.
    #[instrument(skip(self), fields(category_id = %category_id), err)]
    pub async fn list_by_category(
        &self,
        category_id: CategoryId,
        include_subtree: bool,
        page: Option<u32>,
        limit: Option<u32>,
        lang: Option<&str>,
    ) -> DomainResult<Page<LocalizedProduct>> {
        let page = self.config.page(page, limit)?;
        let ids = if include_subtree {
            self.category_service.collect_subtree_ids(category_id).await?
        } else {
            self.category_service.get(category_id).await?;
            vec![category_id]
        };
        let products = self.products.list_in_categories(&ids, page).await?;
        Ok(products.map(|p| self.localize(&p, lang)))
    }

    /// Absolute stock set (administrative correction).
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn set_stock(&self, id: ProductId, quantity: i64) -> DomainResult<Product> {
        let product = self
            .products
            .modify(
                id,
                Box::new(move |product: &mut Product| product.set_stock(quantity, Utc::now())),
            )
            .await?;
        tracing::info!(product_id = %id, stock = product.stock, "stock set");
        Ok(product)
    }

    /// Atomically add `quantity` units.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn restock(&self, id: ProductId, quantity: i64) -> DomainResult<Product> {
        forgeshop_core::money::ensure_positive_quantity(quantity)?;
        let product = self.products.adjust_stock(id, quantity).await?;
        tracing::info!(product_id = %id, added = quantity, stock = product.stock, "product restocked");
        Ok(product)
    }

    pub async fn translations(&self, id: ProductId) -> DomainResult<Translations> {
        Ok(self.product(id).await?.translations)
    }

    pub async fn add_translation(
        &self,
        id: ProductId,
        lang: String,
        translation: Translation,
    ) -> DomainResult<Product> {
        self.products
            .modify(
                id,
                Box::new(move |product: &mut Product| {
                    product.add_translation(&lang, translation, Utc::now())
                }),
            )
            .await
    }

    pub async fn update_translation(
        &self,
        id: ProductId,
        lang: String,
        translation: Translation,
    ) -> DomainResult<Product> {
        self.products
            .modify(
                id,
                Box::new(move |product: &mut Product| {
                    product.update_translation(&lang, translation, Utc::now())
                }),
            )
            .await
    }

    pub async fn remove_translation(&self, id: ProductId, lang: String) -> DomainResult<Product> {
        let base = self.config.base_language.clone();
        self.products
            .modify(
                id,
                Box::new(move |product: &mut Product| {
                    product.remove_translation(&lang, &base, Utc::now())
                }),
            )
            .await
    }
}
