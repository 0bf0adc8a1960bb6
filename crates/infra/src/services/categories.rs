use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use forgeshop_categories::{Category, CategoryDraft, CategoryId, CategoryTree, CategoryUpdate};
use forgeshop_core::{DomainError, DomainResult, Page, Translation, Translations};

use crate::config::CommerceConfig;
use crate::store::{CategoryStore, ProductStore};

/// Category hierarchy operations.
#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryStore>,
    products: Arc<dyn ProductStore>,
    config: CommerceConfig,
}

impl CategoryService {
    pub fn new(
        categories: Arc<dyn CategoryStore>,
        products: Arc<dyn ProductStore>,
        config: CommerceConfig,
    ) -> Self {
        Self {
            categories,
            products,
            config,
        }
    }

    /// Create a category, resolving its parent's path and level first.
    #[instrument(skip(self, draft), fields(slug = %draft.slug), err)]
    pub async fn create(&self, draft: CategoryDraft) -> DomainResult<Category> {
        let parent = match draft.parent_id {
            Some(parent_id) => Some(
                self.categories
                    .get(parent_id)
                    .await?
                    .ok_or_else(|| DomainError::ParentNotFound(parent_id.to_string()))?,
            ),
            None => None,
        };
        if let Some(parent) = &parent {
            if parent.level + 1 > self.config.max_category_depth {
                return Err(DomainError::validation(format!(
                    "category depth cannot exceed {}",
                    self.config.max_category_depth
                )));
            }
        }

        let category = Category::create(
            CategoryId::generate(),
            draft,
            parent.as_ref(),
            &self.config.base_language,
            Utc::now(),
        )?;
        self.categories.insert(category.clone()).await?;
        tracing::info!(category_id = %category.id, level = category.level, "category created");
        Ok(category)
    }

    pub async fn get(&self, id: CategoryId) -> DomainResult<Category> {
        self.categories
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("category {id}")))
    }

    pub async fn get_by_slug(&self, slug: &str) -> DomainResult<Category> {
        self.categories
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("category '{slug}'")))
    }

    /// In-place update of slug and translations; parent, path and level never change.
    #[instrument(skip(self, update), fields(category_id = %id), err)]
    pub async fn update(&self, id: CategoryId, update: CategoryUpdate) -> DomainResult<Category> {
        let base = self.config.base_language.clone();
        self.categories
            .modify(
                id,
                Box::new(move |category: &mut Category| {
                    category.apply_update(update, &base, Utc::now())
                }),
            )
            .await
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    pub async fn delete(&self, id: CategoryId) -> DomainResult<()> {
        self.get(id).await?;
        if self.categories.has_children(id).await? {
            return Err(DomainError::HasChildren(id.to_string()));
        }
        if self.products.count_in_category(id).await? > 0 {
            return Err(DomainError::HasProducts(id.to_string()));
        }
        self.categories.delete(id).await?;
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub async fn list(&self, page: Option<u32>, limit: Option<u32>) -> DomainResult<Page<Category>> {
        let page = self.config.page(page, limit)?;
        self.categories.list(page).await
    }

    pub async fn list_roots(&self) -> DomainResult<Vec<Category>> {
        self.categories.list_roots().await
    }

    pub async fn list_children(&self, parent_id: CategoryId) -> DomainResult<Vec<Category>> {
        self.get(parent_id).await?;
        self.categories.list_children(parent_id).await
    }

    /// Nested tree under `root_id`, children ordered by slug.
    #[instrument(skip(self), fields(root_id = %root_id), err)]
    pub async fn tree(&self, root_id: CategoryId) -> DomainResult<CategoryTree> {
        let root = self.get(root_id).await?;
        let descendants = self.categories.list_descendants(root_id).await?;
        CategoryTree::assemble(root, descendants, self.config.max_category_depth)
    }

    /// `root_id` and every category below it.
    pub async fn collect_subtree_ids(&self, root_id: CategoryId) -> DomainResult<Vec<CategoryId>> {
        Ok(self.tree(root_id).await?.collect_ids())
    }

    pub async fn translations(&self, id: CategoryId) -> DomainResult<Translations> {
        Ok(self.get(id).await?.translations)
    }

    pub async fn add_translation(
        &self,
        id: CategoryId,
        lang: String,
        translation: Translation,
    ) -> DomainResult<Category> {
        self.categories
            .modify(
                id,
                Box::new(move |category: &mut Category| {
                    category.add_translation(&lang, translation, Utc::now())
                }),
            )
            .await
    }

    pub async fn update_translation(
        &self,
        id: CategoryId,
        lang: String,
        translation: Translation,
    ) -> DomainResult<Category> {
        self.categories
            .modify(
                id,
                Box::new(move |category: &mut Category| {
                    category.update_translation(&lang, translation, Utc::now())
                }),
            )
            .await
    }

    pub async fn remove_translation(&self, id: CategoryId, lang: String) -> DomainResult<Category> {
        let base = self.config.base_language.clone();
        self.categories
            .modify(
                id,
                Box::new(move |category: &mut Category| {
                    category.remove_translation(&lang, &base, Utc::now())
                }),
            )
            .await
    }
}
