use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeshop_categories::CategoryId;
use forgeshop_core::money::ensure_positive_price;
use forgeshop_core::{
    AttributeMap, DomainError, DomainResult, Entity, Money, Translation, Translations, domain_id,
};

domain_id!(
    /// Product identifier.
    ProductId
);

const MAX_SKU_LEN: usize = 64;

/// Caller-supplied product content. Stock is deliberately absent: it is only
/// set at creation and afterwards owned by the stock operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub sku: String,
    pub price: Money,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default)]
    pub images: Vec<String>,
    pub translations: Translations,
}

impl ProductDraft {
    fn validate(&self, base_language: &str) -> DomainResult<()> {
        let sku = self.sku.trim();
        if sku.is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if sku.len() > MAX_SKU_LEN {
            return Err(DomainError::validation(format!(
                "SKU exceeds {MAX_SKU_LEN} characters"
            )));
        }
        ensure_positive_price(self.price)?;
        if self.attributes.keys().any(|k| k.trim().is_empty()) {
            return Err(DomainError::validation("attribute names cannot be empty"));
        }
        if self.images.iter().any(|i| i.trim().is_empty()) {
            return Err(DomainError::validation("image references cannot be empty"));
        }
        self.translations.ensure_base(base_language)
    }
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub price: Money,
    pub stock: i64,
    pub category_ids: Vec<CategoryId>,
    pub attributes: AttributeMap,
    pub images: Vec<String>,
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Product as served in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedProduct {
    pub id: ProductId,
    pub sku: String,
    pub price: Money,
    pub stock: i64,
    pub category_ids: Vec<CategoryId>,
    pub attributes: AttributeMap,
    pub images: Vec<String>,
    /// Language the name/description were taken from (requested or base).
    pub language: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn dedup_categories(mut ids: Vec<CategoryId>) -> Vec<CategoryId> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}

impl Product {
    pub fn create(
        id: ProductId,
        draft: ProductDraft,
        initial_stock: i64,
        base_language: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        draft.validate(base_language)?;
        if initial_stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }

        Ok(Self {
            id,
            sku: draft.sku.trim().to_string(),
            price: draft.price,
            stock: initial_stock,
            category_ids: dedup_categories(draft.category_ids),
            attributes: draft.attributes,
            images: draft.images,
            translations: draft.translations,
            created_at: now,
            updated_at: now,
        })
    }

    /// Full replace of the caller-owned content; stock is left untouched.
    pub fn replace(
        &mut self,
        draft: ProductDraft,
        base_language: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        draft.validate(base_language)?;
        self.sku = draft.sku.trim().to_string();
        self.price = draft.price;
        self.category_ids = dedup_categories(draft.category_ids);
        self.attributes = draft.attributes;
        self.images = draft.images;
        self.translations = draft.translations;
        self.updated_at = now;
        Ok(())
    }

    pub fn belongs_to(&self, category_id: CategoryId) -> bool {
        self.category_ids.contains(&category_id)
    }

    pub fn belongs_to_any(&self, category_ids: &[CategoryId]) -> bool {
        self.category_ids.iter().any(|c| category_ids.contains(c))
    }

    /// Display name in the base language (used for order line snapshots).
    pub fn base_name(&self, base_language: &str) -> &str {
        self.translations
            .resolve(None, base_language)
            .map(|(_, t)| t.name.as_str())
            .unwrap_or(self.sku.as_str())
    }

    pub fn localized(&self, lang: Option<&str>, base_language: &str) -> LocalizedProduct {
        let (language, name, description) = match self.translations.resolve(lang, base_language) {
            Some((language, t)) => (language.to_string(), t.name.clone(), t.description.clone()),
            None => (base_language.to_string(), self.sku.clone(), String::new()),
        };
        LocalizedProduct {
            id: self.id,
            sku: self.sku.clone(),
            price: self.price,
            stock: self.stock,
            category_ids: self.category_ids.clone(),
            attributes: self.attributes.clone(),
            images: self.images.clone(),
            language,
            name,
            description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Absolute stock set.
    pub fn set_stock(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        self.stock = quantity;
        self.updated_at = now;
        Ok(())
    }

    /// Conditional stock change: applies `delta` only if the result stays >= 0.
    pub fn adjust_stock(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<i64> {
        let next = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock adjustment overflows"))?;
        if next < 0 {
            return Err(DomainError::insufficient_stock(self.id, -delta, self.stock));
        }
        self.stock = next;
        self.updated_at = now;
        Ok(next)
    }

    pub fn has_stock_for(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }

    pub fn ensure_stock_for(&self, quantity: i64) -> DomainResult<()> {
        if self.has_stock_for(quantity) {
            Ok(())
        } else {
            Err(DomainError::insufficient_stock(self.id, quantity, self.stock))
        }
    }

    pub fn add_translation(&mut self, lang: &str, t: Translation, now: DateTime<Utc>) -> DomainResult<()> {
        self.translations.add(lang, t)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_translation(&mut self, lang: &str, t: Translation, now: DateTime<Utc>) -> DomainResult<()> {
        self.translations.update(lang, t)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_translation(
        &mut self,
        lang: &str,
        base_language: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.translations.remove(lang, base_language)?;
        self.updated_at = now;
        Ok(())
    }
}
