use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeshop_core::{DomainError, DomainResult, Entity, Translation, Translations, domain_id};

domain_id!(
    /// Category identifier.
    CategoryId
);

const MAX_SLUG_LEN: usize = 128;

/// Validate a URL-safe slug: lowercase ASCII alphanumerics separated by single hyphens.
pub fn validate_slug(slug: &str) -> DomainResult<()> {
    if slug.is_empty() {
        return Err(DomainError::validation("slug cannot be empty"));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(DomainError::validation(format!(
            "slug exceeds {MAX_SLUG_LEN} characters"
        )));
    }
    let well_formed = slug.split('-').all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    });
    if !well_formed {
        return Err(DomainError::validation(format!(
            "slug '{slug}' must be lowercase alphanumerics separated by single hyphens"
        )));
    }
    Ok(())
}

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub translations: Translations,
}

/// In-place update. The parent cannot change: moving a subtree would
/// invalidate every descendant's materialized path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub slug: Option<String>,
    pub translations: Option<Translations>,
}

/// A node of the category hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    /// Ancestor ids, root first, ending with the parent.
    pub path: Vec<CategoryId>,
    /// Depth in the tree (root = 0).
    pub level: u32,
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Category {
    /// Build a new category under an already-resolved parent.
    ///
    /// `parent` must be the persisted record for `draft.parent_id`; passing
    /// `None` while the draft names a parent yields `ParentNotFound`.
    pub fn create(
        id: CategoryId,
        draft: CategoryDraft,
        parent: Option<&Category>,
        base_language: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_slug(&draft.slug)?;
        draft.translations.ensure_base(base_language)?;

        let (path, level) = match (draft.parent_id, parent) {
            (None, _) => (Vec::new(), 0),
            (Some(parent_id), _) if parent_id == id => {
                return Err(DomainError::validation("a category cannot be its own parent"));
            }
            (Some(parent_id), None) => {
                return Err(DomainError::ParentNotFound(parent_id.to_string()));
            }
            (Some(parent_id), Some(parent)) => {
                if parent.id != parent_id {
                    return Err(DomainError::invariant("resolved parent does not match parent_id"));
                }
                if parent.path.contains(&id) {
                    return Err(DomainError::invariant("category would become its own ancestor"));
                }
                let mut path = parent.path.clone();
                path.push(parent.id);
                (path, parent.level + 1)
            }
        };

        Ok(Self {
            id,
            slug: draft.slug,
            parent_id: draft.parent_id,
            path,
            level,
            translations: draft.translations,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True if `other` is an ancestor of this category.
    pub fn descends_from(&self, other: CategoryId) -> bool {
        self.path.contains(&other)
    }

    pub fn apply_update(
        &mut self,
        update: CategoryUpdate,
        base_language: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if let Some(slug) = &update.slug {
            validate_slug(slug)?;
        }
        if let Some(translations) = &update.translations {
            translations.ensure_base(base_language)?;
        }
        if let Some(slug) = update.slug {
            self.slug = slug;
        }
        if let Some(translations) = update.translations {
            self.translations = translations;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn add_translation(
        &mut self,
        lang: &str,
        translation: Translation,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.translations.add(lang, translation)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_translation(
        &mut self,
        lang: &str,
        translation: Translation,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.translations.update(lang, translation)?;
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
