//! Runtime configuration for the commerce services.
//!
//! Values come from `FORGESHOP_*` environment variables. Malformed values fall
//! back to defaults with a warning; the only hard failure is selecting the
//! Postgres backend without a `DATABASE_URL`.

use forgeshop_core::{DomainError, DomainResult, PageRequest};
use forgeshop_core::localization::validate_language_code;

pub const BASE_LANGUAGE_ENV: &str = "FORGESHOP_BASE_LANGUAGE";
pub const DEFAULT_PAGE_SIZE_ENV: &str = "FORGESHOP_DEFAULT_PAGE_SIZE";
pub const MAX_PAGE_SIZE_ENV: &str = "FORGESHOP_MAX_PAGE_SIZE";
pub const MAX_CATEGORY_DEPTH_ENV: &str = "FORGESHOP_MAX_CATEGORY_DEPTH";
pub const STORAGE_ENV: &str = "FORGESHOP_STORAGE";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommerceConfig {
    /// Language every translation map must contain.
    pub base_language: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_category_depth: u32,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            base_language: "en".to_string(),
            default_page_size: 20,
            max_page_size: 100,
            max_category_depth: 32,
            storage: StorageBackend::Memory,
            database_url: None,
        }
    }
}

impl CommerceConfig {
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let defaults = Self::default();

        let base_language = match lookup(BASE_LANGUAGE_ENV) {
            Some(lang) => match validate_language_code(lang.trim()) {
                Ok(()) => lang.trim().to_string(),
                Err(err) => {
                    tracing::warn!(value = %lang, error = %err, "invalid {BASE_LANGUAGE_ENV}, using default");
                    defaults.base_language.clone()
                }
            },
            None => defaults.base_language.clone(),
        };

        let default_page_size =
            parse_positive(&lookup, DEFAULT_PAGE_SIZE_ENV, defaults.default_page_size);
        let max_page_size = parse_positive(&lookup, MAX_PAGE_SIZE_ENV, defaults.max_page_size);
        let max_category_depth =
            parse_positive(&lookup, MAX_CATEGORY_DEPTH_ENV, defaults.max_category_depth);

        let storage = match lookup(STORAGE_ENV).map(|v| v.trim().to_ascii_lowercase()) {
            None => StorageBackend::Memory,
            Some(v) if v == "memory" => StorageBackend::Memory,
            Some(v) if v == "postgres" => StorageBackend::Postgres,
            Some(other) => {
                tracing::warn!(value = %other, "unknown {STORAGE_ENV}, using in-memory storage");
                StorageBackend::Memory
            }
        };

        let database_url = lookup(DATABASE_URL_ENV).filter(|url| !url.trim().is_empty());
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(DomainError::validation(format!(
                "{DATABASE_URL_ENV} must be set when {STORAGE_ENV}=postgres"
            )));
        }

        Ok(Self {
            base_language,
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
            max_category_depth,
            storage,
            database_url,
        })
    }

    /// Resolve optional adapter paging input against the configured bounds.
    pub fn page(&self, page: Option<u32>, limit: Option<u32>) -> DomainResult<PageRequest> {
        PageRequest::resolve(page, limit, self.default_page_size, self.max_page_size)
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                tracing::warn!(key, value = %raw, default, "invalid numeric setting, using default");
                default
            }
        },
    }
}
