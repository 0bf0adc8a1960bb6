//! Translation overlays keyed by language code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Language code (e.g. `en`, `fa`, `pt-BR`).
pub type LanguageCode = String;

const MAX_LANGUAGE_CODE_LEN: usize = 16;
const MAX_NAME_LEN: usize = 256;

/// Localized name and description of a category or product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ValueObject for Translation {}

impl Translation {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("translation name cannot be empty"));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "translation name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Validate a language code: ASCII letters/digits, optionally separated by `-`.
pub fn validate_language_code(code: &str) -> DomainResult<()> {
    let well_formed = !code.is_empty()
        && code.len() <= MAX_LANGUAGE_CODE_LEN
        && code
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if well_formed {
        Ok(())
    } else {
        Err(DomainError::validation(format!("invalid language code '{code}'")))
    }
}

/// Language code → translation map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(BTreeMap<LanguageCode, Translation>);

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert (no validation; call [`Translations::ensure_base`]).
    pub fn with(mut self, lang: impl Into<LanguageCode>, translation: Translation) -> Self {
        self.0.insert(lang.into(), translation);
        self
    }

    pub fn get(&self, lang: &str) -> Option<&Translation> {
        self.0.get(lang)
    }

    pub fn contains(&self, lang: &str) -> bool {
        self.0.contains_key(lang)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Translation)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate every entry and require the base language to be present.
    pub fn ensure_base(&self, base_language: &str) -> DomainResult<()> {
        for (lang, translation) in &self.0 {
            validate_language_code(lang)?;
            translation.validate()?;
        }
        if !self.contains(base_language) {
            return Err(DomainError::validation(format!(
                "a '{base_language}' (base language) translation is required"
            )));
        }
        Ok(())
    }

    /// Add a translation for a language that does not have one yet.
    pub fn add(&mut self, lang: &str, translation: Translation) -> DomainResult<()> {
        validate_language_code(lang)?;
        translation.validate()?;
        if self.contains(lang) {
            return Err(DomainError::conflict(format!(
                "translation for '{lang}' already exists"
            )));
        }
        self.0.insert(lang.to_string(), translation);
        Ok(())
    }

    /// Replace the translation of an existing language.
    pub fn update(&mut self, lang: &str, translation: Translation) -> DomainResult<()> {
        translation.validate()?;
        match self.0.get_mut(lang) {
            Some(slot) => {
                *slot = translation;
                Ok(())
            }
            None => Err(DomainError::not_found(format!("translation '{lang}'"))),
        }
    }

    /// Remove a non-base translation.
    pub fn remove(&mut self, lang: &str, base_language: &str) -> DomainResult<Translation> {
        if lang == base_language {
            return Err(DomainError::validation(
                "the base language translation cannot be deleted",
            ));
        }
        self.0
            .remove(lang)
            .ok_or_else(|| DomainError::not_found(format!("translation '{lang}'")))
    }

    /// Resolve `lang`, falling back to the base language.
    ///
    /// Returns the language actually served alongside the translation.
    pub fn resolve<'a>(
        &'a self,
        lang: Option<&str>,
        base_language: &str,
    ) -> Option<(&'a str, &'a Translation)> {
        lang.and_then(|l| self.0.get_key_value(l))
            .or_else(|| self.0.get_key_value(base_language))
            .map(|(k, v)| (k.as_str(), v))
    }
}
