//! Equality filters for catalog listings.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgeshop_categories::CategoryId;
use forgeshop_core::{AttributeValue, DomainError, DomainResult, Money};

use crate::product::Product;

const ATTRIBUTE_PREFIX: &str = "attributes.";

/// One parsed equality criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterCriterion {
    Sku(String),
    Price(Money),
    Stock(i64),
    Category(CategoryId),
    Attribute { name: String, value: AttributeValue },
}

impl FilterCriterion {
    fn parse(key: &str, value: AttributeValue) -> DomainResult<Self> {
        let mismatch = || DomainError::validation(format!("filter '{key}' has an unsupported value type"));
        match key {
            "sku" => match value {
                AttributeValue::Text(s) => Ok(Self::Sku(s)),
                _ => Err(mismatch()),
            },
            "price" => match value {
                AttributeValue::Number(n) => Ok(Self::Price(n)),
                _ => Err(mismatch()),
            },
            "stock" => match value {
                AttributeValue::Number(n) if n.fract().is_zero() => {
                    i64::try_from(n).map(Self::Stock).map_err(|_| mismatch())
                }
                _ => Err(mismatch()),
            },
            "category" => match value {
                AttributeValue::Text(s) => Ok(Self::Category(s.parse()?)),
                _ => Err(mismatch()),
            },
            _ => match key.strip_prefix(ATTRIBUTE_PREFIX) {
                Some(name) if !name.is_empty() => Ok(Self::Attribute {
                    name: name.to_string(),
                    value,
                }),
                _ => Err(DomainError::validation(format!("unknown filter field '{key}'"))),
            },
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::Sku(sku) => product.sku == *sku,
            Self::Price(price) => product.price.normalize() == price.normalize(),
            Self::Stock(stock) => product.stock == *stock,
            Self::Category(id) => product.belongs_to(*id),
            Self::Attribute { name, value } => product
                .attributes
                .get(name)
                .is_some_and(|v| v.same_value(value)),
        }
    }
}

/// Conjunction of equality criteria. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    criteria: Vec<FilterCriterion>,
}

impl ProductFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an adapter-supplied `field → value` map.
    ///
    /// Supported fields: `sku`, `price`, `stock`, `category` and
    /// `attributes.<name>`.
    pub fn from_map(map: BTreeMap<String, AttributeValue>) -> DomainResult<Self> {
        let criteria = map
            .into_iter()
            .map(|(k, v)| FilterCriterion::parse(&k, v))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Self { criteria })
    }

    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.criteria.push(FilterCriterion::Sku(sku.into()));
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.criteria.push(FilterCriterion::Price(price));
        self
    }

    pub fn category(mut self, id: CategoryId) -> Self {
        self.criteria.push(FilterCriterion::Category(id));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.criteria.push(FilterCriterion::Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn criteria(&self) -> &[FilterCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.criteria.iter().all(|c| c.matches(product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{ProductDraft, ProductId};
    use chrono::Utc;
    use forgeshop_core::{AttributeMap, Translation, Translations};

    fn product(category: CategoryId) -> Product {
        Product::create(
            ProductId::generate(),
            ProductDraft {
                sku: "TEE-RED-M".to_string(),
                price: Decimal::new(1500, 2),
                category_ids: vec![category],
                attributes: AttributeMap::from([
                    ("color".to_string(), AttributeValue::from("red")),
                    ("size".to_string(), AttributeValue::from("M")),
                    ("organic".to_string(), AttributeValue::from(true)),
                ]),
                images: vec![],
                translations: Translations::new().with("en", Translation::new("Tee", "")),
            },
            4,
            "en",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn from_map_parses_known_fields() {
        let category = CategoryId::generate();
        let p = product(category);
        let filter = ProductFilter::from_map(BTreeMap::from([
            ("attributes.color".to_string(), AttributeValue::from("red")),
            ("price".to_string(), AttributeValue::Number(Decimal::new(15, 0))),
            ("category".to_string(), AttributeValue::text(category.to_string())),
            ("stock".to_string(), AttributeValue::from(4i64)),
        ]))
        .unwrap();
        assert_eq!(filter.criteria().len(), 4);
        assert!(filter.matches(&p));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = ProductFilter::from_map(BTreeMap::from([(
            "colour".to_string(),
            AttributeValue::from("red"),
        )]))
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        assert!(
            ProductFilter::from_map(BTreeMap::from([("price".to_string(), AttributeValue::from("cheap"))]))
                .is_err()
        );
    }

    #[test]
    fn all_criteria_must_match() {
        let p = product(CategoryId::generate());
        assert!(ProductFilter::new().matches(&p));
        assert!(ProductFilter::new().attribute("color", "red").attribute("organic", true).matches(&p));
        assert!(!ProductFilter::new().attribute("color", "red").attribute("size", "L").matches(&p));
        assert!(!ProductFilter::new().category(CategoryId::generate()).matches(&p));
    }
}
