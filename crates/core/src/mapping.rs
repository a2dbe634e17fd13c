//! Conversion of raw source records into catalog products.
//!
//! Both the file and the database source funnel their records through
//! [`RawProduct::into_product`], so category normalization and price checks
//! behave the same regardless of where a record came from.

use thiserror::Error;

use crate::domain::product::{Money, MoneyError, Product, ProductId};

pub const CATEGORY_DELIMITER: char = ',';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawCategories {
    List(Vec<String>),
    Delimited(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub picture: String,
    pub currency_code: String,
    pub units: i64,
    pub nanos: i32,
    pub categories: RawCategories,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("required field `{0}` is empty")]
    MissingField(&'static str),
    #[error("product `{product_id}` has an invalid price: {source}")]
    InvalidPrice {
        product_id: String,
        #[source]
        source: MoneyError,
    },
    #[error("product `{product_id}` has no categories")]
    EmptyCategories { product_id: String },
}

/// Lower-cases a delimited category column and splits it on `,`.
///
/// Segments are kept verbatim apart from case: `"Books,STATIONERY"` becomes
/// `["books", "stationery"]`.
pub fn split_categories(raw: &str) -> Vec<String> {
    raw.to_lowercase().split(CATEGORY_DELIMITER).map(str::to_string).collect()
}

impl RawCategories {
    fn normalize(self) -> Vec<String> {
        match self {
            Self::List(values) => values.into_iter().map(|value| value.to_lowercase()).collect(),
            Self::Delimited(raw) if raw.trim().is_empty() => Vec::new(),
            Self::Delimited(raw) => split_categories(&raw),
        }
    }
}

impl RawProduct {
    pub fn into_product(self) -> Result<Product, MappingError> {
        if self.id.trim().is_empty() {
            return Err(MappingError::MissingField("id"));
        }

        let price = Money::new(self.currency_code, self.units, self.nanos)
            .map_err(|source| MappingError::InvalidPrice { product_id: self.id.clone(), source })?;

        let categories = self.categories.normalize();
        if categories.is_empty() {
            return Err(MappingError::EmptyCategories { product_id: self.id });
        }

        Ok(Product {
            id: ProductId(self.id),
            name: self.name,
            description: self.description,
            picture: self.picture,
            price,
            categories,
        })
    }
}
