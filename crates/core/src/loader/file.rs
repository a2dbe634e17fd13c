//! JSON catalog document source.
//!
//! The document is a single `products` key holding product records in the
//! storefront wire shape (`priceUsd`, `currencyCode`, ...). Integer price
//! parts may be JSON numbers or numeric strings, and `categories` may be a
//! list or a comma-delimited string.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::CatalogSource;
use crate::catalog::{Catalog, SourceKind};
use crate::errors::LoadError;
use crate::mapping::{RawCategories, RawProduct};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    pub products: Vec<ProductRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub picture: String,
    #[serde(alias = "price_usd")]
    pub price_usd: PriceRecord,
    pub categories: CategoriesRecord,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PriceRecord {
    #[serde(alias = "currency_code")]
    pub currency_code: String,
    #[serde(default, deserialize_with = "integer_or_numeric_string")]
    pub units: i64,
    #[serde(default, deserialize_with = "integer_or_numeric_string")]
    pub nanos: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoriesRecord {
    List(Vec<String>),
    Delimited(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntegerOrText<T> {
    Integer(T),
    Text(String),
}

fn integer_or_numeric_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: std::fmt::Display,
{
    match IntegerOrText::<T>::deserialize(deserializer)? {
        IntegerOrText::Integer(value) => Ok(value),
        IntegerOrText::Text(text) => text
            .trim()
            .parse::<T>()
            .map_err(|error| serde::de::Error::custom(format!("`{text}` is not an integer: {error}"))),
    }
}

impl From<ProductRecord> for RawProduct {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            picture: record.picture,
            currency_code: record.price_usd.currency_code,
            units: record.price_usd.units,
            nanos: record.price_usd.nanos,
            categories: match record.categories {
                CategoriesRecord::List(values) => RawCategories::List(values),
                CategoriesRecord::Delimited(raw) => RawCategories::Delimited(raw),
            },
        }
    }
}

/// Parses a catalog document and maps every record.
pub fn parse_catalog(path: &Path, raw: &str) -> Result<Catalog, LoadError> {
    let document: CatalogDocument = serde_json::from_str(raw).map_err(|error| LoadError::Parse {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;

    let products = document
        .products
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            RawProduct::from(record).into_product().map_err(|error| LoadError::Parse {
                path: path.to_path_buf(),
                message: format!("products[{index}]: {error}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Catalog::new(products))
}

pub async fn load_from_file(path: &Path) -> Result<Catalog, LoadError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|error| {
        warn!(
            event_name = "catalog.file.read_failed",
            path = %path.display(),
            error = %error,
            "failed to open product catalog file"
        );
        LoadError::Io { path: path.to_path_buf(), message: error.to_string() }
    })?;

    let catalog = parse_catalog(path, &raw).map_err(|error| {
        warn!(
            event_name = "catalog.file.parse_failed",
            path = %path.display(),
            error = %error,
            "failed to parse the catalog file"
        );
        error
    })?;

    info!(
        event_name = "catalog.file.parsed",
        path = %path.display(),
        product_count = catalog.len(),
        "successfully parsed product catalog file"
    );
    Ok(catalog)
}

pub fn to_document(catalog: &Catalog) -> CatalogDocument {
    let products = catalog
        .products()
        .iter()
        .map(|product| ProductRecord {
            id: product.id.0.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            picture: product.picture.clone(),
            price_usd: PriceRecord {
                currency_code: product.price.currency_code().to_string(),
                units: product.price.units(),
                nanos: product.price.nanos(),
            },
            categories: CategoriesRecord::List(product.categories.clone()),
        })
        .collect();

    CatalogDocument { products }
}

pub async fn write_catalog_file(path: &Path, catalog: &Catalog) -> std::io::Result<()> {
    let rendered =
        serde_json::to_string_pretty(&to_document(catalog)).map_err(std::io::Error::other)?;
    tokio::fs::write(path, rendered).await
}

pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    async fn load_catalog(&self) -> Result<Catalog, LoadError> {
        load_from_file(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::{load_from_file, parse_catalog, write_catalog_file};
    use crate::domain::product::ProductId;
    use crate::errors::LoadError;

    const SAMPLE: &str = r#"{
  "products": [
    {
      "id": "OLJCESPC7Z",
      "name": "Sunglasses",
      "description": "Add a modern touch to your outfits with these sleek aviator sunglasses.",
      "picture": "/static/img/products/sunglasses.jpg",
      "priceUsd": { "currencyCode": "USD", "units": 19, "nanos": 990000000 },
      "categories": ["Accessories"]
    },
    {
      "id": "66VCHSJNUP",
      "name": "Tank Top",
      "description": "Perfectly cropped cotton tank.",
      "picture": "/static/img/products/tank-top.jpg",
      "priceUsd": { "currencyCode": "USD", "units": "18", "nanos": 990000000 },
      "categories": "Clothing,TOPS"
    },
    {
      "id": "1YMWWN1N4O",
      "name": "Watch",
      "price_usd": { "currency_code": "USD", "units": 109 },
      "categories": ["accessories"]
    }
  ]
}"#;

    fn path() -> &'static Path {
        Path::new("products.json")
    }

    #[test]
    fn valid_document_maps_every_record_with_lowercase_categories() {
        let catalog = parse_catalog(path(), SAMPLE).expect("sample should parse");

        assert_eq!(catalog.len(), 3);
        for product in catalog.products() {
            for category in &product.categories {
                assert_eq!(category, &category.to_lowercase());
            }
        }

        let tank = catalog.find(&ProductId("66VCHSJNUP".to_string())).expect("tank top");
        assert_eq!(tank.categories, vec!["clothing", "tops"]);
        assert_eq!(tank.price.units(), 18);

        let watch = catalog.find(&ProductId("1YMWWN1N4O".to_string())).expect("watch");
        assert_eq!(watch.price.nanos(), 0);
        assert_eq!(watch.description, "");
    }

    #[test]
    fn non_numeric_price_is_a_parse_error() {
        let raw = r#"{"products":[{"id":"A","name":"a","priceUsd":{"currencyCode":"USD","units":"ten","nanos":0},"categories":["x"]}]}"#;
        assert!(matches!(parse_catalog(path(), raw), Err(LoadError::Parse { .. })));

        let raw = r#"{"products":[{"id":"A","name":"a","priceUsd":{"currencyCode":"USD","units":1,"nanos":0.5},"categories":["x"]}]}"#;
        assert!(matches!(parse_catalog(path(), raw), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn schema_violations_are_parse_errors() {
        let cases = [
            ("missing name", r#"{"products":[{"id":"A","priceUsd":{"currencyCode":"USD"},"categories":["x"]}]}"#),
            ("missing price", r#"{"products":[{"id":"A","name":"a","categories":["x"]}]}"#),
            ("unknown field", r#"{"products":[{"id":"A","name":"a","priceUsd":{"currencyCode":"USD"},"categories":["x"],"stock":3}]}"#),
            ("wrong container", r#"{"items":[]}"#),
            ("bad categories", r#"{"products":[{"id":"A","name":"a","priceUsd":{"currencyCode":"USD"},"categories":7}]}"#),
            ("bad currency", r#"{"products":[{"id":"A","name":"a","priceUsd":{"currencyCode":"dollars"},"categories":["x"]}]}"#),
            ("empty categories", r#"{"products":[{"id":"A","name":"a","priceUsd":{"currencyCode":"USD"},"categories":[]}]}"#),
            ("not json", "products: []"),
        ];

        for (label, raw) in cases {
            let result = parse_catalog(path(), raw);
            assert!(matches!(result, Err(LoadError::Parse { .. })), "{label}: {result:?}");
        }
    }

    #[test]
    fn mapping_errors_name_the_record_index() {
        let raw = r#"{"products":[
            {"id":"A","name":"a","priceUsd":{"currencyCode":"USD"},"categories":["x"]},
            {"id":"B","name":"b","priceUsd":{"currencyCode":"USD","units":1,"nanos":-1},"categories":["x"]}
        ]}"#;

        let Err(LoadError::Parse { message, .. }) = parse_catalog(path(), raw) else {
            panic!("expected parse error");
        };
        assert!(message.starts_with("products[1]"), "{message}");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("products.json");

        let error = load_from_file(&missing).await.expect_err("file is missing");
        assert!(matches!(error, LoadError::Io { ref path, .. } if path == &missing));
    }

    #[tokio::test]
    async fn written_catalog_reloads_identically() {
        let dir = TempDir::new().expect("temp dir");
        let source = dir.path().join("products.json");
        let exported = dir.path().join("exported.json");
        fs::write(&source, SAMPLE).expect("write sample");

        let loaded = load_from_file(&source).await.expect("sample should load");
        write_catalog_file(&exported, &loaded).await.expect("export should succeed");
        let reloaded = load_from_file(&exported).await.expect("export should reload");

        assert_eq!(reloaded, loaded);
    }
}
