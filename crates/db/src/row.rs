use sqlx::postgres::PgRow;
use sqlx::Row;
use thiserror::Error;

use prodcat_core::domain::product::Product;
use prodcat_core::mapping::{MappingError, RawCategories, RawProduct};

pub const CATALOG_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "description",
    "picture",
    "price_usd_currency_code",
    "price_usd_units",
    "price_usd_nanos",
    "categories",
];

pub fn catalog_query(table_name: &str) -> String {
    format!("SELECT {} FROM {table_name}", CATALOG_COLUMNS.join(", "))
}

/// One catalog row as selected by [`catalog_query`], read by position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub picture: String,
    pub currency_code: String,
    pub units: i64,
    pub nanos: i32,
    pub categories: String,
}

#[derive(Debug, Error)]
pub enum RowDecodeError {
    #[error(transparent)]
    Column(#[from] sqlx::Error),
    #[error("column {column} value {value} does not fit in a 32-bit integer")]
    OutOfRange { column: &'static str, value: i64 },
}

impl ProductRow {
    pub fn from_pg_row(row: &PgRow) -> Result<Self, RowDecodeError> {
        let nanos_raw = integer_column(row, 6)?;

        Ok(Self {
            id: row.try_get(0usize)?,
            name: row.try_get(1usize)?,
            description: row.try_get(2usize)?,
            picture: row.try_get(3usize)?,
            currency_code: row.try_get(4usize)?,
            units: integer_column(row, 5)?,
            nanos: narrow_nanos(nanos_raw)?,
            categories: row.try_get(7usize)?,
        })
    }

    pub fn into_product(self) -> Result<Product, MappingError> {
        RawProduct {
            id: self.id,
            name: self.name,
            description: self.description,
            picture: self.picture,
            currency_code: self.currency_code,
            units: self.units,
            nanos: self.nanos,
            categories: RawCategories::Delimited(self.categories),
        }
        .into_product()
    }
}

/// Reads an integer column of any width (INT8, INT4 or INT2) as `i64`.
/// Deployed tables do not agree on the width of the price columns.
fn integer_column(row: &PgRow, index: usize) -> Result<i64, sqlx::Error> {
    match row.try_get::<i64, _>(index) {
        Ok(value) => Ok(value),
        Err(wide_error) => row
            .try_get::<i32, _>(index)
            .map(i64::from)
            .or_else(|_| row.try_get::<i16, _>(index).map(i64::from))
            .map_err(|_| wide_error),
    }
}

fn narrow_nanos(value: i64) -> Result<i32, RowDecodeError> {
    i32::try_from(value)
        .map_err(|_| RowDecodeError::OutOfRange { column: CATALOG_COLUMNS[6], value })
}
