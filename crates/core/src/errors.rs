use std::path::PathBuf;

use thiserror::Error;

/// Where a load failure originated, so operators can tell infrastructure
/// trouble apart from a bad catalog document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOrigin {
    Configuration,
    Database,
    File,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("catalog configuration invalid: {0}")]
    Config(String),
    #[error("catalog database connection failed: {0}")]
    Connection(String),
    #[error("catalog database query failed: {0}")]
    Query(String),
    #[error("catalog database row could not be mapped: {0}")]
    RowMapping(String),
    #[error("could not read catalog file `{path}`: {message}")]
    Io { path: PathBuf, message: String },
    #[error("could not parse catalog file `{path}`: {message}")]
    Parse { path: PathBuf, message: String },
}

impl LoadError {
    pub fn origin(&self) -> LoadOrigin {
        match self {
            Self::Config(_) => LoadOrigin::Configuration,
            Self::Connection(_) | Self::Query(_) | Self::RowMapping(_) => LoadOrigin::Database,
            Self::Io { .. } | Self::Parse { .. } => LoadOrigin::File,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Connection(_) => "connection",
            Self::Query(_) => "query",
            Self::RowMapping(_) => "row_mapping",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::errors::{LoadError, LoadOrigin};

    #[test]
    fn database_errors_are_distinct_from_file_errors() {
        let database = [
            LoadError::Connection("dial refused".to_owned()),
            LoadError::Query("relation does not exist".to_owned()),
            LoadError::RowMapping("row 3: mismatched types".to_owned()),
        ];
        for error in database {
            assert_eq!(error.origin(), LoadOrigin::Database, "{error}");
        }

        let file = [
            LoadError::Io { path: PathBuf::from("products.json"), message: "not found".to_owned() },
            LoadError::Parse { path: PathBuf::from("products.json"), message: "eof".to_owned() },
        ];
        for error in file {
            assert_eq!(error.origin(), LoadOrigin::File, "{error}");
        }

        assert_eq!(LoadError::Config("x".to_owned()).origin(), LoadOrigin::Configuration);
    }

    #[test]
    fn io_error_message_names_the_file() {
        let error = LoadError::Io {
            path: PathBuf::from("/srv/products.json"),
            message: "No such file or directory".to_owned(),
        };

        assert_eq!(error.error_class(), "io");
        assert_eq!(
            error.to_string(),
            "could not read catalog file `/srv/products.json`: No such file or directory"
        );
    }
}
