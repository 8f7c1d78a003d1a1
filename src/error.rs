use std::path::PathBuf;

use thiserror::Error;

use crate::model::RawRow;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("column {0:?} is missing from the row")]
    MissingColumn(String),

    #[error("column {column:?} is empty")]
    EmptyField { column: String },

    #[error("column {column:?} holds a malformed list {value:?}: {reason}")]
    MalformedCell {
        column: String,
        value: String,
        reason: String,
    },

    #[error("row could not be read as a record: {0}")]
    MalformedRecord(String),

    #[error("column {column:?} is not a valid number: {value:?}")]
    InvalidNumber { column: String, value: String },

    #[error("column {column:?} must be TRUE or FALSE, got {value:?}")]
    InvalidBoolean { column: String, value: String },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read source file {}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed header in {}: {message}", path.display())]
    Header { path: PathBuf, message: String },

    #[error("row {ordinal} rejected ({raw:?}): {source}")]
    Row {
        ordinal: usize,
        raw: RawRow,
        #[source]
        source: RowError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document store root {} is unavailable", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to document store at {}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("authentication failed for user {user:?}")]
    Authentication { user: String },

    #[error("invalid collection name {0:?}")]
    InvalidCollection(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("duplicate _id {id:?} in collection {collection:?}")]
    DuplicateKey { collection: String, id: String },

    #[error("document store operation failed")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode a stored document")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("authentication is enabled for user {user:?} but no password is configured")]
    MissingPassword { user: String },
}
