// Error Types
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A requested table is absent, or an empty table was given where a row is required.
    #[error("missing data: {0}")]
    MissingData(String),

    /// A field the transforms rely on is absent or holds unusable values.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value has no JSON-compatible form.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("polars error: {0}")]
    Polars(#[source] PolarsError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<PolarsError> for Error {
    fn from(err: PolarsError) -> Self {
        match err {
            PolarsError::ColumnNotFound(msg) => Error::Schema(format!("column not found: {msg}")),
            other => Error::Polars(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
