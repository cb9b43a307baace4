//! Error types for loading and configuration.
//!
//! Index operations never fail: "not found" is an ordinary `None`, and
//! unsupported operations panic. Only the edges that touch external data
//! return these errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeoGridError>;

#[derive(Debug, Error)]
pub enum GeoGridError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "toml")]
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[cfg(feature = "toml")]
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
