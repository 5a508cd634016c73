use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("Config directory not found at {0}. Run 'payouts init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Invalid JSON in {name}: {source}")]
    InvalidJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not logged in. Run 'payouts login --token <TOKEN>' or pass --input <FILE>.")]
    NotLoggedIn,

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("Unexpected payload from {name}: {reason}")]
    UnexpectedPayload { name: String, reason: String },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Invalid country code '{0}'. Expected a 2-letter ISO code (e.g., 'ZA').")]
    InvalidCountryCode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PayoutError>;
