//! Unipage-Scout: a single-site university scraper
//!
//! This crate discovers countries and university pages on a listing site,
//! extracts a structured record per university (with optional LLM help when
//! fixed selectors miss data) and writes each record as JSON under a
//! `country/city/` directory tree.

pub mod config;
pub mod discovery;
pub mod extract;
pub mod llm;
pub mod output;
pub mod page;
pub mod record;
pub mod runner;

use thiserror::Error;

/// Main error type for Unipage-Scout operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("No element matches selector '{selector}'")]
    MissingElement { selector: String },

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("No page loaded yet")]
    NoPage,

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern in config: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Unipage-Scout operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{CountryRef, UniversityRecord, UniversityRef};
pub use runner::{CountryFilter, RunController, RunStats};
