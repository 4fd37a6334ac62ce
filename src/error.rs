// src/error.rs
use thiserror::Error;

/// Failure to obtain a page for extraction. Parsing never produces one of
/// these; it degrades to sentinel values instead.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid URL provided: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch URL: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
}

/// Errors raised by the request workflows in `web::services`.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
