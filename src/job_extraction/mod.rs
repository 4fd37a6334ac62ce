// src/job_extraction/mod.rs
//! Job posting extraction: fetch a page, then turn arbitrary HTML into a
//! [`JobRecord`] through ordered selector chains.

pub mod extractor;
pub mod fetcher;
pub mod vocabulary;

pub use extractor::{extract, DESCRIPTION_NOT_FOUND, TITLE_NOT_FOUND};
pub use fetcher::{validate_url, HttpPageFetcher, PageFetcher};

use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Clone)]
pub struct JobScraper {
    fetcher: Arc<dyn PageFetcher>,
}

impl JobScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn http(timeout_seconds: u64) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(HttpPageFetcher::new(timeout_seconds)?)))
    }

    /// Validate, fetch and extract. Only URL and transport problems fail.
    pub async fn scrape(&self, raw_url: &str) -> Result<JobRecord, ScrapeError> {
        let url = validate_url(raw_url)?;

        info!("Fetching job post: {}", url);
        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                error!("Failed to fetch job post {}: {}", url, e);
                return Err(e);
            }
        };

        let record = extract(&html, url.as_str());

        info!(
            "Successfully extracted job: {} ({} skills, {} requirements)",
            record.title,
            record.skills.len(),
            record.requirements.len()
        );
        Ok(record)
    }
}
