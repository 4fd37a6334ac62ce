//! ResumeRanker: resume upload, job posting extraction and resume/job matching.

pub mod admin_cli;
pub mod auth;
pub mod config;
pub mod database;
pub mod documents;
pub mod error;
pub mod job_extraction;
pub mod logging;
pub mod matching;
pub mod notifications;
pub mod utils;
pub mod web;

pub use config::AppConfig;
pub use job_extraction::{extract, JobRecord, JobScraper};
pub use matching::{fallback_score, MatchOutcome, Scorer};
pub use web::{build_rocket, start_web_server};
