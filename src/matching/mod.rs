// src/matching/mod.rs
//! Resume/job scoring. Two strategies sit behind [`Scorer`]: an LLM-backed
//! scorer and the deterministic keyword fallback, which the LLM scorer also
//! uses whenever its call cannot produce a usable answer.

pub mod client;
pub mod fallback;
pub mod llm;

pub use client::{CompletionClient, OpenAiClient};
pub use fallback::fallback_score;
pub use llm::LlmScorer;

use crate::config::LlmSettings;
use crate::job_extraction::JobRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub score: u8,
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
}

impl MatchOutcome {
    /// Clamp the score and truncate both lists to the given caps.
    pub fn new(
        score: u8,
        mut missing_keywords: Vec<String>,
        mut suggestions: Vec<String>,
        max_missing: usize,
        max_suggestions: usize,
    ) -> Self {
        missing_keywords.truncate(max_missing);
        suggestions.truncate(max_suggestions);
        Self {
            score: score.min(MAX_SCORE),
            missing_keywords,
            suggestions,
        }
    }
}

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Never fails; strategies degrade to the keyword fallback.
    async fn score(&self, resume_text: &str, job: &JobRecord) -> MatchOutcome;

    fn name(&self) -> &'static str;
}

pub type SharedScorer = Arc<dyn Scorer>;

/// Scorer used when no LLM is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordScorer;

#[async_trait]
impl Scorer for KeywordScorer {
    async fn score(&self, resume_text: &str, job: &JobRecord) -> MatchOutcome {
        fallback_score(resume_text, job)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Pick the strategy from configuration: an API key enables the LLM scorer.
pub fn build_scorer(settings: &LlmSettings) -> anyhow::Result<SharedScorer> {
    match settings.api_key.as_deref().filter(|_| settings.is_enabled()) {
        Some(api_key) => {
            let client = OpenAiClient::new(
                api_key.to_string(),
                settings.base_url.clone(),
                settings.timeout_seconds,
            )?;
            info!("Using LLM scorer with model {}", settings.model);
            Ok(Arc::new(LlmScorer::new(client, settings.model.clone())))
        }
        None => {
            info!("No LLM API key configured, using keyword scorer");
            Ok(Arc::new(KeywordScorer))
        }
    }
}
