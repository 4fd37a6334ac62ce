// src/matching/llm.rs
use super::client::CompletionClient;
use super::{fallback_score, MatchOutcome, Scorer, MAX_SCORE};
use crate::job_extraction::JobRecord;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

pub const LLM_MAX_MISSING: usize = 10;
pub const LLM_MAX_SUGGESTIONS: usize = 5;

const NOT_SPECIFIED: &str = "Not specified";

pub const SYSTEM_PROMPT: &str = r#"You are a resume analysis expert. Analyze the provided resume against the job requirements and return a JSON response with exactly this structure:

{
  "score": 0-100 integer (overall match score),
  "missing_keywords": ["keyword1", "keyword2", ...],
  "suggestions": ["suggestion1", "suggestion2", ...]
}

Focus on:
- Technical skills alignment
- Experience relevance
- Missing qualifications
- Actionable improvement suggestions

Be specific and practical in your suggestions."#;

fn joined_or_unspecified(items: &[String]) -> String {
    if items.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        items.join(", ")
    }
}

pub fn build_user_prompt(resume_text: &str, job: &JobRecord) -> String {
    format!(
        "Job Title: {}\nJob Description: {}\nRequired Skills: {}\nRequirements: {}\n\nResume Text:\n{}\n\nPlease analyze this resume against the job requirements and provide your assessment in the exact JSON format specified.",
        job.title,
        job.description,
        joined_or_unspecified(&job.skills),
        joined_or_unspecified(&job.requirements),
        resume_text
    )
}

/// Span from the first `{` to the last `}` of a free-text reply.
pub fn extract_json_span(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Score clamped to 0..=100. A missing score counts as 0 and an unparsable
/// string as 0; any other non-numeric value rejects the reply.
fn clamp_score(value: Option<&Value>) -> Option<u8> {
    let raw = match value {
        None => 0,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(_) => return None,
    };
    Some(raw.clamp(0, MAX_SCORE as i64) as u8)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Turn a model reply into an outcome. `None` when the reply carries no
/// JSON object or its score is not a number.
pub fn parse_reply(reply: &str) -> Option<MatchOutcome> {
    let span = extract_json_span(reply)?;
    let value: Value = serde_json::from_str(span).ok()?;
    let object = value.as_object()?;

    Some(MatchOutcome::new(
        clamp_score(object.get("score"))?,
        string_list(object.get("missing_keywords")),
        string_list(object.get("suggestions")),
        LLM_MAX_MISSING,
        LLM_MAX_SUGGESTIONS,
    ))
}

pub struct LlmScorer<C: CompletionClient> {
    client: C,
    model: String,
}

impl<C: CompletionClient> LlmScorer<C> {
    pub fn new(client: C, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl<C: CompletionClient> Scorer for LlmScorer<C> {
    async fn score(&self, resume_text: &str, job: &JobRecord) -> MatchOutcome {
        let user_prompt = build_user_prompt(resume_text, job);

        let reply = match self.client.complete(SYSTEM_PROMPT, &user_prompt, &self.model).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("LLM call failed, using keyword fallback: {:#}", e);
                return fallback_score(resume_text, job);
            }
        };

        match parse_reply(&reply) {
            Some(outcome) => {
                info!("LLM scored resume against '{}': {}", job.title, outcome.score);
                outcome
            }
            None => {
                warn!("LLM reply had no usable JSON object or score, using keyword fallback");
                fallback_score(resume_text, job)
            }
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
