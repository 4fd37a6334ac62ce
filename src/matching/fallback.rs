// src/matching/fallback.rs
use super::MatchOutcome;
use crate::job_extraction::JobRecord;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const FALLBACK_MAX_MISSING: usize = 5;
pub const FALLBACK_MAX_SUGGESTIONS: usize = 3;

const SKILL_WEIGHT: f64 = 50.0;
const KEYWORD_WEIGHT: f64 = 50.0;
const WELL_MATCHED_SCORE: u8 = 70;

fn keyword_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b\w{4,}\b").ok())
        .as_ref()
}

fn tokens(text: &str) -> Vec<&str> {
    keyword_pattern()
        .map(|pattern| pattern.find_iter(text).map(|m| m.as_str()).collect())
        .unwrap_or_default()
}

/// Deterministic keyword scorer. Pure: no I/O, no clock, no randomness.
pub fn fallback_score(resume_text: &str, job: &JobRecord) -> MatchOutcome {
    let resume_lower = resume_text.to_lowercase();
    let job_lower = format!("{} {}", job.title, job.description).to_lowercase();

    let mut matched = 0usize;
    let mut missing: Vec<String> = Vec::new();
    for skill in &job.skills {
        if resume_lower.contains(&skill.to_lowercase()) {
            matched += 1;
        } else {
            missing.push(skill.clone());
        }
    }

    let total_skills = job.skills.len().max(1);
    let skill_score = matched as f64 / total_skills as f64 * SKILL_WEIGHT;

    // The denominator counts every job token, repeats included
    let job_tokens = tokens(&job_lower);
    let job_set: HashSet<&str> = job_tokens.iter().copied().collect();
    let resume_set: HashSet<&str> = tokens(&resume_lower).into_iter().collect();
    let shared = job_set.intersection(&resume_set).count();
    let keyword_score = shared as f64 / job_tokens.len().max(1) as f64 * KEYWORD_WEIGHT;

    let score = (skill_score + keyword_score).floor().clamp(0.0, 100.0) as u8;

    let mut suggestions = Vec::new();
    if !missing.is_empty() {
        let highlighted: Vec<&str> = missing.iter().take(3).map(String::as_str).collect();
        suggestions.push(format!(
            "Consider highlighting experience with: {}",
            highlighted.join(", ")
        ));
    }
    if score < WELL_MATCHED_SCORE {
        suggestions.push("Add more relevant experience and skills to improve match".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push("Resume looks well-aligned with job requirements".to_string());
    }

    MatchOutcome::new(score, missing, suggestions, FALLBACK_MAX_MISSING, FALLBACK_MAX_SUGGESTIONS)
}
