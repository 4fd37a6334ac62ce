// src/database/models.rs
use crate::job_extraction::JobRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Resume {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    #[serde(skip_serializing)]
    pub filepath: String,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Storage shape of a job posting; lists are kept as JSON text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobPostingRow {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub skills_json: Option<String>,
    pub requirements_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPosting {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub skills: Vec<String>,
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl JobPosting {
    pub fn record(&self) -> JobRecord {
        JobRecord {
            title: self.title.clone(),
            company: self.company.clone(),
            description: self.description.clone(),
            skills: self.skills.clone(),
            requirements: self.requirements.clone(),
        }
    }
}

/// Unreadable or absent JSON decodes to an empty list.
pub(crate) fn decode_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default()
}

pub(crate) fn encode_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}

impl From<JobPostingRow> for JobPosting {
    fn from(row: JobPostingRow) -> Self {
        Self {
            skills: decode_list(row.skills_json.as_deref()),
            requirements: decode_list(row.requirements_json.as_deref()),
            id: row.id,
            url: row.url,
            title: row.title,
            company: row.company,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchResultRow {
    pub id: i64,
    pub user_id: i64,
    pub resume_id: Option<i64>,
    pub job_posting_id: Option<i64>,
    pub score: i64,
    pub missing_keywords_json: Option<String>,
    pub suggestions_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub id: i64,
    pub user_id: i64,
    pub resume_id: Option<i64>,
    pub job_posting_id: Option<i64>,
    pub score: i64,
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MatchResultRow> for MatchResult {
    fn from(row: MatchResultRow) -> Self {
        Self {
            missing_keywords: decode_list(row.missing_keywords_json.as_deref()),
            suggestions: decode_list(row.suggestions_json.as_deref()),
            id: row.id,
            user_id: row.user_id,
            resume_id: row.resume_id,
            job_posting_id: row.job_posting_id,
            score: row.score,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMatchResult<'a> {
    pub user_id: i64,
    pub resume_id: Option<i64>,
    pub job_posting_id: Option<i64>,
    pub score: u8,
    pub missing_keywords: &'a [String],
    pub suggestions: &'a [String],
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TodayStats {
    pub users_today: i64,
    pub resumes_today: i64,
    pub matches_today: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub total_users: i64,
    pub total_resumes: i64,
    pub total_jobs: i64,
    pub total_matches: i64,
    pub recent_activity: TodayStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_codec() {
        assert_eq!(decode_list(None), Vec::<String>::new());
        assert_eq!(decode_list(Some("not json")), Vec::<String>::new());
        assert_eq!(decode_list(Some(r#"["Rust","Go"]"#)), vec!["Rust", "Go"]);
        assert_eq!(encode_list(&[]), None);
        assert_eq!(
            encode_list(&["Rust".to_string()]).as_deref(),
            Some(r#"["Rust"]"#)
        );
    }

    #[test]
    fn test_serialized_user_hides_password_hash() {
        let user = User {
            id: 1,
            email: "a@b.c".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "a@b.c");
    }
}
