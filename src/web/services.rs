// src/web/services.rs
//! Request workflows behind the route handlers. Handlers deal with HTTP,
//! everything here deals with storage, scraping, scoring and notifications.

use crate::auth::{hash_password, verify_password, AuthConfig, MIN_PASSWORD_LEN};
use crate::database::{
    insert_match_result, is_unique_violation, Database, JobPosting, JobPostingRepository,
    MatchResult, MatchResultRepository, NewMatchResult, Resume, ResumeRepository, Stats,
    StatsRepository, User, UserRepository,
};
use crate::documents::{extract_text_from_file, remove_stored_file};
use crate::error::{ServiceError, ServiceResult};
use crate::job_extraction::{JobRecord, JobScraper};
use crate::matching::Scorer;
use crate::notifications::Notifier;
use crate::utils::normalize_email;
use crate::web::types::{BulkMatchItem, BulkMatchRequest, MatchRequest};
use serde_json::json;
use std::path::Path;
use tracing::{error, info, warn};

pub const PASSWORD_RESET_MESSAGE: &str = "If the email exists, a password reset link has been sent";

fn required_credentials(email: &str, password: &str) -> ServiceResult<String> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(ServiceError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(email)
}

/// A concurrent signup can pass the lookup and still lose the insert race.
fn duplicate_email_as_conflict(err: anyhow::Error) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Conflict("User with this email already exists".to_string())
    } else {
        err.into()
    }
}

fn check_password_length(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

// Accounts

pub async fn signup(
    db: &Database,
    auth: &AuthConfig,
    email: &str,
    password: &str,
) -> ServiceResult<(String, User)> {
    let email = required_credentials(email, password)?;
    check_password_length(password)?;

    let users = UserRepository::new(db.pool());
    if users.find_by_email(&email).await?.is_some() {
        return Err(ServiceError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(password)?;
    let user = users
        .create(&email, &password_hash)
        .await
        .map_err(duplicate_email_as_conflict)?;
    let token = auth.issue_token(user.id)?;

    Ok((token, user))
}

pub async fn login(
    db: &Database,
    auth: &AuthConfig,
    email: &str,
    password: &str,
) -> ServiceResult<(String, User)> {
    let email = required_credentials(email, password)?;

    let user = UserRepository::new(db.pool())
        .find_by_email(&email)
        .await?
        .filter(|user| verify_password(password, &user.password_hash))
        .ok_or_else(|| {
            warn!("Failed login attempt for {}", email);
            ServiceError::Unauthorized("Invalid email or password".to_string())
        })?;

    let token = auth.issue_token(user.id)?;
    info!("User {} logged in", user.email);
    Ok((token, user))
}

pub async fn current_user(db: &Database, user_id: i64) -> ServiceResult<User> {
    UserRepository::new(db.pool())
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
}

/// Same answer whether or not the account exists.
pub async fn request_password_reset(db: &Database, email: &str) -> ServiceResult<&'static str> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ServiceError::Validation("Email is required".to_string()));
    }

    if UserRepository::new(db.pool())
        .find_by_email(&email)
        .await?
        .is_some()
    {
        info!("Password reset requested for existing account");
    }

    Ok(PASSWORD_RESET_MESSAGE)
}

pub fn reset_password(token: &str, password: &str) -> ServiceResult<()> {
    if token.trim().is_empty() || password.is_empty() {
        return Err(ServiceError::Validation(
            "Token and new password are required".to_string(),
        ));
    }
    check_password_length(password)?;

    Err(ServiceError::NotImplemented(
        "Password reset functionality not implemented yet".to_string(),
    ))
}

// Resumes

/// Extract text from a stored upload and record it. The stored file is
/// removed again if the row cannot be written.
pub async fn register_resume(
    db: &Database,
    user_id: i64,
    filename: &str,
    stored_path: &Path,
) -> ServiceResult<Resume> {
    let text = extract_text_from_file(stored_path).await;
    if text.is_none() {
        warn!("No text could be extracted from {}", filename);
    }

    let filepath = stored_path.to_string_lossy();
    match ResumeRepository::new(db.pool())
        .create(user_id, filename, &filepath, text.as_deref())
        .await
    {
        Ok(resume) => {
            info!("User {} uploaded resume {} ({})", user_id, resume.id, filename);
            Ok(resume)
        }
        Err(e) => {
            error!("Failed to record resume {}: {}", filename, e);
            remove_stored_file(stored_path).await;
            Err(e.into())
        }
    }
}

pub async fn list_resumes(db: &Database, user_id: i64) -> ServiceResult<Vec<Resume>> {
    Ok(ResumeRepository::new(db.pool()).list_for_user(user_id).await?)
}

pub async fn get_resume(db: &Database, user_id: i64, resume_id: i64) -> ServiceResult<Resume> {
    ResumeRepository::new(db.pool())
        .get_for_user(resume_id, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Resume not found".to_string()))
}

/// Remove the row, then the stored file.
pub async fn delete_resume(db: &Database, user_id: i64, resume_id: i64) -> ServiceResult<()> {
    let resume = get_resume(db, user_id, resume_id).await?;
    ResumeRepository::new(db.pool()).delete(resume.id).await?;
    remove_stored_file(Path::new(&resume.filepath)).await;
    info!("User {} deleted resume {}", user_id, resume_id);
    Ok(())
}

// Job postings

pub async fn parse_job(
    db: &Database,
    scraper: &JobScraper,
    notifier: &Notifier,
    user_id: i64,
    url: &str,
) -> ServiceResult<JobPosting> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ServiceError::Validation("URL is required".to_string()));
    }

    notifier.parse_started(user_id, url);

    let record = match scraper.scrape(url).await {
        Ok(record) => record,
        Err(e) => {
            notifier.parse_finished(user_id, Err(e.to_string()));
            return Err(e.into());
        }
    };

    match JobPostingRepository::new(db.pool()).upsert(url, &record).await {
        Ok(posting) => {
            notifier.parse_finished(user_id, Ok(json!(posting)));
            Ok(posting)
        }
        Err(e) => {
            notifier.parse_finished(user_id, Err(e.to_string()));
            Err(e.into())
        }
    }
}

pub async fn list_jobs(db: &Database) -> ServiceResult<Vec<JobPosting>> {
    Ok(JobPostingRepository::new(db.pool()).list().await?)
}

pub async fn get_job(db: &Database, job_id: i64) -> ServiceResult<JobPosting> {
    JobPostingRepository::new(db.pool())
        .get(job_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Job posting not found".to_string()))
}

pub async fn delete_job(db: &Database, job_id: i64) -> ServiceResult<()> {
    if !JobPostingRepository::new(db.pool()).delete(job_id).await? {
        return Err(ServiceError::NotFound("Job posting not found".to_string()));
    }
    info!("Deleted job posting {}", job_id);
    Ok(())
}

// Matching

/// A stored posting wins over inline job data.
async fn resolve_job(
    db: &Database,
    job_posting_id: Option<i64>,
    job_data: Option<JobRecord>,
) -> ServiceResult<JobRecord> {
    match (job_posting_id, job_data) {
        (Some(id), _) => Ok(get_job(db, id).await?.record()),
        (None, Some(record)) => Ok(record),
        (None, None) => Err(ServiceError::Validation(
            "Either jobPostingId or jobData is required".to_string(),
        )),
    }
}

fn resume_text(resume: &Resume) -> ServiceResult<&str> {
    resume
        .text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ServiceError::Validation("Resume text not available".to_string()))
}

pub async fn run_match(
    db: &Database,
    scorer: &dyn Scorer,
    notifier: &Notifier,
    user_id: i64,
    request: MatchRequest,
) -> ServiceResult<MatchResult> {
    let inline_text = request
        .resume_text
        .filter(|text| !text.trim().is_empty());
    if request.resume_id.is_none() && inline_text.is_none() {
        return Err(ServiceError::Validation(
            "Either resumeId or resumeText is required".to_string(),
        ));
    }
    if request.job_posting_id.is_none() && request.job_data.is_none() {
        return Err(ServiceError::Validation(
            "Either jobPostingId or jobData is required".to_string(),
        ));
    }

    let resume_text = match request.resume_id {
        Some(id) => resume_text(&get_resume(db, user_id, id).await?)?.to_string(),
        None => inline_text.unwrap_or_default(),
    };
    let job = resolve_job(db, request.job_posting_id, request.job_data).await?;

    let outcome = scorer.score(&resume_text, &job).await;

    let saved = MatchResultRepository::new(db.pool())
        .create(&NewMatchResult {
            user_id,
            resume_id: request.resume_id,
            job_posting_id: request.job_posting_id,
            score: outcome.score,
            missing_keywords: &outcome.missing_keywords,
            suggestions: &outcome.suggestions,
        })
        .await;

    match saved {
        Ok(result) => {
            info!(
                "User {} matched against '{}' with score {} ({} scorer)",
                user_id,
                job.title,
                result.score,
                scorer.name()
            );
            notifier.match_finished(user_id, Ok(json!(result)));
            Ok(result)
        }
        Err(e) => {
            notifier.match_finished(user_id, Err(e.to_string()));
            Err(e.into())
        }
    }
}

/// Score several owned resumes against one job, sequentially, then write all
/// results in a single transaction.
pub async fn run_bulk_match(
    db: &Database,
    scorer: &dyn Scorer,
    notifier: &Notifier,
    user_id: i64,
    request: BulkMatchRequest,
) -> ServiceResult<Vec<BulkMatchItem>> {
    if request.resume_ids.is_empty() {
        return Err(ServiceError::Validation("resumeIds is required".to_string()));
    }
    let job_posting_id = request.job_posting_id;
    let job = resolve_job(db, job_posting_id, request.job_data).await?;

    let mut resume_ids = request.resume_ids;
    let mut seen = std::collections::HashSet::new();
    resume_ids.retain(|id| seen.insert(*id));

    let resumes_repo = ResumeRepository::new(db.pool());
    let mut resumes = Vec::with_capacity(resume_ids.len());
    for id in resume_ids {
        match resumes_repo.get_for_user(id, user_id).await? {
            Some(resume) => resumes.push(resume),
            None => {
                return Err(ServiceError::NotFound(
                    "Some resumes not found or not owned by user".to_string(),
                ))
            }
        }
    }
    for resume in &resumes {
        resume_text(resume).map_err(|_| {
            ServiceError::Validation(format!("Resume text not available for {}", resume.filename))
        })?;
    }

    let total = resumes.len();
    let mut outcomes = Vec::with_capacity(total);
    for (index, resume) in resumes.iter().enumerate() {
        notifier.bulk_match_progress(user_id, index + 1, total, &resume.filename);
        let text = resume.text.as_deref().unwrap_or_default();
        outcomes.push(scorer.score(text, &job).await);
    }

    let written: anyhow::Result<Vec<BulkMatchItem>> = async {
        let mut tx = db.pool().begin().await?;
        let mut items = Vec::with_capacity(total);
        for (resume, outcome) in resumes.iter().zip(&outcomes) {
            let match_result = insert_match_result(
                &mut *tx,
                &NewMatchResult {
                    user_id,
                    resume_id: Some(resume.id),
                    job_posting_id,
                    score: outcome.score,
                    missing_keywords: &outcome.missing_keywords,
                    suggestions: &outcome.suggestions,
                },
            )
            .await?;
            items.push(BulkMatchItem {
                resume_id: resume.id,
                resume_name: resume.filename.clone(),
                match_result,
            });
        }
        tx.commit().await?;
        Ok(items)
    }
    .await;

    match written {
        Ok(items) => {
            info!("User {} bulk matched {} resumes against '{}'", user_id, total, job.title);
            notifier.bulk_match_finished(user_id, Ok(json!(items)));
            Ok(items)
        }
        Err(e) => {
            error!("Bulk matching failed for user {}: {:#}", user_id, e);
            notifier.bulk_match_finished(user_id, Err(e.to_string()));
            Err(e.into())
        }
    }
}

pub async fn match_history(db: &Database, user_id: i64) -> ServiceResult<Vec<MatchResult>> {
    Ok(MatchResultRepository::new(db.pool())
        .history_for_user(user_id)
        .await?)
}

pub async fn get_match(db: &Database, user_id: i64, match_id: i64) -> ServiceResult<MatchResult> {
    MatchResultRepository::new(db.pool())
        .get_for_user(match_id, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Match result not found".to_string()))
}

pub async fn stats(db: &Database) -> ServiceResult<Stats> {
    Ok(StatsRepository::new(db.pool()).today().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{fallback_score, KeywordScorer};
    use crate::notifications::EventKind;

    fn job_record() -> JobRecord {
        JobRecord {
            title: "Engineer".to_string(),
            company: None,
            description: "Python React SQL developer".to_string(),
            skills: vec!["Python".into(), "React".into(), "SQL".into()],
            requirements: vec![],
        }
    }

    async fn setup() -> (Database, AuthConfig, i64) {
        let db = Database::in_memory().await.unwrap();
        let auth = AuthConfig::new("secret".into());
        let (_, user) = signup(&db, &auth, "Jane@Example.com ", "secret1").await.unwrap();
        (db, auth, user.id)
    }

    #[tokio::test]
    async fn test_signup_normalizes_and_rejects_duplicates() {
        let (db, auth, _) = setup().await;

        let user = current_user(&db, 1).await.unwrap();
        assert_eq!(user.email, "jane@example.com");

        let err = signup(&db, &auth, "JANE@example.com", "another1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = signup(&db, &auth, "short@example.com", "12345").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = signup(&db, &auth, "  ", "secret1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lost_insert_race_is_a_conflict() {
        let (db, _, _) = setup().await;
        let err = UserRepository::new(db.pool())
            .create("jane@example.com", "hash")
            .await
            .unwrap_err();
        assert!(matches!(duplicate_email_as_conflict(err), ServiceError::Conflict(_)));

        let other = duplicate_email_as_conflict(anyhow::anyhow!("disk full"));
        assert!(matches!(other, ServiceError::Internal(_)));
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let (db, auth, user_id) = setup().await;

        let (token, user) = login(&db, &auth, "jane@example.com", "secret1").await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(auth.verify_token(&token).unwrap().user_id, user_id);

        for (email, password) in [("jane@example.com", "wrong!!"), ("nobody@example.com", "secret1")] {
            let err = login(&db, &auth, email, password).await.unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized(_)));
        }
    }

    #[tokio::test]
    async fn test_password_reset_never_reveals_accounts() {
        let (db, _, _) = setup().await;
        assert_eq!(
            request_password_reset(&db, "jane@example.com").await.unwrap(),
            request_password_reset(&db, "ghost@example.com").await.unwrap()
        );
        assert!(request_password_reset(&db, "").await.is_err());

        assert!(matches!(reset_password("", "secret1"), Err(ServiceError::Validation(_))));
        assert!(matches!(reset_password("t", "123"), Err(ServiceError::Validation(_))));
        assert!(matches!(reset_password("t", "secret1"), Err(ServiceError::NotImplemented(_))));
    }

    #[tokio::test]
    async fn test_match_with_inline_data_persists_and_notifies() {
        let (db, _, user_id) = setup().await;
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let resume = "Python and React, 5 years experience";

        let result = run_match(
            &db,
            &KeywordScorer,
            &notifier,
            user_id,
            MatchRequest {
                resume_text: Some(resume.to_string()),
                job_data: Some(job_record()),
                ..MatchRequest::default()
            },
        )
        .await
        .unwrap();

        let expected = fallback_score(resume, &job_record());
        assert_eq!(result.score, i64::from(expected.score));
        assert_eq!(result.missing_keywords, vec!["SQL"]);
        assert!(result.resume_id.is_none());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, EventKind::MatchFinished);
        assert_eq!(event.payload["match_result"]["id"], result.id);

        assert_eq!(match_history(&db, user_id).await.unwrap().len(), 1);
        assert!(get_match(&db, user_id + 1, result.id).await.is_err());
    }

    #[tokio::test]
    async fn test_match_validation() {
        let (db, _, user_id) = setup().await;
        let notifier = Notifier::default();

        let err = run_match(&db, &KeywordScorer, &notifier, user_id, MatchRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Either resumeId or resumeText is required");

        let err = run_match(
            &db,
            &KeywordScorer,
            &notifier,
            user_id,
            MatchRequest {
                resume_text: Some("text".into()),
                ..MatchRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Either jobPostingId or jobData is required");

        let err = run_match(
            &db,
            &KeywordScorer,
            &notifier,
            user_id,
            MatchRequest {
                resume_id: Some(99),
                job_data: Some(job_record()),
                ..MatchRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let empty = ResumeRepository::new(db.pool())
            .create(user_id, "scan.pdf", "/tmp/scan.pdf", None)
            .await
            .unwrap();
        let err = run_match(
            &db,
            &KeywordScorer,
            &notifier,
            user_id,
            MatchRequest {
                resume_id: Some(empty.id),
                job_data: Some(job_record()),
                ..MatchRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Resume text not available");
    }

    #[tokio::test]
    async fn test_bulk_match_emits_progress_and_writes_all() {
        let (db, _, user_id) = setup().await;
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let repo = ResumeRepository::new(db.pool());
        let a = repo.create(user_id, "a.pdf", "/tmp/a.pdf", Some("Python")).await.unwrap();
        let b = repo.create(user_id, "b.pdf", "/tmp/b.pdf", Some("React SQL")).await.unwrap();
        let job = JobPostingRepository::new(db.pool())
            .upsert("https://jobs.example.com/1", &job_record())
            .await
            .unwrap();

        let items = run_bulk_match(
            &db,
            &KeywordScorer,
            &notifier,
            user_id,
            BulkMatchRequest {
                resume_ids: vec![b.id, a.id, b.id],
                job_posting_id: Some(job.id),
                job_data: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(items.iter().map(|i| i.resume_id).collect::<Vec<_>>(), vec![b.id, a.id]);
        assert!(items.iter().all(|i| i.match_result.job_posting_id == Some(job.id)));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event, EventKind::BulkMatchProgress);
        assert_eq!(first.payload["current"], 1);
        assert_eq!(first.payload["resume_name"], "b.pdf");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.payload["current"], 2);
        let done = rx.recv().await.unwrap();
        assert_eq!(done.event, EventKind::BulkMatchFinished);
        assert_eq!(done.payload["success"], true);

        assert_eq!(match_history(&db, user_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_match_rejects_foreign_resumes() {
        let (db, auth, user_id) = setup().await;
        let (_, other) = signup(&db, &auth, "other@example.com", "secret1").await.unwrap();
        let foreign = ResumeRepository::new(db.pool())
            .create(other.id, "x.pdf", "/tmp/x.pdf", Some("text"))
            .await
            .unwrap();

        let err = run_bulk_match(
            &db,
            &KeywordScorer,
            &Notifier::default(),
            user_id,
            BulkMatchRequest {
                resume_ids: vec![foreign.id],
                job_posting_id: None,
                job_data: Some(job_record()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Some resumes not found or not owned by user");
        assert!(match_history(&db, user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_job_missing_is_not_found() {
        let (db, _, _) = setup().await;
        assert!(matches!(delete_job(&db, 5).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_resume_removes_file() {
        let (db, _, user_id) = setup().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.docx");
        std::fs::write(&path, b"not really a docx").unwrap();

        let resume = register_resume(&db, user_id, "cv.docx", &path).await.unwrap();
        assert!(resume.text.is_none());

        delete_resume(&db, user_id, resume.id).await.unwrap();
        assert!(!path.exists());
        assert!(matches!(
            get_resume(&db, user_id, resume.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
