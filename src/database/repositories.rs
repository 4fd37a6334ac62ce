// src/database/repositories.rs
use super::models::{
    encode_list, JobPosting, JobPostingRow, MatchResult, MatchResultRow, NewMatchResult, Resume,
    Stats, TodayStats, User,
};
use crate::job_extraction::JobRecord;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::info;

const USER_COLUMNS: &str = "id, email, password_hash, created_at";
const RESUME_COLUMNS: &str = "id, user_id, filename, filepath, text, created_at";
const JOB_COLUMNS: &str =
    "id, url, title, company, description, skills_json, requirements_json, created_at";
const MATCH_COLUMNS: &str = "id, user_id, resume_id, job_posting_id, score, missing_keywords_json, suggestions_json, created_at";

/// True when `err` wraps a SQLite UNIQUE constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a user; the email must already be normalized and the password
    /// already hashed.
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .execute(self.pool)
        .await?;

        info!("Created user: {}", email);
        Ok(User {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
            USER_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }
}

pub struct ResumeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ResumeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        filename: &str,
        filepath: &str,
        text: Option<&str>,
    ) -> Result<Resume> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO resumes (user_id, filename, filepath, text, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(filename)
        .bind(filepath)
        .bind(text)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Resume {
            id: result.last_insert_rowid(),
            user_id,
            filename: filename.to_string(),
            filepath: filepath.to_string(),
            text: text.map(str::to_string),
            created_at: now,
        })
    }

    /// Newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Resume>> {
        let resumes = sqlx::query_as::<_, Resume>(&format!(
            "SELECT {} FROM resumes WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            RESUME_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(resumes)
    }

    /// `None` when the resume does not exist or belongs to someone else.
    pub async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Resume>> {
        let resume = sqlx::query_as::<_, Resume>(&format!(
            "SELECT {} FROM resumes WHERE id = ? AND user_id = ?",
            RESUME_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(resume)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Resume>> {
        let resume = sqlx::query_as::<_, Resume>(&format!(
            "SELECT {} FROM resumes WHERE id = ?",
            RESUME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(resume)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct JobPostingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobPostingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert, or refresh the extracted fields of the posting with this URL.
    /// The original id and `created_at` survive a refresh.
    pub async fn upsert(&self, url: &str, record: &JobRecord) -> Result<JobPosting> {
        let row = sqlx::query_as::<_, JobPostingRow>(&format!(
            r#"
            INSERT INTO job_postings
                (url, title, company, description, skills_json, requirements_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                company = excluded.company,
                description = excluded.description,
                skills_json = excluded.skills_json,
                requirements_json = excluded.requirements_json
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(url)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.description)
        .bind(encode_list(&record.skills))
        .bind(encode_list(&record.requirements))
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn list(&self) -> Result<Vec<JobPosting>> {
        let rows = sqlx::query_as::<_, JobPostingRow>(&format!(
            "SELECT {} FROM job_postings ORDER BY created_at DESC, id DESC",
            JOB_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(JobPosting::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<JobPosting>> {
        let row = sqlx::query_as::<_, JobPostingRow>(&format!(
            "SELECT {} FROM job_postings WHERE id = ?",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(JobPosting::from))
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM job_postings WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

const INSERT_MATCH_RESULT: &str = r#"
    INSERT INTO match_results
        (user_id, resume_id, job_posting_id, score, missing_keywords_json, suggestions_json, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    RETURNING id, user_id, resume_id, job_posting_id, score, missing_keywords_json, suggestions_json, created_at
"#;

/// Insert on any executor, so bulk matching can write inside a transaction.
pub async fn insert_match_result<'e, E>(executor: E, new: &NewMatchResult<'_>) -> Result<MatchResult>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, MatchResultRow>(INSERT_MATCH_RESULT)
        .bind(new.user_id)
        .bind(new.resume_id)
        .bind(new.job_posting_id)
        .bind(i64::from(new.score))
        .bind(encode_list(new.missing_keywords))
        .bind(encode_list(new.suggestions))
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

    Ok(row.into())
}

pub struct MatchResultRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MatchResultRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewMatchResult<'_>) -> Result<MatchResult> {
        insert_match_result(self.pool, new).await
    }

    /// Newest first
    pub async fn history_for_user(&self, user_id: i64) -> Result<Vec<MatchResult>> {
        let rows = sqlx::query_as::<_, MatchResultRow>(&format!(
            "SELECT {} FROM match_results WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            MATCH_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(MatchResult::from).collect())
    }

    pub async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<MatchResult>> {
        let row = sqlx::query_as::<_, MatchResultRow>(&format!(
            "SELECT {} FROM match_results WHERE id = ? AND user_id = ?",
            MATCH_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(MatchResult::from))
    }
}

pub struct StatsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StatsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    async fn count(&self, table: &str, since: Option<DateTime<Utc>>) -> Result<i64> {
        let count: i64 = match since {
            Some(since) => {
                sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE created_at >= ?",
                    table
                ))
                .bind(since)
                .fetch_one(self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                    .fetch_one(self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Totals plus rows created since `day_start`.
    pub async fn collect(&self, day_start: DateTime<Utc>) -> Result<Stats> {
        Ok(Stats {
            total_users: self.count("users", None).await?,
            total_resumes: self.count("resumes", None).await?,
            total_jobs: self.count("job_postings", None).await?,
            total_matches: self.count("match_results", None).await?,
            recent_activity: TodayStats {
                users_today: self.count("users", Some(day_start)).await?,
                resumes_today: self.count("resumes", Some(day_start)).await?,
                matches_today: self.count("match_results", Some(day_start)).await?,
            },
        })
    }

    /// Statistics with "today" starting at midnight UTC.
    pub async fn today(&self) -> Result<Stats> {
        let day_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        self.collect(day_start).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use chrono::Duration;

    fn record(title: &str, skills: &[&str]) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            company: Some("Acme".to_string()),
            description: "Build things".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            requirements: vec![],
        }
    }

    async fn user(db: &Database, email: &str) -> User {
        UserRepository::new(db.pool())
            .create(email, "hash")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_user_roundtrip_and_unique_email() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let created = repo.create("jane@example.com", "hash").await.unwrap();
        let found = repo.find_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(repo.find_by_id(created.id).await.unwrap().unwrap().email, "jane@example.com");
        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());

        assert!(repo.create("jane@example.com", "other").await.is_err());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_unique_violation() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        repo.create("jane@example.com", "hash").await.unwrap();

        let err = repo.create("jane@example.com", "hash").await.unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow::anyhow!("disk full")));
    }

    #[tokio::test]
    async fn test_resumes_are_scoped_to_owner() {
        let db = Database::in_memory().await.unwrap();
        let alice = user(&db, "alice@example.com").await;
        let bob = user(&db, "bob@example.com").await;
        let repo = ResumeRepository::new(db.pool());

        let first = repo.create(alice.id, "a.pdf", "/tmp/a.pdf", Some("text")).await.unwrap();
        let second = repo.create(alice.id, "b.pdf", "/tmp/b.pdf", None).await.unwrap();

        let listed = repo.list_for_user(alice.id).await.unwrap();
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert!(repo.list_for_user(bob.id).await.unwrap().is_empty());

        assert!(repo.get_for_user(first.id, bob.id).await.unwrap().is_none());
        assert_eq!(
            repo.get_for_user(first.id, alice.id).await.unwrap().unwrap().text.as_deref(),
            Some("text")
        );

        assert!(repo.delete(first.id).await.unwrap());
        assert!(!repo.delete(first.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_job_upsert_keeps_id_and_refreshes_fields() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobPostingRepository::new(db.pool());
        let url = "https://jobs.example.com/1";

        let first = repo.upsert(url, &record("Engineer", &["Rust"])).await.unwrap();
        let second = repo
            .upsert(url, &record("Senior Engineer", &["Rust", "Go"]))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "Senior Engineer");
        assert_eq!(second.skills, vec!["Rust", "Go"]);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(repo.list().await.unwrap().len(), 1);

        let other = repo.upsert("https://jobs.example.com/2", &record("PM", &[])).await.unwrap();
        assert_ne!(other.id, first.id);
        assert!(other.skills.is_empty());

        let fetched = repo.get(first.id).await.unwrap().unwrap();
        assert_eq!(fetched.record().skills, vec!["Rust", "Go"]);
        assert_eq!(fetched.record().company.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_match_results_history_and_cascade() {
        let db = Database::in_memory().await.unwrap();
        let alice = user(&db, "alice@example.com").await;
        let bob = user(&db, "bob@example.com").await;
        let resume = ResumeRepository::new(db.pool())
            .create(alice.id, "a.pdf", "/tmp/a.pdf", Some("text"))
            .await
            .unwrap();
        let job = JobPostingRepository::new(db.pool())
            .upsert("https://jobs.example.com/1", &record("Engineer", &["Rust"]))
            .await
            .unwrap();

        let missing = vec!["Rust".to_string()];
        let suggestions = vec!["Mention Rust".to_string()];
        let repo = MatchResultRepository::new(db.pool());
        let saved = repo
            .create(&NewMatchResult {
                user_id: alice.id,
                resume_id: Some(resume.id),
                job_posting_id: Some(job.id),
                score: 42,
                missing_keywords: &missing,
                suggestions: &suggestions,
            })
            .await
            .unwrap();

        assert_eq!(saved.score, 42);
        assert_eq!(saved.missing_keywords, missing);
        assert_eq!(repo.history_for_user(alice.id).await.unwrap().len(), 1);
        assert!(repo.get_for_user(saved.id, bob.id).await.unwrap().is_none());

        // Deleting the job removes the match
        JobPostingRepository::new(db.pool()).delete(job.id).await.unwrap();
        assert!(repo.get_for_user(saved.id, alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_inside_transaction_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        let alice = user(&db, "alice@example.com").await;

        let mut tx = db.pool().begin().await.unwrap();
        insert_match_result(
            &mut *tx,
            &NewMatchResult {
                user_id: alice.id,
                resume_id: None,
                job_posting_id: None,
                score: 10,
                missing_keywords: &[],
                suggestions: &[],
            },
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        let history = MatchResultRepository::new(db.pool())
            .history_for_user(alice.id)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts_totals_and_recent() {
        let db = Database::in_memory().await.unwrap();
        let alice = user(&db, "alice@example.com").await;
        ResumeRepository::new(db.pool())
            .create(alice.id, "a.pdf", "/tmp/a.pdf", None)
            .await
            .unwrap();
        JobPostingRepository::new(db.pool())
            .upsert("https://jobs.example.com/1", &record("Engineer", &[]))
            .await
            .unwrap();

        let repo = StatsRepository::new(db.pool());
        let stats = repo.today().await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_resumes, 1);
        assert_eq!(stats.total_jobs, 1);
        assert_eq!(stats.total_matches, 0);
        assert_eq!(stats.recent_activity.users_today, 1);
        assert_eq!(stats.recent_activity.resumes_today, 1);

        let future = repo.collect(Utc::now() + Duration::hours(1)).await.unwrap();
        assert_eq!(future.total_users, 1);
        assert_eq!(future.recent_activity, TodayStats::default());
    }
}
