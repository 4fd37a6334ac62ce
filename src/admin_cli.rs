// src/admin_cli.rs
use crate::config::AppConfig;
use crate::database::{Database, JobPostingRepository, ResumeRepository, StatsRepository, UserRepository};
use crate::documents::remove_stored_file;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "resumeranker-admin")]
#[command(about = "Administer the ResumeRanker database")]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommand,

    /// Defaults to the configured database (`DATABASE_PATH` or config.yaml)
    #[arg(long)]
    pub database_path: Option<PathBuf>,
}

impl AdminCli {
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(AppConfig::load()?.database_path),
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    /// Create the database and apply the schema
    Init,
    /// Print aggregate statistics
    Stats,
    /// List registered users
    ListUsers,
    /// Delete a resume and its stored file
    DeleteResume { id: i64 },
    /// Delete a job posting
    DeleteJob { id: i64 },
}

pub async fn handle_admin_command(cli: AdminCli) -> Result<()> {
    let database_path = cli.resolve_database_path()?;
    info!("Using database {}", database_path.display());
    let db = Database::connect(&database_path).await?;
    let result = run_command(&db, cli.command).await;
    db.close().await;
    result
}

pub async fn run_command(db: &Database, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Init => {
            info!("✅ Database ready");
        }

        AdminCommand::Stats => {
            let stats = StatsRepository::new(db.pool()).today().await?;
            println!("Users:        {}", stats.total_users);
            println!("Resumes:      {}", stats.total_resumes);
            println!("Job postings: {}", stats.total_jobs);
            println!("Matches:      {}", stats.total_matches);
            println!(
                "Today:        {} users, {} resumes, {} matches",
                stats.recent_activity.users_today,
                stats.recent_activity.resumes_today,
                stats.recent_activity.matches_today
            );
        }

        AdminCommand::ListUsers => {
            let users = UserRepository::new(db.pool()).list().await?;
            if users.is_empty() {
                println!("No users registered");
            }
            for user in users {
                println!("{:>6}  {:<40}  {}", user.id, user.email, user.created_at.to_rfc3339());
            }
        }

        AdminCommand::DeleteResume { id } => {
            let repo = ResumeRepository::new(db.pool());
            match repo.get(id).await? {
                Some(resume) => {
                    repo.delete(id).await?;
                    remove_stored_file(Path::new(&resume.filepath)).await;
                    info!("✅ Deleted resume {} ({})", id, resume.filename);
                }
                None => {
                    error!("❌ No resume with id {}", id);
                    anyhow::bail!("Resume {} not found", id);
                }
            }
        }

        AdminCommand::DeleteJob { id } => {
            if JobPostingRepository::new(db.pool()).delete(id).await? {
                info!("✅ Deleted job posting {}", id);
            } else {
                error!("❌ No job posting with id {}", id);
                anyhow::bail!("Job posting {} not found", id);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_extraction::JobRecord;

    #[test]
    fn test_parse_arguments() {
        let cli = AdminCli::try_parse_from([
            "resumeranker-admin",
            "--database-path",
            "/tmp/x.db",
            "delete-resume",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.database_path, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.resolve_database_path().unwrap(), PathBuf::from("/tmp/x.db"));
        assert_eq!(cli.command, AdminCommand::DeleteResume { id: 7 });

        let cli = AdminCli::try_parse_from(["resumeranker-admin", "list-users"]).unwrap();
        assert_eq!(cli.command, AdminCommand::ListUsers);
    }

    #[test]
    fn test_database_path_flag_is_optional() {
        let cli = AdminCli::try_parse_from(["resumeranker-admin", "stats"]).unwrap();
        assert!(cli.database_path.is_none());
        assert_eq!(cli.command, AdminCommand::Stats);
    }

    #[tokio::test]
    async fn test_delete_resume_removes_file() {
        let db = Database::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let user = UserRepository::new(db.pool()).create("a@b.c", "hash").await.unwrap();
        let resume = ResumeRepository::new(db.pool())
            .create(user.id, "cv.pdf", &path.to_string_lossy(), None)
            .await
            .unwrap();

        run_command(&db, AdminCommand::DeleteResume { id: resume.id }).await.unwrap();
        assert!(!path.exists());
        assert!(run_command(&db, AdminCommand::DeleteResume { id: resume.id }).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_job_and_stats() {
        let db = Database::in_memory().await.unwrap();
        let record = JobRecord {
            title: "Dev".into(),
            company: None,
            description: "desc".into(),
            skills: vec![],
            requirements: vec![],
        };
        let job = JobPostingRepository::new(db.pool())
            .upsert("https://jobs.example.com/1", &record)
            .await
            .unwrap();

        run_command(&db, AdminCommand::Stats).await.unwrap();
        run_command(&db, AdminCommand::DeleteJob { id: job.id }).await.unwrap();
        assert!(run_command(&db, AdminCommand::DeleteJob { id: job.id }).await.is_err());
    }
}
