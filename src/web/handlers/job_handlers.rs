// src/web/handlers/job_handlers.rs
use crate::auth::AuthenticatedUser;
use crate::database::{Database, JobPosting};
use crate::job_extraction::JobScraper;
use crate::notifications::Notifier;
use crate::web::services;
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

pub async fn parse_job_handler(
    request: Json<ParseJobRequest>,
    auth: AuthenticatedUser,
    db: &State<Database>,
    scraper: &State<JobScraper>,
    notifier: &State<Notifier>,
) -> ApiResult<DataResponse<JobPosting>> {
    info!("User {} requested job parse for {}", auth.user_id, request.url);
    let posting = services::parse_job(db, scraper, notifier, auth.user_id, &request.url).await?;

    Ok(Json(DataResponse::success(
        "Job posting parsed successfully",
        posting,
    )))
}

pub async fn list_jobs_handler(
    _auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Vec<JobPosting>>> {
    let jobs = services::list_jobs(db).await?;
    Ok(Json(DataResponse::success(
        format!("Found {} job postings", jobs.len()),
        jobs,
    )))
}

pub async fn get_job_handler(
    id: i64,
    _auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<JobPosting>> {
    let job = services::get_job(db, id).await?;
    Ok(Json(DataResponse::success("Job posting retrieved", job)))
}

pub async fn delete_job_handler(
    id: i64,
    _auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<ActionResponse> {
    services::delete_job(db, id).await?;
    Ok(Json(ActionResponse::success(
        "Job posting deleted successfully",
        "job_deleted",
    )))
}
