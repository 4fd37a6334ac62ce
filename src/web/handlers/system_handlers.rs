// src/web/handlers/system_handlers.rs
use crate::auth::AuthenticatedUser;
use crate::database::{Database, Stats};
use crate::matching::SharedScorer;
use crate::web::services;
use crate::web::types::*;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

const ENDPOINTS: &[&str] = &[
    "POST /api/auth/signup",
    "POST /api/auth/login",
    "GET /api/auth/me",
    "POST /api/auth/request-password-reset",
    "POST /api/auth/reset-password",
    "POST /api/resumes",
    "GET /api/resumes",
    "GET /api/resumes/<id>",
    "DELETE /api/resumes/<id>",
    "POST /api/jobs/parse",
    "GET /api/jobs",
    "GET /api/jobs/<id>",
    "DELETE /api/jobs/<id>",
    "POST /api/match",
    "POST /api/match/bulk",
    "GET /api/match/history",
    "GET /api/match/<id>",
    "GET /api/events",
    "GET /api/admin/stats",
    "GET /api/health",
];

pub async fn root_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "ResumeRanker API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS.to_vec(),
    })
}

pub async fn health_handler(
    db: &State<Database>,
    scorer: &State<SharedScorer>,
) -> Result<Json<DataResponse<HealthData>>, ApiError> {
    match db.health_check().await {
        Ok(()) => Ok(Json(DataResponse::success(
            "Service is healthy",
            HealthData {
                status: "ok",
                database: "ok",
                scorer: scorer.name(),
                version: env!("CARGO_PKG_VERSION"),
            },
        ))),
        Err(e) => {
            error!("Health check failed: {:#}", e);
            Err(ApiError::new(
                Status::ServiceUnavailable,
                "Database unavailable",
                "DATABASE_UNAVAILABLE",
            ))
        }
    }
}

pub async fn stats_handler(
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Stats>> {
    info!("Stats requested by user {}", auth.user_id);
    let stats = services::stats(db).await?;
    Ok(Json(DataResponse::success("Statistics retrieved", stats)))
}
