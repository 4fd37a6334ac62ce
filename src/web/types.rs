// src/web/types.rs

use crate::database::{MatchResult, User};
use crate::error::{ScrapeError, ServiceError};
use crate::job_extraction::JobRecord;
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::Request;
use std::path::PathBuf;
use tracing::error;

pub struct ServerConfig {
    pub upload_path: PathBuf,
    pub max_upload_bytes: u64,
}

// Response envelopes

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
}

#[derive(Serialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

impl TextResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message: message.into(),
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl ActionResponse {
    pub fn success(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message: message.into(),
            action: action.into(),
        }
    }
}

impl StandardErrorResponse {
    pub fn new(error: impl Into<String>, error_code: &str, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error: error.into(),
            error_code: error_code.to_string(),
            suggestions,
        }
    }
}

/// Error half of every handler result: a status plus the error envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: Status,
    pub body: StandardErrorResponse,
}

impl ApiError {
    pub fn new(status: Status, error: impl Into<String>, error_code: &str) -> Self {
        Self {
            status,
            body: StandardErrorResponse::new(error, error_code, Vec::new()),
        }
    }

    pub fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.body.suggestions = suggestions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, error, "VALIDATION_ERROR")
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => ApiError::bad_request(message),
            ServiceError::NotFound(message) => ApiError::new(Status::NotFound, message, "NOT_FOUND"),
            ServiceError::Conflict(message) => ApiError::new(Status::Conflict, message, "CONFLICT"),
            ServiceError::Unauthorized(message) => {
                ApiError::new(Status::Unauthorized, message, "UNAUTHORIZED")
            }
            ServiceError::NotImplemented(message) => {
                ApiError::new(Status::NotImplemented, message, "NOT_IMPLEMENTED")
            }
            ServiceError::Scrape(ScrapeError::InvalidUrl(detail)) => ApiError::new(
                Status::BadRequest,
                format!("Invalid URL provided: {}", detail),
                "INVALID_URL",
            )
            .with_suggestions(&["Use a full http:// or https:// job posting URL"]),
            ServiceError::Scrape(e) => ApiError::new(
                Status::BadGateway,
                format!("Failed to parse job posting: {}", e),
                "SCRAPE_FAILED",
            )
            .with_suggestions(&[
                "Check that the job posting URL is reachable",
                "Try again in a few moments",
            ]),
            ServiceError::Internal(e) => {
                error!("Internal error: {:#}", e);
                ApiError::new(Status::InternalServerError, "Internal server error", "INTERNAL_ERROR")
                    .with_suggestions(&["Try again in a few moments"])
            }
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        (self.status, Json(self.body)).respond_to(req)
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

// Requests. Missing fields deserialize to empty values so the handlers can
// answer with a precise validation message instead of a bare 422.

#[derive(Deserialize, Default)]
#[serde(crate = "rocket::serde", default)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(crate = "rocket::serde", default)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize, Default)]
#[serde(crate = "rocket::serde", default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(crate = "rocket::serde", default)]
pub struct ParseJobRequest {
    pub url: String,
}

#[derive(Deserialize, Default)]
#[serde(crate = "rocket::serde", default, rename_all = "camelCase")]
pub struct MatchRequest {
    pub resume_id: Option<i64>,
    pub resume_text: Option<String>,
    pub job_posting_id: Option<i64>,
    pub job_data: Option<JobRecord>,
}

#[derive(Deserialize, Default)]
#[serde(crate = "rocket::serde", default, rename_all = "camelCase")]
pub struct BulkMatchRequest {
    pub resume_ids: Vec<i64>,
    pub job_posting_id: Option<i64>,
    pub job_data: Option<JobRecord>,
}

#[derive(FromForm)]
pub struct ResumeUploadForm<'f> {
    pub file: Option<TempFile<'f>>,
}

// Response payloads

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AuthData {
    pub token: String,
    pub user: User,
}

#[derive(Serialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct BulkMatchItem {
    pub resume_id: i64,
    pub resume_name: String,
    pub match_result: MatchResult,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthData {
    pub status: &'static str,
    pub database: &'static str,
    pub scorer: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_statuses() {
        let cases: Vec<(ServiceError, Status, &str)> = vec![
            (ServiceError::Validation("x".into()), Status::BadRequest, "VALIDATION_ERROR"),
            (ServiceError::NotFound("x".into()), Status::NotFound, "NOT_FOUND"),
            (ServiceError::Conflict("x".into()), Status::Conflict, "CONFLICT"),
            (ServiceError::Unauthorized("x".into()), Status::Unauthorized, "UNAUTHORIZED"),
            (ServiceError::NotImplemented("x".into()), Status::NotImplemented, "NOT_IMPLEMENTED"),
            (
                ServiceError::Scrape(ScrapeError::InvalidUrl("ftp://x".into())),
                Status::BadRequest,
                "INVALID_URL",
            ),
            (
                ServiceError::Scrape(ScrapeError::Status(reqwest::StatusCode::NOT_FOUND)),
                Status::BadGateway,
                "SCRAPE_FAILED",
            ),
            (
                ServiceError::Internal(anyhow::anyhow!("boom")),
                Status::InternalServerError,
                "INTERNAL_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, status);
            assert_eq!(api.body.error_code, code);
            assert!(!api.body.success);
        }
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let api: ApiError = ServiceError::Internal(anyhow::anyhow!("secret path /var/db")).into();
        assert_eq!(api.body.error, "Internal server error");
    }

    #[test]
    fn test_match_request_uses_camel_case() {
        let req: MatchRequest = rocket::serde::json::from_str(
            r#"{"resumeId": 3, "jobData": {"title": "Dev", "skills": ["Rust"]}}"#,
        )
        .unwrap();
        assert_eq!(req.resume_id, Some(3));
        assert!(req.resume_text.is_none());
        assert_eq!(req.job_data.unwrap().skills, vec!["Rust"]);

        let bulk: BulkMatchRequest = rocket::serde::json::from_str(r#"{}"#).unwrap();
        assert!(bulk.resume_ids.is_empty());
    }
}
