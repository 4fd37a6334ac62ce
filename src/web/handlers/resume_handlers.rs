// src/web/handlers/resume_handlers.rs
use crate::auth::AuthenticatedUser;
use crate::database::{Database, Resume};
use crate::documents::{stored_path, ALLOWED_EXTENSIONS};
use crate::utils::{get_file_extension, sanitize_filename, validate_file_extension};
use crate::web::services;
use crate::web::types::*;

use rocket::form::Form;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

/// Displayed name for an upload: sanitized, with the validated extension
/// restored when sanitizing ate it.
fn display_filename(original: &str, extension: &str) -> String {
    let sanitized = sanitize_filename(original);
    match get_file_extension(&sanitized) {
        Some(ext) if ext == extension => sanitized,
        _ => format!("{}.{}", sanitized, extension),
    }
}

fn max_size_label(max_upload_bytes: u64) -> String {
    format!("{}MB", max_upload_bytes / (1024 * 1024))
}

pub async fn upload_resume_handler(
    mut upload: Form<ResumeUploadForm<'_>>,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db: &State<Database>,
) -> Result<status::Custom<Json<DataResponse<Resume>>>, ApiError> {
    let file = upload
        .file
        .as_mut()
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let original = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_default();

    if let Err(e) = validate_file_extension(&original, ALLOWED_EXTENSIONS) {
        warn!("Rejected upload '{}': {}", original, e);
        return Err(ApiError::bad_request(
            "Invalid file type. Only PDF, DOC, and DOCX files are allowed.",
        )
        .with_suggestions(&["Upload a .pdf, .doc or .docx file"]));
    }
    let extension = get_file_extension(&original).unwrap_or_default();

    if file.len() == 0 {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if file.len() > config.max_upload_bytes {
        return Err(ApiError::bad_request(format!(
            "File too large. Maximum size is {}.",
            max_size_label(config.max_upload_bytes)
        )));
    }

    let filename = display_filename(&original, &extension);
    let path = stored_path(&config.upload_path, &filename);

    if let Err(e) = file.move_copy_to(&path).await {
        error!("Failed to store upload {}: {}", path.display(), e);
        return Err(ApiError::new(
            Status::InternalServerError,
            "Failed to save uploaded file",
            "UPLOAD_FAILED",
        ));
    }
    info!("Stored upload '{}' at {}", original, path.display());

    let resume = services::register_resume(db, auth.user_id, &filename, &path).await?;

    Ok(status::Custom(
        Status::Created,
        Json(DataResponse::success("Resume uploaded successfully", resume)),
    ))
}

pub async fn list_resumes_handler(
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Vec<Resume>>> {
    let resumes = services::list_resumes(db, auth.user_id).await?;
    Ok(Json(DataResponse::success(
        format!("Found {} resumes", resumes.len()),
        resumes,
    )))
}

pub async fn get_resume_handler(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Resume>> {
    let resume = services::get_resume(db, auth.user_id, id).await?;
    Ok(Json(DataResponse::success("Resume retrieved", resume)))
}

pub async fn delete_resume_handler(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<ActionResponse> {
    services::delete_resume(db, auth.user_id, id).await?;
    Ok(Json(ActionResponse::success(
        "Resume deleted successfully",
        "resume_deleted",
    )))
}
