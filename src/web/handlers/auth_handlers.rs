// src/web/handlers/auth_handlers.rs
use crate::auth::{AuthConfig, AuthenticatedUser};
use crate::database::{Database, User};
use crate::web::services;
use crate::web::types::*;

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

pub async fn signup_handler(
    request: Json<CredentialsRequest>,
    db: &State<Database>,
    auth_config: &State<AuthConfig>,
) -> Result<status::Custom<Json<DataResponse<AuthData>>>, ApiError> {
    let (token, user) =
        services::signup(db, auth_config, &request.email, &request.password).await?;
    info!("New user registered: {}", user.email);

    Ok(status::Custom(
        Status::Created,
        Json(DataResponse::success(
            "User created successfully",
            AuthData { token, user },
        )),
    ))
}

pub async fn login_handler(
    request: Json<CredentialsRequest>,
    db: &State<Database>,
    auth_config: &State<AuthConfig>,
) -> ApiResult<DataResponse<AuthData>> {
    let (token, user) =
        services::login(db, auth_config, &request.email, &request.password).await?;

    Ok(Json(DataResponse::success(
        "Login successful",
        AuthData { token, user },
    )))
}

pub async fn me_handler(
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<User>> {
    let user = services::current_user(db, auth.user_id).await?;
    Ok(Json(DataResponse::success(
        "User authenticated successfully",
        user,
    )))
}

pub async fn request_password_reset_handler(
    request: Json<PasswordResetRequest>,
    db: &State<Database>,
) -> ApiResult<TextResponse> {
    let message = services::request_password_reset(db, &request.email).await?;
    Ok(Json(TextResponse::success(message)))
}

pub async fn reset_password_handler(
    request: Json<ResetPasswordRequest>,
) -> ApiResult<TextResponse> {
    services::reset_password(&request.token, &request.password)?;
    Ok(Json(TextResponse::success("Password has been reset")))
}
