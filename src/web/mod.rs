// src/web/mod.rs

pub mod handlers;
pub mod services;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::auth::{AuthConfig, AuthFailure, AuthenticatedUser};
use crate::config::AppConfig;
use crate::database::{Database, JobPosting, MatchResult, Resume, Stats, User};
use crate::job_extraction::JobScraper;
use crate::matching::{build_scorer, SharedScorer};
use crate::notifications::Notifier;
use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::http::{Header, Status};
use rocket::response::status;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::select;
use rocket::tokio::sync::broadcast::error::RecvError;
use rocket::{catchers, delete, get, options, post, routes, Build, Request, Response, Rocket, Shutdown, State};
use tracing::{error, info};

const ONE_MIB: u64 = 1024 * 1024;

// CORS Fairing
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    fn allows(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let origin = match request.headers().get_one("Origin") {
            Some(origin) if self.allows(origin) => origin.to_string(),
            _ => return,
        };

        response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, DELETE, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Authorization, Content-Type",
        ));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        response.set_header(Header::new("Vary", "Origin"));
    }
}

// Auth

#[post("/auth/signup", data = "<request>")]
pub async fn signup(
    request: Json<CredentialsRequest>,
    db: &State<Database>,
    auth_config: &State<AuthConfig>,
) -> Result<status::Custom<Json<DataResponse<AuthData>>>, ApiError> {
    handlers::signup_handler(request, db, auth_config).await
}

#[post("/auth/login", data = "<request>")]
pub async fn login(
    request: Json<CredentialsRequest>,
    db: &State<Database>,
    auth_config: &State<AuthConfig>,
) -> ApiResult<DataResponse<AuthData>> {
    handlers::login_handler(request, db, auth_config).await
}

#[get("/auth/me")]
pub async fn me(auth: AuthenticatedUser, db: &State<Database>) -> ApiResult<DataResponse<User>> {
    handlers::me_handler(auth, db).await
}

#[post("/auth/request-password-reset", data = "<request>")]
pub async fn request_password_reset(
    request: Json<PasswordResetRequest>,
    db: &State<Database>,
) -> ApiResult<TextResponse> {
    handlers::request_password_reset_handler(request, db).await
}

#[post("/auth/reset-password", data = "<request>")]
pub async fn reset_password(request: Json<ResetPasswordRequest>) -> ApiResult<TextResponse> {
    handlers::reset_password_handler(request).await
}

// Resumes

#[post("/resumes", data = "<upload>")]
pub async fn upload_resume(
    upload: Form<ResumeUploadForm<'_>>,
    auth: AuthenticatedUser,
    config: &State<ServerConfig>,
    db: &State<Database>,
) -> Result<status::Custom<Json<DataResponse<Resume>>>, ApiError> {
    handlers::upload_resume_handler(upload, auth, config, db).await
}

#[get("/resumes")]
pub async fn list_resumes(
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Vec<Resume>>> {
    handlers::list_resumes_handler(auth, db).await
}

#[get("/resumes/<id>")]
pub async fn get_resume(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Resume>> {
    handlers::get_resume_handler(id, auth, db).await
}

#[delete("/resumes/<id>")]
pub async fn delete_resume(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<ActionResponse> {
    handlers::delete_resume_handler(id, auth, db).await
}

// Jobs

#[post("/jobs/parse", data = "<request>")]
pub async fn parse_job(
    request: Json<ParseJobRequest>,
    auth: AuthenticatedUser,
    db: &State<Database>,
    scraper: &State<JobScraper>,
    notifier: &State<Notifier>,
) -> ApiResult<DataResponse<JobPosting>> {
    handlers::parse_job_handler(request, auth, db, scraper, notifier).await
}

#[get("/jobs")]
pub async fn list_jobs(
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Vec<JobPosting>>> {
    handlers::list_jobs_handler(auth, db).await
}

#[get("/jobs/<id>")]
pub async fn get_job(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<JobPosting>> {
    handlers::get_job_handler(id, auth, db).await
}

#[delete("/jobs/<id>")]
pub async fn delete_job(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<ActionResponse> {
    handlers::delete_job_handler(id, auth, db).await
}

// Matching

#[post("/match", data = "<request>")]
pub async fn run_match(
    request: Json<MatchRequest>,
    auth: AuthenticatedUser,
    db: &State<Database>,
    scorer: &State<SharedScorer>,
    notifier: &State<Notifier>,
) -> ApiResult<DataResponse<MatchResult>> {
    handlers::match_handler(request, auth, db, scorer, notifier).await
}

#[post("/match/bulk", data = "<request>")]
pub async fn bulk_match(
    request: Json<BulkMatchRequest>,
    auth: AuthenticatedUser,
    db: &State<Database>,
    scorer: &State<SharedScorer>,
    notifier: &State<Notifier>,
) -> ApiResult<DataResponse<Vec<BulkMatchItem>>> {
    handlers::bulk_match_handler(request, auth, db, scorer, notifier).await
}

#[get("/match/history")]
pub async fn match_history(
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Vec<MatchResult>>> {
    handlers::match_history_handler(auth, db).await
}

#[get("/match/<id>")]
pub async fn get_match(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<MatchResult>> {
    handlers::get_match_handler(id, auth, db).await
}

// Notifications

/// Server-sent events carrying the caller's own notifications.
#[get("/events")]
pub fn events(auth: AuthenticatedUser, notifier: &State<Notifier>, mut end: Shutdown) -> EventStream![] {
    let mut rx = notifier.subscribe();
    let user_id = auth.user_id;
    info!("User {} subscribed to events", user_id);

    EventStream! {
        loop {
            let msg = select! {
                msg = rx.recv() => match msg {
                    Ok(msg) => msg,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                },
                _ = &mut end => break,
            };

            if msg.user_id == user_id {
                yield Event::json(&msg.payload).event(msg.event.as_str());
            }
        }
    }
}

// System

#[get("/")]
pub async fn root() -> Json<ServiceInfo> {
    handlers::root_handler().await
}

#[get("/health")]
pub async fn health(
    db: &State<Database>,
    scorer: &State<SharedScorer>,
) -> Result<Json<DataResponse<HealthData>>, ApiError> {
    handlers::health_handler(db, scorer).await
}

#[get("/admin/stats")]
pub async fn admin_stats(auth: AuthenticatedUser, db: &State<Database>) -> ApiResult<DataResponse<Stats>> {
    handlers::stats_handler(auth, db).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format",
        "BAD_REQUEST",
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(401)]
pub fn unauthorized(req: &Request) -> Json<StandardErrorResponse> {
    let message = req
        .local_cache(|| AuthFailure(None))
        .0
        .map(|e| e.message())
        .unwrap_or("Authentication required");

    Json(StandardErrorResponse::new(
        message,
        "AUTHENTICATION_ERROR",
        vec!["Log in and send the token as 'Authorization: Bearer <token>'".to_string()],
    ))
}

#[rocket::catch(404)]
pub fn not_found(req: &Request) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        format!("No route for {} {}", req.method(), req.uri().path()),
        "NOT_FOUND",
        vec!["Check the endpoint path".to_string()],
    ))
}

#[rocket::catch(413)]
pub fn payload_too_large(req: &Request) -> Json<StandardErrorResponse> {
    let max = req
        .rocket()
        .state::<ServerConfig>()
        .map(|config| config.max_upload_bytes / ONE_MIB)
        .unwrap_or(5);

    Json(StandardErrorResponse::new(
        format!("File too large. Maximum size is {}MB.", max),
        "PAYLOAD_TOO_LARGE",
        vec!["Upload a smaller file".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body could not be parsed",
        "UNPROCESSABLE_ENTITY",
        vec!["Verify field names and types".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error",
        "INTERNAL_ERROR",
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

/// Assemble the application with its managed state. The upload limits sit
/// above `max_upload_bytes` so oversize files still reach the handler's own
/// size check.
pub fn build_rocket(
    config: &AppConfig,
    db: Database,
    scraper: JobScraper,
    scorer: SharedScorer,
    notifier: Notifier,
) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("file", (config.max_upload_bytes + ONE_MIB).bytes())
        .limit("data-form", (config.max_upload_bytes + 2 * ONE_MIB).bytes());

    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("limits", limits));

    let server_config = ServerConfig {
        upload_path: config.upload_path.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };

    rocket::custom(figment)
        .attach(Cors::new(config.cors_origins.clone()))
        .manage(server_config)
        .manage(AuthConfig::new(config.jwt_secret.clone()))
        .manage(db)
        .manage(scraper)
        .manage(scorer)
        .manage(notifier)
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                not_found,
                payload_too_large,
                unprocessable,
                internal_error
            ],
        )
        .mount("/", routes![root])
        .mount(
            "/api",
            routes![
                signup,
                login,
                me,
                request_password_reset,
                reset_password,
                upload_resume,
                list_resumes,
                get_resume,
                delete_resume,
                parse_job,
                list_jobs,
                get_job,
                delete_job,
                run_match,
                bulk_match,
                match_history,
                get_match,
                events,
                health,
                admin_stats,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: AppConfig) -> Result<()> {
    config.ensure_directories().await?;

    let db = match Database::connect(&config.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {:#}", e);
            return Err(e);
        }
    };

    let scraper = JobScraper::http(config.scrape_timeout_seconds)?;
    let scorer = build_scorer(&config.llm)?;

    info!("Starting ResumeRanker API server on port {}", config.port);
    info!("Database: {}", config.database_path.display());
    info!("Uploads: {}", config.upload_path.display());

    let rocket = build_rocket(&config, db.clone(), scraper, scorer, Notifier::default());
    let result = rocket.launch().await;

    db.close().await;
    result
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
