// src/web/handlers/match_handlers.rs
use crate::auth::AuthenticatedUser;
use crate::database::{Database, MatchResult};
use crate::matching::SharedScorer;
use crate::notifications::Notifier;
use crate::web::services;
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;

pub async fn match_handler(
    request: Json<MatchRequest>,
    auth: AuthenticatedUser,
    db: &State<Database>,
    scorer: &State<SharedScorer>,
    notifier: &State<Notifier>,
) -> ApiResult<DataResponse<MatchResult>> {
    let result = services::run_match(
        db,
        scorer.inner().as_ref(),
        notifier,
        auth.user_id,
        request.into_inner(),
    )
    .await?;

    Ok(Json(DataResponse::success(
        format!("Match completed with score {}", result.score),
        result,
    )))
}

pub async fn bulk_match_handler(
    request: Json<BulkMatchRequest>,
    auth: AuthenticatedUser,
    db: &State<Database>,
    scorer: &State<SharedScorer>,
    notifier: &State<Notifier>,
) -> ApiResult<DataResponse<Vec<BulkMatchItem>>> {
    let items = services::run_bulk_match(
        db,
        scorer.inner().as_ref(),
        notifier,
        auth.user_id,
        request.into_inner(),
    )
    .await?;

    Ok(Json(DataResponse::success(
        format!("Successfully matched {} resumes", items.len()),
        items,
    )))
}

pub async fn match_history_handler(
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<Vec<MatchResult>>> {
    let history = services::match_history(db, auth.user_id).await?;
    Ok(Json(DataResponse::success(
        format!("Found {} match results", history.len()),
        history,
    )))
}

pub async fn get_match_handler(
    id: i64,
    auth: AuthenticatedUser,
    db: &State<Database>,
) -> ApiResult<DataResponse<MatchResult>> {
    let result = services::get_match(db, auth.user_id, id).await?;
    Ok(Json(DataResponse::success("Match result retrieved", result)))
}
