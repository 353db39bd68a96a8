use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;

use missive_db::{SendOutcome, SendSource};
use missive_types::api::{ApiResponse, Claims, SaveDraftRequest, SendDraftRequest};

use crate::auth::AppState;
use crate::error::{ApiError, join_error};

pub async fn get_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;

    // Run blocking DB reads off the async runtime
    let draft = tokio::task::spawn_blocking(move || {
        let pair = db
            .db
            .find_pair_for_user(user_id)
            .map_err(ApiError::from)?
            .ok_or_else(ApiError::not_paired)?;
        db.db.get_draft(pair.id, user_id).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(ApiResponse::ok(draft)))
}

pub async fn save_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body_text = req
        .body_text
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::Validation("Letter content is required".into()))?;

    let db = state.clone();
    let user_id = claims.sub;
    let draft_id = req.draft_id;
    let now = Utc::now();

    let draft = tokio::task::spawn_blocking(move || {
        let pair = db
            .db
            .find_pair_for_user(user_id)
            .map_err(ApiError::from)?
            .ok_or_else(ApiError::not_paired)?;
        db.db
            .save_draft(pair.id, user_id, draft_id, &body_text, now)
            .map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(ApiResponse::ok_with_message(
        draft,
        "Draft saved successfully",
    )))
}

pub async fn delete_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;

    // Deleting an absent draft is still success: the draft is gone either way.
    tokio::task::spawn_blocking(move || {
        let pair = db
            .db
            .find_pair_for_user(user_id)
            .map_err(ApiError::from)?
            .ok_or_else(ApiError::not_paired)?;
        db.db
            .delete_drafts(pair.id, user_id)
            .map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(ApiResponse::<()>::message_only(
        "Draft deleted successfully",
    )))
}

pub async fn send_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendDraftRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft_id = req
        .draft_id
        .ok_or_else(|| ApiError::Validation("Draft ID is required".into()))?;

    let db = state.clone();
    let user_id = claims.sub;
    let now = Utc::now();

    let outcome = tokio::task::spawn_blocking(move || {
        db.db.send_letter(user_id, SendSource::Draft(draft_id), now)
    })
    .await
    .map_err(join_error)??;

    let letter = match outcome {
        SendOutcome::Sent(letter) => letter,
        SendOutcome::NotPaired => return Err(ApiError::not_paired()),
        SendOutcome::NotYourTurn => return Err(ApiError::NotYourTurn),
        SendOutcome::MustWait { remaining_seconds } => {
            return Err(ApiError::MustWait { remaining_seconds });
        }
        SendOutcome::DraftMissing => return Err(ApiError::NotFound("Draft not found".into())),
    };

    Ok(Json(ApiResponse::ok_with_message(
        letter,
        "Letter sent successfully!",
    )))
}
