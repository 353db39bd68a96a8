use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use missive_db::{FavoriteOutcome, SendOutcome, SendSource};
use missive_types::api::{
    ApiResponse, Claims, LetterData, LetterView, PairInfo, PairView, PublicUser, SendLetterRequest,
};
use missive_types::turn;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};

/// One fetch for the polling client: pair, members, letters, turn, timer.
/// Unpaired callers get a success envelope with null pair and partner, the
/// normal pre-pairing state rather than an error.
pub async fn get_letters(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;

    // Run all blocking DB queries off the async runtime
    let bundle = tokio::task::spawn_blocking(move || {
        let Some(pair) = db.db.find_pair_for_user(user_id)? else {
            return Ok(None);
        };
        let user_a = db
            .db
            .get_user_by_id(pair.user_a_id)?
            .context("pair member missing")?
            .into_user()?;
        let user_b = db
            .db
            .get_user_by_id(pair.user_b_id)?
            .context("pair member missing")?
            .into_user()?;
        let letters = db.db.list_sent_letters(pair.id)?;
        Ok::<_, anyhow::Error>(Some((pair, user_a, user_b, letters)))
    })
    .await
    .map_err(join_error)??;

    let Some((pair, user_a, user_b, letters)) = bundle else {
        return Ok(Json(ApiResponse::ok(PairInfo::unpaired())));
    };

    let timer = turn::timer_decision(&pair, Utc::now());
    let is_your_turn = pair.turn_user_id == user_id;

    let a_public = PublicUser::from(&user_a);
    let b_public = PublicUser::from(&user_b);
    let partner = if pair.user_a_id == user_id {
        b_public.clone()
    } else {
        a_public.clone()
    };

    let letters = letters
        .into_iter()
        .map(|letter| {
            let author = if letter.author_id == user_a.id {
                a_public.clone()
            } else {
                b_public.clone()
            };
            LetterView {
                letter,
                author: Some(author),
            }
        })
        .collect();

    let info = PairInfo {
        pair: Some(PairView {
            pair,
            user_a: a_public,
            user_b: b_public,
            letters,
        }),
        partner: Some(partner),
        is_your_turn,
        timer,
    };

    Ok(Json(ApiResponse::ok(info)))
}

pub async fn send_letter(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendLetterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body_text = req
        .body_text
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::Validation("Letter content is required".into()))?;

    let db = state.clone();
    let user_id = claims.sub;
    let now = Utc::now();

    let (outcome, author) = tokio::task::spawn_blocking(move || {
        let outcome = db.db.send_letter(user_id, SendSource::Body(body_text), now)?;
        let author = match &outcome {
            SendOutcome::Sent(_) => Some(
                db.db
                    .get_user_by_id(user_id)?
                    .context("sender row missing")?
                    .into_user()?,
            ),
            _ => None,
        };
        Ok::<_, anyhow::Error>((outcome, author))
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
        // Unreachable on the direct-send path, but the mapping stays total.
        SendOutcome::DraftMissing => return Err(ApiError::NotFound("Draft not found".into())),
    };

    let author = author.as_ref().map(PublicUser::from);

    Ok(Json(ApiResponse::ok_with_message(
        LetterData {
            letter: LetterView { letter, author },
        },
        "Letter sent successfully! Now wait for your partner to reply.",
    )))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(letter_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;
    let now = Utc::now();

    let (outcome, author) = tokio::task::spawn_blocking(move || {
        let outcome = db.db.toggle_favorite(letter_id, user_id, now)?;
        let author = match &outcome {
            FavoriteOutcome::Toggled(letter) => Some(
                db.db
                    .get_user_by_id(letter.author_id)?
                    .context("letter author missing")?
                    .into_user()?,
            ),
            _ => None,
        };
        Ok::<_, anyhow::Error>((outcome, author))
    })
    .await
    .map_err(join_error)??;

    let letter = match outcome {
        FavoriteOutcome::Toggled(letter) => letter,
        FavoriteOutcome::LetterMissing => {
            return Err(ApiError::NotFound("Letter not found".into()));
        }
        FavoriteOutcome::NotMember => {
            return Err(ApiError::Forbidden(
                "You do not have access to this letter".into(),
            ));
        }
    };

    let message = if letter.is_favorite {
        "Letter added to favorites"
    } else {
        "Letter removed from favorites"
    };
    let author = author.as_ref().map(PublicUser::from);

    Ok(Json(ApiResponse::ok_with_message(
        LetterData {
            letter: LetterView { letter, author },
        },
        message,
    )))
}
