use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;

use missive_db::ConfirmPairOutcome;
use missive_types::api::{
    ApiResponse, Claims, ConfirmPairRequest, JoinPairRequest, PairConfirmData, PairJoinData,
    PairStatus, PublicUser,
};
use missive_types::turn;

use crate::auth::AppState;
use crate::error::ApiError;

const MIN_DELAY_SECONDS: i64 = 86_400;
const MAX_DELAY_SECONDS: i64 = 30 * 86_400;

/// Resolve an invite code to its owner. Validation only; nothing is written
/// until the requester confirms.
pub async fn join(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinPairRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = req
        .invite_code
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("Invite code is required".into()))?;

    let owner = state
        .db
        .get_user_by_invite_code(&code)?
        .ok_or(ApiError::InvalidCode)?
        .into_user()?;

    if owner.id == claims.sub {
        return Err(ApiError::SelfInvite);
    }
    if owner.paired_with.is_some() {
        return Err(ApiError::AlreadyPaired(
            "This user is already paired with someone".into(),
        ));
    }

    let requester = state
        .db
        .get_user_by_id(claims.sub)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?
        .into_user()?;
    if requester.paired_with.is_some() {
        return Err(ApiError::AlreadyPaired(
            "You are already paired with someone".into(),
        ));
    }

    Ok(Json(ApiResponse::ok_with_message(
        PairJoinData {
            partner: PublicUser::from(&owner),
        },
        "Valid invite code. Ready to pair.",
    )))
}

/// Finalize the pairing. The storage transaction re-checks everything the
/// join step saw, so two concurrent confirmations involving the same user
/// cannot both succeed.
pub async fn confirm(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmPairRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let partner_id = req
        .partner_id
        .ok_or_else(|| ApiError::Validation("Partner ID is required".into()))?;

    let delay_seconds = req.delay_seconds.unwrap_or(MIN_DELAY_SECONDS);
    if !(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS).contains(&delay_seconds) {
        return Err(ApiError::Validation(
            "Delay must be between 1 and 30 days".into(),
        ));
    }

    let outcome = state
        .db
        .confirm_pair(claims.sub, partner_id, delay_seconds, Utc::now())?;

    let (pair, partner) = match outcome {
        ConfirmPairOutcome::Paired { pair, partner } => (pair, partner),
        ConfirmPairOutcome::PartnerMissing => {
            return Err(ApiError::NotFound("Partner not found".into()));
        }
        ConfirmPairOutcome::SelfPair => return Err(ApiError::SelfInvite),
        ConfirmPairOutcome::RequesterAlreadyPaired => {
            return Err(ApiError::AlreadyPaired(
                "You are already paired with someone".into(),
            ));
        }
        ConfirmPairOutcome::PartnerAlreadyPaired => {
            return Err(ApiError::AlreadyPaired(
                "This user is already paired with someone".into(),
            ));
        }
    };

    Ok(Json(ApiResponse::ok_with_message(
        PairConfirmData {
            pair,
            partner: PublicUser::from(&partner),
        },
        "Successfully paired! You can now start exchanging letters.",
    )))
}

/// Compact exchange-state view: members, whose turn, timer, letters sent.
pub async fn pair_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;

    let Some(pair) = state.db.find_pair_for_user(user_id)? else {
        return Ok(Json(ApiResponse::ok(PairStatus::unpaired())));
    };

    let partner_id = pair.partner_of(user_id).ok_or_else(|| {
        ApiError::Storage(anyhow::anyhow!("caller is not a member of its own pair"))
    })?;
    let partner = state
        .db
        .get_user_by_id(partner_id)?
        .ok_or_else(|| ApiError::Storage(anyhow::anyhow!("pair member missing")))?
        .into_user()?;
    let letters_sent = state.db.count_sent_letters(pair.id)?;

    let status = PairStatus {
        paired: true,
        partner: Some(PublicUser::from(&partner)),
        is_your_turn: pair.turn_user_id == user_id,
        timer: turn::timer_decision(&pair, Utc::now()),
        letters_sent,
        pair: Some(pair),
    };

    Ok(Json(ApiResponse::ok(status)))
}
