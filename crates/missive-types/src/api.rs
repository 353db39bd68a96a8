use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Letter, Pair, User};
use crate::turn::TimerDecision;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the auth handlers. Canonical
/// definition lives here so both sides agree on the token shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Response envelope --

/// Uniform wire envelope: `{success, data?, error?, message?}`. Every
/// endpoint, success or failure, responds in this shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
        }
    }

    /// Success with no payload, e.g. an idempotent delete.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

// -- Auth --

/// Required fields are optional here so a missing field becomes a 400 in the
/// envelope rather than a bare deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The caller's own identity as returned by signup/login, and the only place
/// the invite code travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub paired_with: Option<Uuid>,
    pub invite_code: Option<String>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            paired_with: user.paired_with,
            invite_code: user.invite_code.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthData {
    pub user: AuthUser,
    pub token: String,
}

// -- Users --

/// What one member may see of the other: no invite code, no pairing pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub display_name: String,
    pub username: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
            username: user.username.clone(),
        }
    }
}

// -- Drafts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaveDraftRequest {
    pub body_text: Option<String>,
    /// When present and still a live draft of the caller, that row is updated
    /// in place; otherwise saving falls back to replace-the-draft.
    pub draft_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendDraftRequest {
    pub draft_id: Option<Uuid>,
}

// -- Letters --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendLetterRequest {
    pub body_text: Option<String>,
}

/// A letter plus its author's public identity, as rendered on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterView {
    #[serde(flatten)]
    pub letter: Letter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<PublicUser>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LetterData {
    pub letter: LetterView,
}

/// The pair record with both members and the non-draft letters, newest first.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairView {
    #[serde(flatten)]
    pub pair: Pair,
    pub user_a: PublicUser,
    pub user_b: PublicUser,
    pub letters: Vec<LetterView>,
}

/// Everything the polling client needs in one fetch. `pair` and `partner` are
/// null before pairing; that is a normal state, not an error.
/// `is_your_turn` is the raw turn flag; the timer travels separately so the
/// client can tell "not my turn" from "my turn but waiting".
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairInfo {
    pub pair: Option<PairView>,
    pub partner: Option<PublicUser>,
    pub is_your_turn: bool,
    pub timer: TimerDecision,
}

impl PairInfo {
    pub fn unpaired() -> Self {
        Self {
            pair: None,
            partner: None,
            is_your_turn: false,
            timer: TimerDecision::unpaired(),
        }
    }
}

// -- Pairing --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinPairRequest {
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfirmPairRequest {
    pub partner_id: Option<Uuid>,
    /// Defaults to one day when omitted.
    pub delay_seconds: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PairJoinData {
    pub partner: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PairConfirmData {
    pub pair: Pair,
    pub partner: PublicUser,
}

/// Compact exchange-state view for `GET /pair`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairStatus {
    pub paired: bool,
    pub pair: Option<Pair>,
    pub partner: Option<PublicUser>,
    pub is_your_turn: bool,
    pub timer: TimerDecision,
    pub letters_sent: i64,
}

impl PairStatus {
    pub fn unpaired() -> Self {
        Self {
            paired: false,
            pair: None,
            partner: None,
            is_your_turn: false,
            timer: TimerDecision::unpaired(),
            letters_sent: 0,
        }
    }
}
