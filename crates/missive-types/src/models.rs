use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account holder. The password hash never leaves the storage layer;
/// this model carries everything else about a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub username: String,
    /// Unique 8-character code handed to a prospective partner. The core
    /// never clears it; it simply stops mattering once paired.
    pub invite_code: Option<String>,
    /// The partner's user id once paired. At most one active pairing per user.
    pub paired_with: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The exchange relationship between exactly two users. `user_a` is the one
/// who confirmed the pairing, `user_b` the invite owner; the order is fixed
/// at creation and carries no meaning beyond "who went first".
///
/// After creation only `turn_user_id` and `last_sent_at` ever change, and only
/// through the send transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    /// Minimum gap between sends, in whole seconds. Bounded to [1 day, 30 days].
    pub delay_seconds: i64,
    /// Which of the two members may send next. Always one of the member ids.
    pub turn_user_id: Uuid,
    /// When the most recent letter was sent, or `None` before the first one.
    pub last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Pair {
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    /// The other member, or `None` if `user_id` is not in this pair.
    pub fn partner_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.user_a_id {
            Some(self.user_b_id)
        } else if user_id == self.user_b_id {
            Some(self.user_a_id)
        } else {
            None
        }
    }
}

/// A letter within a pair. Starts life as a draft (or is created directly as
/// sent); once `is_draft` flips to false the record is immutable except for
/// `is_favorite`, and `sent_at` is set exactly once at that transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Letter {
    pub id: Uuid,
    pub pair_id: Uuid,
    pub author_id: Uuid,
    pub body_text: String,
    pub is_favorite: bool,
    pub is_draft: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
