//! Turn-and-timer decisions for a pair.
//!
//! Pure functions over a [`Pair`] snapshot and an explicit `now`: no clock
//! reads, no storage access. Handlers pass `Utc::now()` (or a fixed instant in
//! tests) and are the only place a decision becomes a protocol error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Pair;

/// Whether the pair's timer currently allows a send, and how long remains.
///
/// `time_remaining_seconds` is exact whole seconds; rounding up to hours for
/// humans happens in client-facing messages, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerDecision {
    pub can_send: bool,
    #[serde(rename = "timeRemaining")]
    pub time_remaining_seconds: i64,
    /// Set only while the timer is still running, mirroring the wire contract.
    pub next_available_at: Option<DateTime<Utc>>,
}

impl TimerDecision {
    /// The shape a polling client sees before it has a pair at all.
    pub fn unpaired() -> Self {
        Self {
            can_send: false,
            time_remaining_seconds: 0,
            next_available_at: None,
        }
    }
}

/// Outcome of the combined turn + timer check for one prospective sender.
/// Turn is evaluated first; the two rejection reasons stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendEligibility {
    Eligible,
    NotYourTurn,
    MustWait { remaining_seconds: i64 },
}

/// Evaluate the delay timer alone, ignoring whose turn it is.
pub fn timer_decision(pair: &Pair, now: DateTime<Utc>) -> TimerDecision {
    let Some(last_sent_at) = pair.last_sent_at else {
        return TimerDecision {
            can_send: true,
            time_remaining_seconds: 0,
            next_available_at: None,
        };
    };

    let next_available_at = last_sent_at + Duration::seconds(pair.delay_seconds);
    let remaining = (next_available_at - now).num_seconds().max(0);

    TimerDecision {
        can_send: remaining == 0,
        time_remaining_seconds: remaining,
        next_available_at: (remaining > 0).then_some(next_available_at),
    }
}

/// May `user_id` send right now? Requires holding the turn *and* an expired
/// timer; failing either yields its own reason.
pub fn send_eligibility(pair: &Pair, user_id: Uuid, now: DateTime<Utc>) -> SendEligibility {
    if pair.turn_user_id != user_id {
        return SendEligibility::NotYourTurn;
    }

    let timer = timer_decision(pair, now);
    if timer.can_send {
        SendEligibility::Eligible
    } else {
        SendEligibility::MustWait {
            remaining_seconds: timer.time_remaining_seconds,
        }
    }
}
