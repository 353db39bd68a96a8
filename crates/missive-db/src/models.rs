//! Database row types that map directly to SQLite rows.
//! Distinct from the missive-types domain models to keep the DB layer
//! independent; `into_*` conversions produce the typed forms.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use missive_types::models::{Letter, Pair, User};
use uuid::Uuid;

pub struct UserRow {
    pub id: String,
    pub display_name: String,
    pub username: String,
    pub password: String,
    pub invite_code: Option<String>,
    pub paired_with: Option<String>,
    pub created_at: String,
}

pub struct PairRow {
    pub id: String,
    pub user_a_id: String,
    pub user_b_id: String,
    pub delay_seconds: i64,
    pub turn_user_id: String,
    pub last_sent_at: Option<String>,
    pub created_at: String,
}

pub struct LetterRow {
    pub id: String,
    pub pair_id: String,
    pub author_id: String,
    pub body_text: String,
    pub is_favorite: bool,
    pub is_draft: bool,
    pub sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            display_name: self.display_name,
            username: self.username,
            invite_code: self.invite_code,
            paired_with: self.paired_with.as_deref().map(parse_uuid).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl PairRow {
    pub fn into_pair(self) -> Result<Pair> {
        Ok(Pair {
            id: parse_uuid(&self.id)?,
            user_a_id: parse_uuid(&self.user_a_id)?,
            user_b_id: parse_uuid(&self.user_b_id)?,
            delay_seconds: self.delay_seconds,
            turn_user_id: parse_uuid(&self.turn_user_id)?,
            last_sent_at: self.last_sent_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl LetterRow {
    pub fn into_letter(self) -> Result<Letter> {
        Ok(Letter {
            id: parse_uuid(&self.id)?,
            pair_id: parse_uuid(&self.pair_id)?,
            author_id: parse_uuid(&self.author_id)?,
            body_text: self.body_text,
            is_favorite: self.is_favorite,
            is_draft: self.is_draft,
            sent_at: self.sent_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("invalid uuid in database: {s:?}"))
}

/// Rows written from Rust carry RFC 3339 timestamps; columns filled by the
/// `datetime('now')` defaults carry SQLite's zone-less format. Accept both,
/// treating the latter as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("unparseable timestamp in database: {s:?}"))?;
    Ok(naive.and_utc())
}
