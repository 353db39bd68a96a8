use crate::Database;
use crate::models::{LetterRow, PairRow, UserRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use missive_types::models::{Letter, Pair, User};
use missive_types::turn::{self, SendEligibility};
use rusqlite::{Connection, params};
use uuid::Uuid;

/// Where the body of an outgoing letter comes from.
#[derive(Debug, Clone)]
pub enum SendSource {
    /// Direct send: the request body becomes the letter.
    Body(String),
    /// Promote the author's saved draft with this id.
    Draft(Uuid),
}

/// Result of attempting to send a letter. The checks run inside the same
/// transaction as the writes, so a racing duplicate send observes the
/// committed turn flip and comes back `NotYourTurn`.
#[derive(Debug)]
pub enum SendOutcome {
    Sent(Letter),
    NotPaired,
    NotYourTurn,
    MustWait { remaining_seconds: i64 },
    DraftMissing,
}

#[derive(Debug)]
pub enum ConfirmPairOutcome {
    Paired { pair: Pair, partner: User },
    PartnerMissing,
    SelfPair,
    RequesterAlreadyPaired,
    PartnerAlreadyPaired,
}

#[derive(Debug)]
pub enum FavoriteOutcome {
    Toggled(Letter),
    LetterMissing,
    NotMember,
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: Uuid,
        display_name: &str,
        username: &str,
        password_hash: &str,
        invite_code: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, display_name, username, password, invite_code, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    display_name,
                    username,
                    password_hash,
                    invite_code,
                    created_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, &id.to_string()))
    }

    /// Exact-match lookup; callers normalize the code (trim + uppercase) first.
    pub fn get_user_by_invite_code(&self, invite_code: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE invite_code = ?1"
            ))?;
            let row = stmt.query_row([invite_code], user_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn invite_code_taken(&self, invite_code: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE invite_code = ?1",
                [invite_code],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Pairs --

    pub fn find_pair_for_user(&self, user_id: Uuid) -> Result<Option<Pair>> {
        self.with_conn(|conn| {
            let row = query_pair_for_user(conn, &user_id.to_string())?;
            row.map(PairRow::into_pair).transpose()
        })
    }

    /// Create the pair and cross-link both members, re-checking that neither
    /// side got paired since the invite code was validated. The confirming
    /// requester takes the first turn.
    pub fn confirm_pair(
        &self,
        requester_id: Uuid,
        partner_id: Uuid,
        delay_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<ConfirmPairOutcome> {
        self.with_conn_mut(|conn| {
            if requester_id == partner_id {
                return Ok(ConfirmPairOutcome::SelfPair);
            }

            let tx = conn.transaction()?;

            let requester = query_user_by_id(&tx, &requester_id.to_string())?
                .context("confirming user no longer exists")?;
            if requester.paired_with.is_some() {
                return Ok(ConfirmPairOutcome::RequesterAlreadyPaired);
            }

            let Some(partner) = query_user_by_id(&tx, &partner_id.to_string())? else {
                return Ok(ConfirmPairOutcome::PartnerMissing);
            };
            if partner.paired_with.is_some() {
                return Ok(ConfirmPairOutcome::PartnerAlreadyPaired);
            }

            let pair_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO pairs (id, user_a_id, user_b_id, delay_seconds, turn_user_id, last_sent_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?2, NULL, ?5)",
                params![
                    pair_id.to_string(),
                    requester_id.to_string(),
                    partner_id.to_string(),
                    delay_seconds,
                    now.to_rfc3339()
                ],
            )?;
            tx.execute(
                "UPDATE users SET paired_with = ?1 WHERE id = ?2",
                params![partner_id.to_string(), requester_id.to_string()],
            )?;
            tx.execute(
                "UPDATE users SET paired_with = ?1 WHERE id = ?2",
                params![requester_id.to_string(), partner_id.to_string()],
            )?;

            let pair = query_pair_by_id(&tx, &pair_id.to_string())?
                .context("pair vanished mid-transaction")?
                .into_pair()?;
            let partner = partner.into_user()?;

            tx.commit()?;
            Ok(ConfirmPairOutcome::Paired { pair, partner })
        })
    }

    // -- Letters --

    pub fn get_draft(&self, pair_id: Uuid, author_id: Uuid) -> Result<Option<Letter>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LETTER_COLUMNS} FROM letters
                 WHERE pair_id = ?1 AND author_id = ?2 AND is_draft = 1"
            ))?;
            let row = stmt
                .query_row(
                    params![pair_id.to_string(), author_id.to_string()],
                    letter_from_row,
                )
                .optional()?;
            row.map(LetterRow::into_letter).transpose()
        })
    }

    /// Upsert the author's single working draft. A known `draft_id` is updated
    /// in place; otherwise any previous draft is replaced wholesale, which is
    /// what keeps the one-draft-per-author index satisfied.
    pub fn save_draft(
        &self,
        pair_id: Uuid,
        author_id: Uuid,
        draft_id: Option<Uuid>,
        body_text: &str,
        now: DateTime<Utc>,
    ) -> Result<Letter> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now_text = now.to_rfc3339();

            if let Some(existing_id) = draft_id {
                let changed = tx.execute(
                    "UPDATE letters SET body_text = ?1, updated_at = ?2
                     WHERE id = ?3 AND pair_id = ?4 AND author_id = ?5 AND is_draft = 1",
                    params![
                        body_text,
                        now_text,
                        existing_id.to_string(),
                        pair_id.to_string(),
                        author_id.to_string()
                    ],
                )?;
                if changed == 1 {
                    let letter = query_letter_by_id(&tx, &existing_id.to_string())?
                        .context("draft vanished mid-transaction")?
                        .into_letter()?;
                    tx.commit()?;
                    return Ok(letter);
                }
                // Stale or foreign id: fall through and replace the draft.
            }

            tx.execute(
                "DELETE FROM letters WHERE pair_id = ?1 AND author_id = ?2 AND is_draft = 1",
                params![pair_id.to_string(), author_id.to_string()],
            )?;
            let id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO letters (id, pair_id, author_id, body_text, is_favorite, is_draft, sent_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, 1, NULL, ?5, ?5)",
                params![
                    id.to_string(),
                    pair_id.to_string(),
                    author_id.to_string(),
                    body_text,
                    now_text
                ],
            )?;

            let letter = query_letter_by_id(&tx, &id.to_string())?
                .context("draft vanished mid-transaction")?
                .into_letter()?;
            tx.commit()?;
            Ok(letter)
        })
    }

    /// Returns how many drafts were removed (0 or 1).
    pub fn delete_drafts(&self, pair_id: Uuid, author_id: Uuid) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM letters WHERE pair_id = ?1 AND author_id = ?2 AND is_draft = 1",
                params![pair_id.to_string(), author_id.to_string()],
            )?;
            Ok(deleted)
        })
    }

    /// The send path: one transaction covering the turn-and-timer check, the
    /// letter write, and the turn flip.
    pub fn send_letter(
        &self,
        sender_id: Uuid,
        source: SendSource,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(pair) = query_pair_for_user(&tx, &sender_id.to_string())? else {
                return Ok(SendOutcome::NotPaired);
            };
            let pair = pair.into_pair()?;

            match turn::send_eligibility(&pair, sender_id, now) {
                SendEligibility::Eligible => {}
                SendEligibility::NotYourTurn => return Ok(SendOutcome::NotYourTurn),
                SendEligibility::MustWait { remaining_seconds } => {
                    return Ok(SendOutcome::MustWait { remaining_seconds });
                }
            }

            let now_text = now.to_rfc3339();
            let letter_id = match source {
                SendSource::Draft(draft_id) => {
                    let changed = tx.execute(
                        "UPDATE letters SET is_draft = 0, sent_at = ?1, updated_at = ?1
                         WHERE id = ?2 AND pair_id = ?3 AND author_id = ?4 AND is_draft = 1",
                        params![
                            now_text,
                            draft_id.to_string(),
                            pair.id.to_string(),
                            sender_id.to_string()
                        ],
                    )?;
                    if changed == 0 {
                        return Ok(SendOutcome::DraftMissing);
                    }
                    draft_id
                }
                SendSource::Body(body_text) => {
                    let id = Uuid::new_v4();
                    tx.execute(
                        "INSERT INTO letters (id, pair_id, author_id, body_text, is_favorite, is_draft, sent_at, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5, ?5)",
                        params![
                            id.to_string(),
                            pair.id.to_string(),
                            sender_id.to_string(),
                            body_text,
                            now_text
                        ],
                    )?;
                    id
                }
            };

            // Eligibility already proved the sender holds the turn, so the
            // partner lookup cannot miss.
            let next_turn = pair
                .partner_of(sender_id)
                .context("sender is not a member of the pair")?;
            tx.execute(
                "UPDATE pairs SET turn_user_id = ?1, last_sent_at = ?2 WHERE id = ?3",
                params![next_turn.to_string(), now_text, pair.id.to_string()],
            )?;

            let letter = query_letter_by_id(&tx, &letter_id.to_string())?
                .context("sent letter vanished mid-transaction")?
                .into_letter()?;

            tx.commit()?;
            Ok(SendOutcome::Sent(letter))
        })
    }

    /// Either member of the pair may favorite a letter, not just its author.
    pub fn toggle_favorite(
        &self,
        letter_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FavoriteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(letter) = query_letter_by_id(&tx, &letter_id.to_string())? else {
                return Ok(FavoriteOutcome::LetterMissing);
            };
            let pair = query_pair_by_id(&tx, &letter.pair_id)?
                .context("letter references a missing pair")?
                .into_pair()?;
            if !pair.is_member(user_id) {
                return Ok(FavoriteOutcome::NotMember);
            }

            let flipped = !letter.is_favorite;
            tx.execute(
                "UPDATE letters SET is_favorite = ?1, updated_at = ?2 WHERE id = ?3",
                params![flipped, now.to_rfc3339(), letter_id.to_string()],
            )?;

            let letter = query_letter_by_id(&tx, &letter_id.to_string())?
                .context("letter vanished mid-transaction")?
                .into_letter()?;
            tx.commit()?;
            Ok(FavoriteOutcome::Toggled(letter))
        })
    }

    /// Sent letters only, newest first.
    pub fn list_sent_letters(&self, pair_id: Uuid) -> Result<Vec<Letter>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LETTER_COLUMNS} FROM letters
                 WHERE pair_id = ?1 AND is_draft = 0
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([pair_id.to_string()], letter_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(LetterRow::into_letter).collect()
        })
    }

    pub fn count_sent_letters(&self, pair_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM letters WHERE pair_id = ?1 AND is_draft = 0",
                [pair_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

const USER_COLUMNS: &str =
    "id, display_name, username, password, invite_code, paired_with, created_at";
const PAIR_COLUMNS: &str =
    "id, user_a_id, user_b_id, delay_seconds, turn_user_id, last_sent_at, created_at";
const LETTER_COLUMNS: &str =
    "id, pair_id, author_id, body_text, is_favorite, is_draft, sent_at, created_at, updated_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        display_name: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
        invite_code: row.get(4)?,
        paired_with: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn pair_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PairRow> {
    Ok(PairRow {
        id: row.get(0)?,
        user_a_id: row.get(1)?,
        user_b_id: row.get(2)?,
        delay_seconds: row.get(3)?,
        turn_user_id: row.get(4)?,
        last_sent_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn letter_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LetterRow> {
    Ok(LetterRow {
        id: row.get(0)?,
        pair_id: row.get(1)?,
        author_id: row.get(2)?,
        body_text: row.get(3)?,
        is_favorite: row.get(4)?,
        is_draft: row.get(5)?,
        sent_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
    ))?;
    let row = stmt.query_row([username], user_from_row).optional()?;
    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let row = stmt.query_row([id], user_from_row).optional()?;
    Ok(row)
}

fn query_pair_by_id(conn: &Connection, id: &str) -> Result<Option<PairRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {PAIR_COLUMNS} FROM pairs WHERE id = ?1"))?;
    let row = stmt.query_row([id], pair_from_row).optional()?;
    Ok(row)
}

fn query_pair_for_user(conn: &Connection, user_id: &str) -> Result<Option<PairRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAIR_COLUMNS} FROM pairs WHERE user_a_id = ?1 OR user_b_id = ?1"
    ))?;
    let row = stmt.query_row([user_id], pair_from_row).optional()?;
    Ok(row)
}

fn query_letter_by_id(conn: &Connection, id: &str) -> Result<Option<LetterRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LETTER_COLUMNS} FROM letters WHERE id = ?1"
    ))?;
    let row = stmt.query_row([id], letter_from_row).optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
