use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use uuid::Uuid;

use missive_db::Database;
use missive_types::api::{ApiResponse, AuthData, AuthUser, Claims, LoginRequest, SignupRequest};
use missive_types::models::User;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

const INVITE_CODE_LEN: usize = 8;
const INVITE_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INVITE_CODE_ATTEMPTS: usize = 16;

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (display_name, username, password) = match (
        non_empty(req.display_name),
        non_empty(req.username),
        req.password.filter(|p| !p.is_empty()),
    ) {
        (Some(d), Some(u), Some(p)) => (d, u, p),
        _ => {
            return Err(ApiError::Validation(
                "Display name, username, and password are required".into(),
            ));
        }
    };

    // Pre-check for a friendly error; the UNIQUE constraint still backs this
    // up against races.
    if state.db.get_user_by_username(&username)?.is_some() {
        return Err(ApiError::UsernameTaken);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Storage(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();

    let invite_code = generate_invite_code(&state.db)?;
    let user_id = Uuid::new_v4();
    let now = Utc::now();

    state.db.create_user(
        user_id,
        &display_name,
        &username,
        &password_hash,
        &invite_code,
        now,
    )?;

    let user = User {
        id: user_id,
        display_name,
        username,
        invite_code: Some(invite_code),
        paired_with: None,
        created_at: now,
    };
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(ApiResponse::ok_with_message(
        AuthData {
            user: AuthUser::from(&user),
            token,
        },
        "Account created successfully",
    )))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password)) = (
        non_empty(req.username),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    };

    let row = state
        .db
        .get_user_by_username(&username)?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password)
        .map_err(|e| ApiError::Storage(anyhow::anyhow!("stored password hash is corrupt: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user = row.into_user()?;
    let token = create_token(&state.jwt_secret, user.id, &user.username)?;

    Ok(Json(ApiResponse::ok_with_message(
        AuthData {
            user: AuthUser::from(&user),
            token,
        },
        "Login successful",
    )))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn generate_invite_code(db: &Database) -> Result<String, ApiError> {
    for _ in 0..INVITE_CODE_ATTEMPTS {
        let code = random_invite_code();
        if !db.invite_code_taken(&code)? {
            return Ok(code);
        }
    }
    Err(ApiError::Storage(anyhow::anyhow!(
        "no free invite code after {INVITE_CODE_ATTEMPTS} attempts"
    )))
}

fn random_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..INVITE_CODE_CHARSET.len());
            INVITE_CODE_CHARSET[idx] as char
        })
        .collect()
}
