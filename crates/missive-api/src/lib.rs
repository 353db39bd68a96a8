pub mod auth;
pub mod drafts;
pub mod error;
pub mod letters;
pub mod middleware;
pub mod pairing;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Assemble the REST router: auth routes public, everything else behind the
/// JWT middleware.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/drafts", get(drafts::get_draft))
        .route("/drafts", post(drafts::save_draft))
        .route("/drafts", delete(drafts::delete_draft))
        .route("/drafts/send", post(drafts::send_draft))
        .route("/letters", get(letters::get_letters))
        .route("/letters", post(letters::send_letter))
        .route("/letters/{id}/favorite", patch(letters::toggle_favorite))
        .route("/pair", get(pairing::pair_status))
        .route("/pair/join", post(pairing::join))
        .route("/pair/confirm", post(pairing::confirm))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
