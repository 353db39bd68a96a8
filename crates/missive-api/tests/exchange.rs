//! Drafting, sending, turn and timer enforcement, and favorites.

mod common;

use axum::Router;
use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::{bare_request, call, expire_timer, json_request, pair_users, signup, test_app};

async fn send_letter(app: &Router, token: &str, text: &str) -> (StatusCode, Value) {
    call(
        app,
        json_request(
            Method::POST,
            "/letters",
            Some(token),
            &json!({ "bodyText": text }),
        ),
    )
    .await
}

#[tokio::test]
async fn letters_view_before_pairing_is_empty_but_ok() {
    let (app, _state) = test_app();
    let (token, _user) = signup(&app, "Ada", "ada").await;

    let (status, body) = call(&app, bare_request(Method::GET, "/letters", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["pair"].is_null());
    assert!(body["data"]["partner"].is_null());
    assert_eq!(body["data"]["isYourTurn"], json!(false));
    assert_eq!(body["data"]["timer"]["canSend"], json!(false));
}

#[tokio::test]
async fn exchange_routes_require_a_pair() {
    let (app, _state) = test_app();
    let (token, _user) = signup(&app, "Ada", "ada").await;

    let attempts = [
        (Method::GET, "/drafts", None),
        (Method::POST, "/drafts", Some(json!({ "bodyText": "hello" }))),
        (Method::DELETE, "/drafts", None),
        (
            Method::POST,
            "/drafts/send",
            Some(json!({ "draftId": "00000000-0000-0000-0000-000000000000" })),
        ),
        (Method::POST, "/letters", Some(json!({ "bodyText": "hello" }))),
    ];
    for (method, uri, payload) in attempts {
        let request = match &payload {
            Some(body) => json_request(method, uri, Some(&token), body),
            None => bare_request(method, uri, Some(&token)),
        };
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri} without a pair");
        assert_eq!(body["error"], json!("You are not paired with anyone"));
    }
}

#[tokio::test]
async fn draft_save_fetch_replace_and_delete() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    // Nothing saved yet.
    let (status, body) = call(
        &app,
        bare_request(Method::GET, "/drafts", Some(&duo.token_a)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());

    // First save.
    let (status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts",
            Some(&duo.token_a),
            &json!({ "bodyText": "Dear Ben," }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Draft saved successfully"));
    assert_eq!(body["data"]["isDraft"], json!(true));
    assert!(body["data"]["sentAt"].is_null());
    let draft_id = body["data"]["id"].as_str().expect("draft id").to_string();

    // Saving with the id updates in place.
    let (status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts",
            Some(&duo.token_a),
            &json!({ "bodyText": "Dear Ben, again", "draftId": draft_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(draft_id));
    assert_eq!(body["data"]["bodyText"], json!("Dear Ben, again"));

    // Saving without an id replaces the working draft.
    let (status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts",
            Some(&duo.token_a),
            &json!({ "bodyText": "Started over" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["id"], json!(draft_id));

    let (_status, body) = call(
        &app,
        bare_request(Method::GET, "/drafts", Some(&duo.token_a)),
    )
    .await;
    assert_eq!(body["data"]["bodyText"], json!("Started over"));

    // Each author has their own slot.
    let (_status, body) = call(
        &app,
        bare_request(Method::GET, "/drafts", Some(&duo.token_b)),
    )
    .await;
    assert!(body["data"].is_null());

    // Delete is idempotent.
    for _ in 0..2 {
        let (status, body) = call(
            &app,
            bare_request(Method::DELETE, "/drafts", Some(&duo.token_a)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Draft deleted successfully"));
    }
    let (_status, body) = call(
        &app,
        bare_request(Method::GET, "/drafts", Some(&duo.token_a)),
    )
    .await;
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn draft_requires_content() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    let (status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts",
            Some(&duo.token_a),
            &json!({ "bodyText": "   " }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Letter content is required"));
}

#[tokio::test]
async fn sending_a_draft_promotes_it_to_a_letter() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    let (_status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts",
            Some(&duo.token_a),
            &json!({ "bodyText": "Dear Ben, the garden survived the frost." }),
        ),
    )
    .await;
    let draft_id = body["data"]["id"].as_str().expect("draft id").to_string();

    let (status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts/send",
            Some(&duo.token_a),
            &json!({ "draftId": draft_id }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Letter sent successfully!"));
    assert_eq!(body["data"]["id"], json!(draft_id));
    assert_eq!(body["data"]["isDraft"], json!(false));
    assert!(body["data"]["sentAt"].is_string());

    // The slot is free again and the letter shows up in the exchange.
    let (_status, body) = call(
        &app,
        bare_request(Method::GET, "/drafts", Some(&duo.token_a)),
    )
    .await;
    assert!(body["data"].is_null());

    let (_status, body) = call(
        &app,
        bare_request(Method::GET, "/letters", Some(&duo.token_a)),
    )
    .await;
    let letters = body["data"]["pair"]["letters"].as_array().expect("letters");
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0]["id"], json!(draft_id));
    assert_eq!(letters[0]["author"]["username"], json!("ada"));
    assert_eq!(body["data"]["isYourTurn"], json!(false));
}

#[tokio::test]
async fn sending_needs_your_own_live_draft() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    let (status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts/send",
            Some(&duo.token_a),
            &json!({ "draftId": "00000000-0000-0000-0000-000000000000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Draft not found"));

    let (status, body) = call(
        &app,
        json_request(Method::POST, "/drafts/send", Some(&duo.token_a), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Draft ID is required"));

    // A partner's draft id is no better than a bogus one.
    let (_status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts",
            Some(&duo.token_b),
            &json!({ "bodyText": "Ben's half-written reply" }),
        ),
    )
    .await;
    let bens_draft = body["data"]["id"].as_str().expect("draft id").to_string();

    let (status, body) = call(
        &app,
        json_request(
            Method::POST,
            "/drafts/send",
            Some(&duo.token_a),
            &json!({ "draftId": bens_draft }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Draft not found"));

    // Nothing was sent, so the turn still belongs to the first writer.
    let (_status, body) = call(&app, bare_request(Method::GET, "/pair", Some(&duo.token_a))).await;
    assert_eq!(body["data"]["isYourTurn"], json!(true));
}

#[tokio::test]
async fn direct_send_flips_the_turn() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    let (status, body) = send_letter(&app, &duo.token_a, "Dear Ben, it rained all week.").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        json!("Letter sent successfully! Now wait for your partner to reply.")
    );
    assert_eq!(body["data"]["letter"]["isDraft"], json!(false));
    assert_eq!(body["data"]["letter"]["author"]["id"], duo.user_a["id"]);
    assert!(body["data"]["letter"]["sentAt"].is_string());

    // The turn and the timer both moved.
    let (_status, body) = call(
        &app,
        bare_request(Method::GET, "/letters", Some(&duo.token_a)),
    )
    .await;
    assert_eq!(body["data"]["isYourTurn"], json!(false));

    let (_status, body) = call(&app, bare_request(Method::GET, "/pair", Some(&duo.token_b))).await;
    assert_eq!(body["data"]["isYourTurn"], json!(true));
    assert_eq!(body["data"]["timer"]["canSend"], json!(false));
    assert!(body["data"]["timer"]["timeRemaining"].as_i64().expect("seconds") > 0);
    assert!(body["data"]["timer"]["nextAvailableAt"].is_string());
    assert_eq!(body["data"]["lettersSent"], json!(1));
}

#[tokio::test]
async fn sender_cannot_send_twice_in_a_row() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    let (status, _body) = send_letter(&app, &duo.token_a, "First.").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_letter(&app, &duo.token_a, "Second, too soon.").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("It is not your turn to send a letter"));
}

#[tokio::test]
async fn reply_waits_out_the_delay() {
    let (app, state) = test_app();
    let duo = pair_users(&app).await;

    let (status, _body) = send_letter(&app, &duo.token_a, "Opening letter.").await;
    assert_eq!(status, StatusCode::OK);

    // It is Ben's turn, but the full day has not passed.
    let (status, body) = send_letter(&app, &duo.token_b, "An eager reply.").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        json!("You must wait 24 more hours before sending another letter")
    );

    expire_timer(&state, &duo.pair_id);

    let (status, _body) = send_letter(&app, &duo.token_b, "A patient reply.").await;
    assert_eq!(status, StatusCode::OK);

    // The turn came back and the clock restarted.
    let (_status, body) = call(&app, bare_request(Method::GET, "/pair", Some(&duo.token_a))).await;
    assert_eq!(body["data"]["isYourTurn"], json!(true));
    assert_eq!(body["data"]["timer"]["canSend"], json!(false));
    assert_eq!(body["data"]["lettersSent"], json!(2));

    // Letters come back newest first.
    let (_status, body) = call(
        &app,
        bare_request(Method::GET, "/letters", Some(&duo.token_a)),
    )
    .await;
    let letters = body["data"]["pair"]["letters"].as_array().expect("letters");
    assert_eq!(letters.len(), 2);
    assert_eq!(letters[0]["bodyText"], json!("A patient reply."));
    assert_eq!(letters[1]["bodyText"], json!("Opening letter."));
}

#[tokio::test]
async fn a_letter_needs_content() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    for payload in [json!({}), json!({ "bodyText": "  " })] {
        let (status, body) = call(
            &app,
            json_request(Method::POST, "/letters", Some(&duo.token_a), &payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Letter content is required"));
    }
}

#[tokio::test]
async fn favorites_toggle_and_are_scoped_to_the_pair() {
    let (app, _state) = test_app();
    let duo = pair_users(&app).await;

    let (_status, body) = send_letter(&app, &duo.token_a, "Keep this one.").await;
    let letter_id = body["data"]["letter"]["id"]
        .as_str()
        .expect("letter id")
        .to_string();
    let uri = format!("/letters/{letter_id}/favorite");

    // The recipient marks it.
    let (status, body) = call(&app, bare_request(Method::PATCH, &uri, Some(&duo.token_b))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Letter added to favorites"));
    assert_eq!(body["data"]["letter"]["isFavorite"], json!(true));
    assert_eq!(body["data"]["letter"]["author"]["id"], duo.user_a["id"]);

    // Either member can toggle it back.
    let (status, body) = call(&app, bare_request(Method::PATCH, &uri, Some(&duo.token_a))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Letter removed from favorites"));
    assert_eq!(body["data"]["letter"]["isFavorite"], json!(false));

    // An outsider cannot touch it.
    let (token_c, _user_c) = signup(&app, "Cleo", "cleo").await;
    let (status, body) = call(&app, bare_request(Method::PATCH, &uri, Some(&token_c))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("You do not have access to this letter"));

    let (status, body) = call(
        &app,
        bare_request(
            Method::PATCH,
            "/letters/00000000-0000-0000-0000-000000000000/favorite",
            Some(&duo.token_a),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Letter not found"));
}
