use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use contact_book::{config::Config, create_app, AppState};

fn test_server() -> TestServer {
    server_with(&[])
}

fn server_with(overrides: &[(&str, &str)]) -> TestServer {
    let config = Config::from_lookup(|key| {
        if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
            return Some(value.to_string());
        }
        match key {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            "AUTH_BCRYPT_COST" => Some("4".to_string()),
            _ => None,
        }
    });
    TestServer::new(create_app(AppState::in_memory(config))).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

async fn sign_up(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/v1/auth/signup")
        .json(&json!({ "email": email, "password": "correct-horse" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    body["tokens"]["access_token"].as_str().unwrap().to_string()
}

async fn create(server: &TestServer, token: &str, body: Value) -> TestResponse {
    server
        .post("/api/v1/contacts")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&body)
        .await
}

async fn get_json(server: &TestServer, token: &str, path: &str) -> Value {
    let response = server.get(path).add_header(AUTHORIZATION, bearer(token)).await;
    response.assert_status_ok();
    response.json()
}

fn tags_of(contact: &Value) -> Vec<String> {
    let mut tags: Vec<String> = contact["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap().to_string())
        .collect();
    tags.sort();
    tags
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = test_server();
    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_contacts_require_authentication() {
    let server = test_server();

    server.get("/api/v1/contacts").await.assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/v1/contacts")
        .add_header(AUTHORIZATION, bearer("not-a-token"))
        .json(&json!({ "name": "Alex", "email": "alex@example.com" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_contact_lifecycle() {
    let server = test_server();
    let token = sign_up(&server, "owner@example.com").await;

    let response = create(
        &server,
        &token,
        json!({
            "name": "Jordan Rivera",
            "email": "jordan@example.com",
            "company": "Startup Ventures",
            "position": "CEO",
            "notes": "Potential investor. Schedule follow-up next quarter.",
            "tags": ["Investor", "investor", "Important"]
        }),
    )
    .await;
    response.assert_status(StatusCode::CREATED);
    let jordan: Value = response.json();
    let id = jordan["id"].as_str().unwrap().to_string();
    assert_eq!(jordan["name"], "Jordan Rivera");
    assert_eq!(jordan["favorite"], false);
    assert_eq!(tags_of(&jordan), vec!["important", "investor"]);

    create(&server, &token, json!({ "name": "Taylor Chen", "email": "taylor@example.com" }))
        .await
        .assert_status(StatusCode::CREATED);

    // Tag-only match still carries every tag.
    let found = get_json(&server, &token, "/api/v1/contacts/search?q=invest").await;
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], id.as_str());
    assert_eq!(tags_of(&found[0]), vec!["important", "investor"]);

    // Favorite toggles round-trip.
    let path = format!("/api/v1/contacts/{}/favorite", id);
    let once: Value = server.post(&path).add_header(AUTHORIZATION, bearer(&token)).await.json();
    assert_eq!(once["favorite"], true);
    let favorites = get_json(&server, &token, "/api/v1/contacts?favorite=true").await;
    assert_eq!(favorites.as_array().unwrap().len(), 1);
    let twice: Value = server.post(&path).add_header(AUTHORIZATION, bearer(&token)).await.json();
    assert_eq!(twice["favorite"], false);

    // Full tag replacement on update.
    let response = server
        .put(&format!("/api/v1/contacts/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "name": "Jordan Rivera",
            "email": "jordan@example.com",
            "tags": ["important", "board"]
        }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(tags_of(&updated), vec!["board", "important"]);

    let fetched = get_json(&server, &token, &format!("/api/v1/contacts/{}", id)).await;
    assert_eq!(tags_of(&fetched), vec!["board", "important"]);

    let tags = get_json(&server, &token, "/api/v1/tags").await;
    let investor = tags
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "investor")
        .expect("orphaned tag is kept");
    assert_eq!(investor["contact_count"], 0);

    // Delete and confirm it is gone everywhere.
    server
        .delete(&format!("/api/v1/contacts/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    let remaining = get_json(&server, &token, "/api/v1/contacts").await;
    let remaining = remaining.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["name"], "Taylor Chen");

    server
        .get(&format!("/api/v1/contacts/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let pruned: Value = server
        .delete("/api/v1/tags/unused")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(pruned["removed"], 3);
}

#[tokio::test]
async fn test_validation_errors_block_creation() {
    let server = test_server();
    let token = sign_up(&server, "owner@example.com").await;

    let response = create(&server, &token, json!({ "name": " ", "email": "nope" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["fields"]["name"], "Name is required");
    assert_eq!(body["fields"]["email"], "Please enter a valid email");

    let contacts = get_json(&server, &token, "/api/v1/contacts").await;
    assert!(contacts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_name_is_a_field_error() {
    let server = test_server();
    let token = sign_up(&server, "owner@example.com").await;

    let response = create(&server, &token, json!({ "email": "alex@example.com" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["fields"]["name"], "Name is required");
    assert!(body["fields"].get("email").is_none());

    let response = create(&server, &token, json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["fields"]["email"], "Email is required");
}

#[tokio::test]
async fn test_oversized_bodies_are_rejected() {
    let server = server_with(&[("MAX_BODY_BYTES", "512")]);
    let token = sign_up(&server, "owner@example.com").await;

    let response = create(
        &server,
        &token,
        json!({ "name": "Verbose", "email": "verbose@example.com", "notes": "x".repeat(2048) }),
    )
    .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    create(&server, &token, json!({ "name": "Brief", "email": "brief@example.com" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_contacts_are_private_to_their_owner() {
    let server = test_server();
    let alice = sign_up(&server, "alice@example.com").await;
    let bob = sign_up(&server, "bob@example.com").await;

    let created: Value = create(&server, &alice, json!({ "name": "Sam", "email": "sam@example.com" }))
        .await
        .json();
    let path = format!("/api/v1/contacts/{}", created["id"].as_str().unwrap());

    server
        .get(&path)
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let bobs = get_json(&server, &bob, "/api/v1/contacts").await;
    assert!(bobs.as_array().unwrap().is_empty());

    get_json(&server, &alice, &path).await;
}

#[tokio::test]
async fn test_sign_out_revokes_token() {
    let server = test_server();
    let token = sign_up(&server, "owner@example.com").await;

    let me = get_json(&server, &token, "/api/v1/auth/me").await;
    assert_eq!(me["email"], "owner@example.com");
    assert!(me.get("password_hash").is_none());

    server
        .post("/api/v1/auth/signout")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    server
        .get("/api/v1/contacts")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/v1/auth/signin")
        .json(&json!({ "email": "owner@example.com", "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
