// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Account endpoints against a local HTTP backend

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use phonebook_core::{
    AppError, AuthClient, ClientSettings, Id, LoginOutcome, ProfileUpdate, Registration, Session,
    SessionStore,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct AuthBackend {
    hits: AtomicUsize,
    profile_bodies: Mutex<Vec<Value>>,
}

type Shared = Arc<AuthBackend>;

async fn auth_handler(State(backend): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    backend.hits.fetch_add(1, Ordering::SeqCst);

    match body["mobileno"].as_str() {
        Some("9876543210") => Json(json!({
            "valid": true,
            "id": 10046,
            "businessname": "Celfon Traders",
            "person": "Raj",
            "mobileno": "9876543210",
            "city": "Chennai"
        })),
        Some("9000000001") => Json(json!({
            "valid": true,
            "id": "20001",
            "businessname": "",
            "person": "Anu",
            "mobileno": "9000000001"
        })),
        _ => Json(json!({"valid": false})),
    }
}

async fn signup_handler(State(backend): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    backend.hits.fetch_add(1, Ordering::SeqCst);

    match body["mobileno"].as_str() {
        Some("9876543210") => Json(json!({
            "registered": true,
            "businessname": "Celfon Traders",
            "person": "Raj"
        })),
        Some("9000000001") => Json(json!({"registered": 1, "businessname": "", "person": ""})),
        _ => Json(json!({"registered": false})),
    }
}

async fn profile_handler(State(backend): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    backend.profile_bodies.lock().unwrap().push(body.clone());

    if body["pincode"].as_str().is_some_and(|pin| pin.len() != 6) {
        return Json(json!({"success": false, "message": "Invalid pincode"}));
    }
    if body["city"] == "" {
        return Json(json!({"success": false}));
    }
    Json(json!({"success": true}))
}

async fn spawn_auth() -> (ClientSettings, Shared) {
    let backend = Shared::default();
    let app = Router::new()
        .route("/auth.php", post(auth_handler))
        .route("/signup.php", post(signup_handler))
        .route("/profile.php", post(profile_handler))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let settings = ClientSettings {
        auth_url: format!("http://{}/auth.php", addr),
        signup_url: format!("http://{}/signup.php", addr),
        profile_url: format!("http://{}/profile.php", addr),
        ..ClientSettings::default()
    };
    (settings, backend)
}

/// A session store holding the Celfon Traders login
fn signed_in_store(dir: &tempfile::TempDir) -> SessionStore {
    let sessions = SessionStore::with_path(dir.path().join("session.json"));
    let mut session = Session::new(10046, "Celfon Traders", "9876543210");
    session.profile = json!({
        "valid": true,
        "id": 10046,
        "businessname": "Celfon Traders",
        "person": "Raj",
        "mobileno": "9876543210",
        "city": "Chennai"
    });
    sessions.sign_in(session).unwrap();
    sessions
}

fn changes(fields: Value) -> Map<String, Value> {
    match fields {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

#[tokio::test]
async fn test_registered_business_logs_in() {
    let (settings, _) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();

    let outcome = client.login(" 9876543210 ", "signpost").await.unwrap();
    let session = match outcome {
        LoginOutcome::Authenticated(session) => session,
        other => panic!("expected a session, got {:?}", other),
    };
    assert_eq!(session.user_id, Id::Int(10046));
    assert_eq!(session.display_name, "Celfon Traders");
    assert_eq!(session.profile["city"], "Chennai");

    let dir = tempfile::tempdir().unwrap();
    let sessions = SessionStore::with_path(dir.path().join("session.json"));
    sessions.sign_in(session).unwrap();
    assert_eq!(sessions.user_id(), Some(Id::Int(10046)));
}

#[tokio::test]
async fn test_person_listing_uses_person_name() {
    let (settings, _) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();

    match client.login("9000000001", "signpost").await.unwrap() {
        LoginOutcome::Authenticated(session) => {
            assert_eq!(session.display_name, "Anu");
            assert_eq!(session.user_id, Id::from("20001"));
        }
        other => panic!("expected a session, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unregistered_number_needs_signup() {
    let (settings, _) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();

    let outcome = client.login("9111111111", "signpost").await.unwrap();
    assert_eq!(outcome, LoginOutcome::UnknownUser);
}

#[tokio::test]
async fn test_local_checks_happen_before_request() {
    let (settings, backend) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();

    assert!(matches!(
        client.login("   ", "signpost").await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        client.login("9876543210", "wrong").await,
        Err(AppError::InvalidCredentials)
    ));
    assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_registered_number_reports_listing_name() {
    let (settings, _) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();

    assert_eq!(
        client.check_registration("9876543210").await.unwrap(),
        Registration::Registered {
            name: "Celfon Traders".to_string()
        }
    );
    // Registered with neither name filled in
    assert_eq!(
        client.check_registration("9000000001").await.unwrap(),
        Registration::Registered {
            name: "Unknown".to_string()
        }
    );
}

#[tokio::test]
async fn test_new_number_is_available() {
    let (settings, backend) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();

    assert_eq!(
        client.check_registration(" 7000000002 ").await.unwrap(),
        Registration::Available
    );
    assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_number_is_rejected_locally() {
    let (settings, backend) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();

    for mobile in ["5876543210", "98765", "98765432100", "98765x3210", ""] {
        assert!(
            matches!(
                client.check_registration(mobile).await,
                Err(AppError::InvalidInput(_))
            ),
            "{:?} should be rejected",
            mobile
        );
    }
    assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_profile_update_refreshes_stored_session() {
    let (settings, backend) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let sessions = signed_in_store(&dir);
    let mut watcher = sessions.subscribe();

    let outcome = client
        .update_profile(
            &sessions,
            changes(json!({"businessname": "Celfon Mobiles", "city": "Madurai"})),
        )
        .await
        .unwrap();
    let saved = match outcome {
        ProfileUpdate::Saved(session) => session,
        other => panic!("expected the profile to save, got {:?}", other),
    };

    // The full record goes out, with the user's id
    let sent = backend.profile_bodies.lock().unwrap()[0].clone();
    assert_eq!(sent["id"], 10046);
    assert_eq!(sent["person"], "Raj");
    assert_eq!(sent["city"], "Madurai");

    assert_eq!(saved.display_name, "Celfon Mobiles");
    assert_eq!(saved.user_id, Id::Int(10046));
    assert!(watcher.has_changed().unwrap());
    assert_eq!(sessions.current(), Some(saved.clone()));

    // And it survives a restart
    let reopened = SessionStore::with_path(dir.path().join("session.json"));
    let stored = reopened.current().unwrap();
    assert_eq!(stored.display_name, "Celfon Mobiles");
    assert_eq!(stored.profile["city"], "Madurai");
}

#[tokio::test]
async fn test_refused_profile_update_keeps_session() {
    let (settings, _) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let sessions = signed_in_store(&dir);
    let before = sessions.current();

    assert_eq!(
        client
            .update_profile(&sessions, changes(json!({"pincode": "600"})))
            .await
            .unwrap(),
        ProfileUpdate::Refused("Invalid pincode".to_string())
    );
    assert_eq!(
        client
            .update_profile(&sessions, changes(json!({"city": ""})))
            .await
            .unwrap(),
        ProfileUpdate::Refused("Failed to save changes.".to_string())
    );
    assert_eq!(sessions.current(), before);
}

#[tokio::test]
async fn test_profile_update_requires_login() {
    let (settings, backend) = spawn_auth().await;
    let client = AuthClient::new(&settings).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let sessions = SessionStore::with_path(dir.path().join("session.json"));

    assert!(matches!(
        client
            .update_profile(&sessions, changes(json!({"city": "Madurai"})))
            .await,
        Err(AppError::NotLoggedIn)
    ));
    assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
}
