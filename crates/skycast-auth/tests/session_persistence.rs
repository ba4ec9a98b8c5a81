//! Sessions survive a restart through file-backed storage.

use std::sync::Arc;
use std::time::Duration;

use skycast_auth::AuthStore;
use skycast_core::{FileStorage, KeyValueStore, SilentNotifier};
use skycast_services::{BackendClient, RegisterCredentials};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth_store(server: &MockServer, dir: &std::path::Path) -> AuthStore {
    let backend =
        BackendClient::new(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStorage::open(dir).unwrap());
    AuthStore::new(backend, storage, Arc::new(SilentNotifier))
}

#[tokio::test]
async fn test_register_then_restart_restores_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/register"))
        .and(body_json(serde_json::json!({
            "username": "grace",
            "email": "grace@example.com",
            "password": "pw"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"id": 5, "username": "grace", "email": "grace@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();

    let first = auth_store(&server, dir.path());
    first
        .register(&RegisterCredentials {
            username: "grace".into(),
            email: "grace@example.com".into(),
            password: "pw".into(),
            confirm_password: "pw".into(),
        })
        .await
        .unwrap();
    drop(first);

    let second = auth_store(&server, dir.path());
    assert!(second.check_auth());
    assert_eq!(second.current_user().unwrap().id, 5);

    second.logout();

    let third = auth_store(&server, dir.path());
    assert!(!third.check_auth());
}
