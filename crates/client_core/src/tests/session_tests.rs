use std::sync::Arc;

use super::*;
use crate::{
    mock_backend::{MockBackend, RecordedRequest},
    MemoryTokenStore, TokenProvider,
};
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use shared::{domain::UserId, error::ErrorCode};

fn user_json() -> Value {
    json!({
        "id": 42,
        "email": "anna@example.com",
        "first_name": "Anna",
        "last_name": "Petrova",
        "phone": "",
        "is_active": true,
        "created_at": "2024-05-01T10:00:00Z",
        "auth_provider": "email"
    })
}

fn auth_responder(request: &RecordedRequest) -> (StatusCode, Value) {
    let authorized = request.authorization.as_deref() == Some("Bearer token-42");
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/api/auth/login") => {
            let password = request
                .body
                .as_ref()
                .and_then(|b| b.get("password"))
                .and_then(Value::as_str);
            if password == Some("secret1") {
                (StatusCode::OK, json!({ "user": user_json(), "token": "token-42" }))
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    json!({ "error": "invalid credentials" }),
                )
            }
        }
        ("POST", "/api/auth/register") => (
            StatusCode::CREATED,
            json!({ "user": user_json(), "token": "token-42" }),
        ),
        ("POST", "/api/auth/logout") => (
            StatusCode::OK,
            json!({ "message": "Logged out successfully" }),
        ),
        (_, path) if path.starts_with("/api/user/") && !authorized => {
            (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }))
        }
        ("GET", "/api/user/profile") => (StatusCode::OK, user_json()),
        ("PUT", "/api/user/profile") => (
            StatusCode::OK,
            json!({ "message": "Profile updated successfully" }),
        ),
        ("PUT", "/api/user/password") => (
            StatusCode::OK,
            json!({ "message": "Password changed successfully" }),
        ),
        ("DELETE", "/api/user/account") => (
            StatusCode::OK,
            json!({ "message": "Account deleted successfully" }),
        ),
        ("POST", "/api/user/link/github") => (
            StatusCode::OK,
            json!({ "message": "Account linked successfully" }),
        ),
        ("DELETE", "/api/user/unlink/google") => (
            StatusCode::OK,
            json!({ "message": "Account unlinked successfully" }),
        ),
        ("GET", "/api/oauth2/google/auth") => (
            StatusCode::OK,
            json!({ "auth_url": "https://accounts.google.com/o/oauth2/auth?state=xyz", "state": "xyz" }),
        ),
        _ => (StatusCode::NOT_FOUND, json!({ "error": "not found" })),
    }
}

async fn session(backend: &MockBackend) -> (SessionClient, Arc<MemoryTokenStore>) {
    let tokens = Arc::new(MemoryTokenStore::new());
    let api = StorefrontClient::new(&backend.url, tokens.clone()).expect("client");
    (SessionClient::new(api), tokens)
}

#[tokio::test]
async fn login_stores_token_and_user() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, tokens) = session(&backend).await;

    let user = session
        .login("anna@example.com", "secret1")
        .await
        .expect("login");
    assert_eq!(user.id, UserId(42));
    assert_eq!(tokens.current_token().as_deref(), Some("token-42"));
    assert!(session.is_signed_in());
    assert_eq!(session.current_user().map(|u| u.email), Some(user.email));
}

#[tokio::test]
async fn rejected_login_keeps_session_empty() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, tokens) = session(&backend).await;

    let err = session
        .login("anna@example.com", "wrong-password")
        .await
        .expect_err("rejected");
    assert_eq!(err.code(), Some(ErrorCode::Unauthorized));
    assert!(err.to_string().contains("invalid credentials"));
    assert_eq!(tokens.current_token(), None);
}

#[tokio::test]
async fn invalid_form_never_reaches_the_network() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, _) = session(&backend).await;

    let err = session.login("not-an-email", "1").await.expect_err("invalid");
    match err {
        ClientError::Validation(errors) => {
            assert!(errors.get("email").is_some());
            assert!(errors.get("password").is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = session
        .register(&RegisterForm {
            email: "anna@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
            first_name: "Anna".into(),
            last_name: "Petrova".into(),
            phone: String::new(),
        })
        .await
        .expect_err("mismatch");
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn register_posts_form_without_confirmation() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, tokens) = session(&backend).await;

    session
        .register(&RegisterForm {
            email: "anna@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            first_name: "Anna".into(),
            last_name: "Petrova".into(),
            phone: "+79991234567".into(),
        })
        .await
        .expect("register");

    let body = backend.last_request().body.expect("json body");
    assert_eq!(body["email"], "anna@example.com");
    assert_eq!(body["phone"], "+79991234567");
    assert!(body.get("confirm_password").is_none());
    assert_eq!(tokens.current_token().as_deref(), Some("token-42"));
}

#[tokio::test]
async fn authorized_calls_require_a_token() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, _) = session(&backend).await;

    assert!(matches!(
        session.profile().await,
        Err(ClientError::NotAuthenticated)
    ));
    assert!(matches!(
        session.delete_account().await,
        Err(ClientError::NotAuthenticated)
    ));
    assert!(matches!(
        session.oauth_link_redirect(OAuthProvider::Google),
        Err(ClientError::NotAuthenticated)
    ));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn profile_edits_send_bearer_and_update_cached_user() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, _) = session(&backend).await;
    session
        .login("anna@example.com", "secret1")
        .await
        .expect("login");

    let profile = session.profile().await.expect("profile");
    assert_eq!(profile.first_name, "Anna");

    let message = session
        .update_profile(&ProfileForm {
            first_name: " Anya ".into(),
            last_name: "Petrova".into(),
            phone: "89991234567".into(),
        })
        .await
        .expect("update");
    assert_eq!(message, "Profile updated successfully");

    let request = backend.last_request();
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.authorization.as_deref(), Some("Bearer token-42"));
    assert_eq!(request.body.expect("body")["first_name"], "Anya");
    assert_eq!(
        session.current_user().map(|u| u.first_name),
        Some("Anya".to_string())
    );

    session
        .change_password(&PasswordChangeForm {
            current_password: "secret1".into(),
            new_password: "secret2".into(),
            confirm_password: "secret2".into(),
        })
        .await
        .expect("change password");
    let body = backend.last_request().body.expect("body");
    assert_eq!(body["new_password"], "secret2");
    assert!(body.get("confirm_password").is_none());
}

#[tokio::test]
async fn delete_account_ends_session() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, tokens) = session(&backend).await;
    session
        .login("anna@example.com", "secret1")
        .await
        .expect("login");

    session.delete_account().await.expect("delete");
    assert_eq!(backend.last_request().method, Method::DELETE);
    assert_eq!(tokens.current_token(), None);
    assert!(session.current_user().is_none());
}

#[tokio::test]
async fn logout_clears_token_even_when_backend_fails() {
    let backend =
        MockBackend::spawn(|_| (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "down" }))).await;
    let tokens = Arc::new(MemoryTokenStore::with_token("token-42"));
    let session = SessionClient::new(
        StorefrontClient::new(&backend.url, tokens.clone()).expect("client"),
    );

    assert!(session.logout().await.is_err());
    assert_eq!(tokens.current_token(), None);
}

#[tokio::test]
async fn oauth_linking_flow() {
    let backend = MockBackend::spawn(auth_responder).await;
    let (session, _) = session(&backend).await;

    let auth = session
        .oauth_authorize_url(OAuthProvider::Google)
        .await
        .expect("auth url");
    assert_eq!(auth.state, "xyz");

    session
        .login("anna@example.com", "secret1")
        .await
        .expect("login");
    let redirect = session
        .oauth_link_redirect(OAuthProvider::Github)
        .expect("redirect");
    assert_eq!(redirect.path(), "/api/oauth2/github/auth");
    assert_eq!(redirect.query(), Some("state=token-42"));

    let message = session
        .link_account(OAuthProvider::Github, "code-1", "xyz")
        .await
        .expect("link");
    assert_eq!(message, "Account linked successfully");
    let body = backend.last_request().body.expect("body");
    assert_eq!(body["provider"], "github");
    assert_eq!(body["code"], "code-1");

    let message = session
        .unlink_account(OAuthProvider::Google)
        .await
        .expect("unlink");
    assert_eq!(message, "Account unlinked successfully");
}
