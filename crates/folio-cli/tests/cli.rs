//! CLI integration tests against a mock project.

mod common;

use std::path::Path;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{run_cli_with_env, run_cli_with_env_success, session_file, stored_session};

fn project_url(server: &MockServer) -> String {
    format!("http://127.0.0.1:{}", server.address().port())
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh,
        "user": {"id": "8d0f2c1e-user", "email": "ada@example.com"}
    })
}

async fn mount_password_grant(server: &MockServer, access: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access, "refresh-1")))
        .mount(server)
        .await;
}

fn login(home: &Path, url: &str) {
    run_cli_with_env_success(
        &["login", "--email", "ada@example.com", "--password", "hunter2"],
        home,
        url,
    );
}

fn stored_access_token(home: &Path) -> Option<String> {
    stored_session(home)?["session"]["access_token"]
        .as_str()
        .map(str::to_string)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_and_whoami() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-1").await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();

    let output = run_cli_with_env(
        &["login", "--email", "ada@example.com", "--password", "hunter2"],
        home.path(),
        &url,
    );
    assert!(
        output.status.success(),
        "Login failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Logged in successfully"));

    assert!(session_file(home.path()).exists());
    assert_eq!(stored_access_token(home.path()).as_deref(), Some("access-1"));

    let stdout = run_cli_with_env_success(&["whoami"], home.path(), &url);
    assert!(stdout.contains("8d0f2c1e-user"));
    assert!(stdout.contains("ada@example.com"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_with_wrong_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    let output = run_cli_with_env(
        &["login", "--email", "ada@example.com", "--password", "wrong"],
        home.path(),
        &project_url(&server),
    );

    assert!(!output.status.success());
    assert!(!session_file(home.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_without_session() {
    let home = TempDir::new().unwrap();

    let output = run_cli_with_env(&["whoami"], home.path(), "http://127.0.0.1:1");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("folio login"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invoke_attaches_session() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-1").await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/render-pdf"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("x-request-id", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pages": 2})))
        .expect(1)
        .mount(&server)
        .await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();
    login(home.path(), &url);

    let body = home.path().join("body.json");
    std::fs::write(&body, r#"{"template": "modern"}"#).unwrap();

    let stdout = run_cli_with_env_success(
        &[
            "invoke",
            "render-pdf",
            "--json",
            body.to_str().unwrap(),
            "--header",
            "x-request-id=42",
            "--compact",
        ],
        home.path(),
        &url,
    );

    assert_eq!(stdout.trim(), r#"{"pages":2}"#);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invoke_refreshes_revoked_token_and_saves_it() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-revoked").await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/render-pdf"))
        .and(header("authorization", "Bearer access-revoked"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Invalid JWT"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-new", "refresh-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/render-pdf"))
        .and(header("authorization", "Bearer access-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();
    login(home.path(), &url);

    let stdout = run_cli_with_env_success(&["invoke", "render-pdf", "--compact"], home.path(), &url);

    assert_eq!(stdout.trim(), r#"{"ok":true}"#);
    assert_eq!(stored_access_token(home.path()).as_deref(), Some("access-new"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invoke_no_retry_reports_failure() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-revoked").await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/render-pdf"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Invalid JWT"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-new", "refresh-2")))
        .expect(0)
        .mount(&server)
        .await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();
    login(home.path(), &url);

    let output = run_cli_with_env(&["invoke", "render-pdf", "--no-retry"], home.path(), &url);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("401"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invoke_without_session_is_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/public-stats"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(400))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/public-stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"visits": 3})))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();

    let stdout = run_cli_with_env_success(
        &["invoke", "public-stats", "--compact"],
        home.path(),
        &project_url(&server),
    );

    assert_eq!(stdout.trim(), r#"{"visits":3}"#);
    assert!(!session_file(home.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_token_command() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-1").await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", "refresh-2")))
        .mount(&server)
        .await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();
    login(home.path(), &url);

    let output = run_cli_with_env(&["refresh-token"], home.path(), &url);

    assert!(
        output.status.success(),
        "Refresh failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stored_access_token(home.path()).as_deref(), Some("access-2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_refresh_forgets_session() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-1").await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })))
        .mount(&server)
        .await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();
    login(home.path(), &url);

    let output = run_cli_with_env(&["refresh-token"], home.path(), &url);

    assert!(!output.status.success());
    assert!(!session_file(home.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logout_clears_session() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-1").await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();
    login(home.path(), &url);

    run_cli_with_env_success(&["logout"], home.path(), &url);

    assert!(!session_file(home.path()).exists());
    let output = run_cli_with_env(&["whoami"], home.path(), &url);
    assert!(!output.status.success());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logout_failure_keeps_session_unless_forced() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "access-1").await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let url = project_url(&server);
    let home = TempDir::new().unwrap();
    login(home.path(), &url);

    let output = run_cli_with_env(&["logout"], home.path(), &url);
    assert!(!output.status.success());
    assert!(session_file(home.path()).exists());

    run_cli_with_env_success(&["logout", "--force"], home.path(), &url);
    assert!(!session_file(home.path()).exists());
}
