//! Test fixtures for creating users, tokens, and jobs.
//!
//! Users are registered through the real endpoints so fixtures exercise the
//! same code paths as production clients. State only the external executor
//! would write (executing/completed phases, results) is injected with raw
//! SQL, which is exactly the access the executor is assumed to have.

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use super::ApiClient;

pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// A unique username per test, so parallel tests never collide.
pub fn unique_username(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Register a user through the API and return (user_id, bearer token).
pub async fn register_and_login(client: &ApiClient, username: &str) -> (i64, String) {
    let res = client
        .post_json(
            "/users",
            None,
            &json!({ "username": username, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(res.status, 201, "registration failed: {}", res.body);
    let user_id = res.body["user_id"].as_i64().expect("user_id missing");

    let token = login(client, username).await;
    (user_id, token)
}

/// Obtain a bearer token for an existing user.
pub async fn login(client: &ApiClient, username: &str) -> String {
    let form = format!(
        "username={}&password={}",
        urlencode(username),
        urlencode(TEST_PASSWORD)
    );
    let res = client.post_form("/token", None, &form).await;
    assert_eq!(res.status, 200, "login failed: {}", res.body);
    res.body["access_token"]
        .as_str()
        .expect("access_token missing")
        .to_string()
}

/// Register a user and promote it to admin directly in the store
/// (role promotion is operator tooling, not an API surface).
pub async fn register_admin(client: &ApiClient, pool: &PgPool, username: &str) -> (i64, String) {
    let (user_id, _) = register_and_login(client, username).await;

    sqlx::query("UPDATE users SET role = 'admin' WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("failed to promote user to admin");

    // Re-login so the token's embedded role matches, though authorization
    // reads the role from the store either way.
    let token = login(client, username).await;
    (user_id, token)
}

/// Submit a job through the API, returning its id.
pub async fn create_job(client: &ApiClient, token: &str, parameters: Value) -> i64 {
    let res = client
        .post_json("/jobs", Some(token), &json!({ "parameters": parameters }))
        .await;
    assert_eq!(res.status, 201, "job creation failed: {}", res.body);
    res.body["job_id"].as_i64().expect("job_id missing")
}

/// Simulate the external executor completing a job and writing results.
pub async fn complete_job_externally(pool: &PgPool, job_id: i64, results: &Value) {
    sqlx::query(
        "UPDATE jobs
         SET phase = 'completed', start_time = NOW(), end_time = NOW(), results = $2
         WHERE job_id = $1",
    )
    .bind(job_id)
    .bind(results)
    .execute(pool)
    .await
    .expect("failed to complete job externally");
}

/// Simulate the external executor moving a job to a given phase.
pub async fn set_phase_externally(pool: &PgPool, job_id: i64, phase: &str) {
    sqlx::query("UPDATE jobs SET phase = $2 WHERE job_id = $1")
        .bind(job_id)
        .bind(phase)
        .execute(pool)
        .await
        .expect("failed to set phase externally");
}

/// Minimal percent-encoding for form values used in tests.
fn urlencode(s: &str) -> String {
    s.replace('%', "%25").replace('&', "%26").replace(' ', "+")
}
