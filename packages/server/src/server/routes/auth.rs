use axum::extract::{Extension, Form, Json};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::common::{ApiError, UserId};
use crate::domains::auth::models::user::Role;
use crate::domains::auth::{password, User};
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub affiliation: Option<String>,
}

/// Public representation of a user (never carries the password hash)
#[derive(Serialize)]
pub struct UserResponse {
    pub user_id: UserId,
    pub username: String,
    pub affiliation: Option<String>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            affiliation: user.affiliation,
            role: user.role,
        }
    }
}

/// Register a new user
///
/// Every registration gets role `user`; promotion to admin happens directly
/// in the store via operator tooling.
pub async fn create_user_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password must not be empty".into(),
        ));
    }

    let hash = password::hash_password(&req.password)?;

    // No pre-check for an existing username; concurrent registrations race to
    // the unique index and the loser gets the violation mapped here.
    let user = User::create(
        &req.username,
        &hash,
        req.affiliation.as_deref(),
        &state.db_pool,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Validation("username already registered".into())
        } else {
            e.into()
        }
    })?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Exchange credentials for a bearer token
///
/// The token is valid for 30 minutes and encodes {sub = username, role}.
pub async fn token_handler(
    Extension(state): Extension<AppState>,
    Form(req): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = authenticate_user(&req.username, &req.password, &state).await?;

    let access_token = state.jwt_service.create_token(&user.username, user.role)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// Verify (username, password) against the stored hash
///
/// Unknown usernames and wrong passwords produce the same error, so the
/// endpoint does not leak which usernames exist.
async fn authenticate_user(
    username: &str,
    plaintext: &str,
    state: &AppState,
) -> Result<User, ApiError> {
    let user = User::find_by_username(username, &state.db_pool)
        .await?
        .ok_or_else(|| ApiError::Authentication("incorrect username or password".into()))?;

    if !password::verify_password(plaintext, &user.password_hash)? {
        return Err(ApiError::Authentication(
            "incorrect username or password".into(),
        ));
    }

    Ok(user)
}
