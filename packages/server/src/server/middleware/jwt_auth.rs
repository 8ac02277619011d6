use axum::{middleware::Next, response::Response};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use crate::common::{ApiError, UserId};
use crate::domains::auth::models::user::Role;
use crate::domains::auth::{JwtService, User};

/// Authenticated caller resolved from a bearer token.
///
/// The role comes from the store at request time, not from the token payload:
/// the token only proves the subject's identity, and a role change after
/// issuance takes effect on the caller's next request.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// JWT authentication middleware
///
/// Extracts the bearer token from the Authorization header, verifies it, and
/// resolves the subject against the user store. On success an `AuthUser` is
/// added to request extensions; otherwise the request continues anonymous and
/// protected handlers reject it.
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    db_pool: PgPool,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    // Token is taken out of the request up front; the store lookup must not
    // hold a borrow of the request body across its await.
    let token = bearer_token(&request);

    let auth_user = match token {
        Some(token) => resolve_auth_user(&token, &jwt_service, &db_pool).await,
        None => None,
    };

    match auth_user {
        Some(user) => {
            debug!("Authenticated user: {} ({})", user.username, user.role);
            request.extensions_mut().insert(user);
        }
        None => debug!("No valid authentication token"),
    }

    next.run(request).await
}

/// Pull the token out of the Authorization header as an owned string
fn bearer_token(request: &axum::http::Request<axum::body::Body>) -> Option<String> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Handle both "Bearer <token>" and raw token
    Some(auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).to_string())
}

/// Verify the token and look the subject up fresh from the store
async fn resolve_auth_user(
    token: &str,
    jwt_service: &JwtService,
    db_pool: &PgPool,
) -> Option<AuthUser> {
    let claims = jwt_service.verify_token(token).ok()?;

    // The subject must still exist; a deleted user's tokens die with it.
    let user = User::find_by_username(&claims.sub, db_pool).await.ok()??;

    Some(AuthUser {
        user_id: user.user_id,
        username: user.username,
        role: user.role,
    })
}

/// Require an authenticated caller
pub fn require_user(auth: Option<AuthUser>) -> Result<AuthUser, ApiError> {
    auth.ok_or_else(|| ApiError::Authentication("valid bearer token required".into()))
}

/// Require an authenticated caller with the admin role
pub fn require_admin(auth: Option<AuthUser>) -> Result<AuthUser, ApiError> {
    let user = require_user(auth)?;
    if !user.role.satisfies(Role::Admin) {
        return Err(ApiError::Authorization("admin access required".into()));
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_auth(value: Option<&str>) -> axum::http::Request<axum::body::Body> {
        let mut builder = axum::http::Request::builder();
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_with_prefix() {
        let request = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_without_prefix() {
        let request = request_with_auth(Some("abc.def.ghi"));
        assert_eq!(bearer_token(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let request = request_with_auth(None);
        assert_eq!(bearer_token(&request), None);
    }

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: UserId::from(1),
            username: "alice".to_string(),
            role,
        }
    }

    #[test]
    fn test_require_user_rejects_anonymous() {
        let err = require_user(None).unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn test_require_user_accepts_any_role() {
        assert!(require_user(Some(caller(Role::User))).is_ok());
        assert!(require_user(Some(caller(Role::Admin))).is_ok());
    }

    #[test]
    fn test_require_admin_rejects_plain_user() {
        let err = require_admin(Some(caller(Role::User))).unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));
    }

    #[test]
    fn test_require_admin_rejects_anonymous_as_unauthenticated() {
        let err = require_admin(None).unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn test_require_admin_accepts_admin() {
        assert!(require_admin(Some(caller(Role::Admin))).is_ok());
    }
}
