//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::auth::JwtService;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    change_phase_handler, control_job_handler, create_job_handler, create_user_handler,
    get_job_handler, get_results_handler, health_handler, list_jobs_handler, token_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: Arc<JwtService>,
}

/// Build the Axum application router
///
/// Every request passes through the JWT middleware, which resolves a bearer
/// token to an `AuthUser` in request extensions; handlers enforce their own
/// authentication and role requirements on top of that.
pub fn build_app(pool: PgPool, jwt_secret: &str, jwt_issuer: &str) -> Router {
    let jwt_service = Arc::new(JwtService::new(jwt_secret, jwt_issuer.to_string()));

    let state = AppState {
        db_pool: pool.clone(),
        jwt_service: jwt_service.clone(),
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/users", post(create_user_handler))
        .route("/token", post(token_handler))
        .route("/jobs", post(create_job_handler).get(list_jobs_handler))
        .route("/jobs/:job_id", get(get_job_handler))
        .route("/jobs/:job_id/control", post(control_job_handler))
        .route("/jobs/:job_id/phase", post(change_phase_handler))
        .route("/jobs/:job_id/results", get(get_results_handler))
        .layer(middleware::from_fn(move |request, next| {
            jwt_auth_middleware(jwt_service.clone(), pool.clone(), request, next)
        }))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
