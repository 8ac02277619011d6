//! Test harness with testcontainers for integration testing.
//!
//! A single Postgres container is shared across all tests: it is started and
//! migrated once on first use, then every test connects with its own pool.
//! Tests stay isolated by using unique usernames rather than by truncating,
//! so they can run in parallel.

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use server_core::server::build_app;

use super::ApiClient;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_JWT_ISSUER: &str = "parc-test";

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

/// Global shared infrastructure - initialized once, reused by all tests.
static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Respect RUST_LOG when digging into a failing test.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        // Run migrations once on the shared database
        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Per-test harness: a pool into the shared database plus a real router.
pub struct TestHarness {
    pub db_pool: PgPool,
    pub app: Router,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect test pool")?;

        let app = build_app(db_pool.clone(), TEST_JWT_SECRET, TEST_JWT_ISSUER);

        Ok(Self { db_pool, app })
    }

    /// HTTP client driving the router in-process.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.app.clone())
    }
}
