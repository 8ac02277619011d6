use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::common::{JobId, UserId};
use crate::domains::jobs::machine::{ApprovalStatus, Phase};

/// Job model - SQL persistence layer
///
/// `owner_id` is set at creation and never reassigned. `parameters` and
/// `results` are opaque JSONB documents: the core passes them through to the
/// external executor untouched.
///
/// Every state transition below is a single guarded UPDATE carrying its
/// precondition in the WHERE clause, so two concurrent callers can never both
/// observe the old state and both commit. A `None` return means the guard did
/// not match: the job either vanished or is no longer in the required state.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Job {
    pub job_id: JobId,
    pub owner_id: UserId,
    pub phase: Phase,
    pub approval_status: ApprovalStatus,
    pub parameters: Value,
    pub creation_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub results: Option<Value>,
    pub error_message: Option<String>,
}

impl Job {
    /// Insert a new job for `owner` with phase `pending`, awaiting approval
    pub async fn create(
        owner: UserId,
        parameters: &Value,
        pool: &PgPool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO jobs (owner_id, phase, approval_status, parameters)
             VALUES ($1, 'pending', 'awaiting_approval', $2)
             RETURNING *",
        )
        .bind(owner)
        .bind(parameters)
        .fetch_one(pool)
        .await
    }

    /// Find job by ID
    pub async fn find_by_id(id: JobId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE job_id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find all jobs owned by `owner`, newest first
    pub async fn find_by_owner(owner: UserId, pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM jobs WHERE owner_id = $1 ORDER BY creation_time DESC",
        )
        .bind(owner)
        .fetch_all(pool)
        .await
    }

    /// Find every job system-wide, newest first (admin listing)
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs ORDER BY creation_time DESC")
            .fetch_all(pool)
            .await
    }

    /// Approve a job: awaiting_approval -> approved, phase -> queued.
    ///
    /// Guard: approval_status must still be `awaiting_approval`.
    pub async fn approve(id: JobId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE jobs
             SET approval_status = 'approved', phase = 'queued'
             WHERE job_id = $1 AND approval_status = 'awaiting_approval'
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Reject a job: awaiting_approval -> rejected, phase -> aborted
    /// regardless of the current phase.
    ///
    /// Guard: approval_status must still be `awaiting_approval`.
    pub async fn reject(id: JobId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE jobs
             SET approval_status = 'rejected', phase = 'aborted', end_time = NOW()
             WHERE job_id = $1 AND approval_status = 'awaiting_approval'
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Abort a job: phase -> aborted with end_time stamped.
    ///
    /// Guard: current phase must be pending, queued, or executing.
    pub async fn abort(id: JobId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE jobs
             SET phase = 'aborted', end_time = NOW()
             WHERE job_id = $1 AND phase IN ('pending', 'queued', 'executing')
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
