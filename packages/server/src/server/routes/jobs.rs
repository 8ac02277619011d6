use axum::extract::{Extension, Form, Json, Path};
use axum::http::{header, StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ApiError, JobId, UserId};
use crate::domains::jobs::machine::{ControlAction, Phase};
use crate::domains::jobs::{ApprovalStatus, Job};
use crate::server::app::AppState;
use crate::server::middleware::{require_admin, require_user, AuthUser};

/// Public representation of a job.
///
/// `results` is only exposed once the job has completed; until then the field
/// is absent even if the executor has started writing partial output.
#[derive(Serialize)]
pub struct JobResponse {
    pub job_id: JobId,
    pub owner_id: UserId,
    pub phase: Phase,
    pub approval_status: ApprovalStatus,
    pub parameters: Value,
    pub creation_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        let results = match job.phase {
            Phase::Completed => job.results,
            _ => None,
        };
        Self {
            job_id: job.job_id,
            owner_id: job.owner_id,
            phase: job.phase,
            approval_status: job.approval_status,
            parameters: job.parameters,
            creation_time: job.creation_time,
            start_time: job.start_time,
            end_time: job.end_time,
            results,
            error_message: job.error_message,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub parameters: Value,
}

#[derive(Serialize)]
pub struct CreateJobResponse {
    pub job_id: JobId,
}

/// Submit a new job
///
/// Any authenticated user may create jobs for themselves. The job starts in
/// phase `pending`, awaiting admin approval.
pub async fn create_job_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<CreateJobResponse>), ApiError> {
    let caller = require_user(auth.map(|Extension(u)| u))?;

    let job = Job::create(caller.user_id, &req.parameters, &state.db_pool).await?;

    tracing::info!(job_id = %job.job_id, owner = %caller.username, "Job created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/jobs/{}", job.job_id))],
        Json(CreateJobResponse { job_id: job.job_id }),
    ))
}

/// Read a single job (owner or admin)
pub async fn get_job_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(job_id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let caller = require_user(auth.map(|Extension(u)| u))?;

    let job = Job::find_by_id(JobId::from(job_id), &state.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Job"))?;

    if job.owner_id != caller.user_id && !caller.is_admin() {
        return Err(ApiError::Authorization(
            "only the owner or an admin may read this job".into(),
        ));
    }

    Ok(Json(job.into()))
}

/// List jobs: callers see their own, admins see every job system-wide
pub async fn list_jobs_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let caller = require_user(auth.map(|Extension(u)| u))?;

    let jobs = if caller.is_admin() {
        Job::find_all(&state.db_pool).await?
    } else {
        Job::find_by_owner(caller.user_id, &state.db_pool).await?
    };

    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
pub struct ControlRequest {
    pub action: String,
}

/// Approve or reject a submitted job (admin only)
///
/// Either decision is allowed exactly once per job: a job whose approval
/// status has already left `awaiting_approval` cannot be decided again.
pub async fn control_job_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(job_id): Path<i64>,
    Form(req): Form<ControlRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    let caller = require_admin(auth.map(|Extension(u)| u))?;
    let job_id = JobId::from(job_id);

    let job = Job::find_by_id(job_id, &state.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Job"))?;

    let action: ControlAction = req
        .action
        .parse()
        .map_err(|_| ApiError::Validation(format!("invalid action '{}'", req.action)))?;

    let updated = match action {
        ControlAction::Approve => Job::approve(job_id, &state.db_pool).await?,
        ControlAction::Reject => Job::reject(job_id, &state.db_pool).await?,
    };

    // The guarded update matched no row: the approval was already decided,
    // possibly by a concurrent control call.
    let updated = updated.ok_or_else(|| {
        ApiError::InvalidTransition(format!(
            "job {} has already been decided (approval status: {})",
            job_id, job.approval_status
        ))
    })?;

    tracing::info!(
        job_id = %job_id,
        action = %req.action,
        admin = %caller.username,
        "Job control applied"
    );

    Ok(Json(updated.into()))
}

#[derive(Deserialize)]
pub struct ChangePhaseRequest {
    pub phase: String,
}

/// Owner-initiated phase change
///
/// The only transition a caller may request is an abort, and only the owner
/// may request it; admins go through rejection instead. Aborting is legal
/// while the job is pending, queued, or executing.
pub async fn change_phase_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(job_id): Path<i64>,
    Form(req): Form<ChangePhaseRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    let caller = require_user(auth.map(|Extension(u)| u))?;
    let job_id = JobId::from(job_id);

    let job = Job::find_by_id(job_id, &state.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Job"))?;

    if job.owner_id != caller.user_id {
        return Err(ApiError::Authorization(
            "only the owner may change a job's phase".into(),
        ));
    }

    let target: Phase = req
        .phase
        .parse()
        .map_err(|_| ApiError::Validation(format!("invalid phase '{}'", req.phase)))?;

    if target != Phase::Aborted {
        return Err(ApiError::InvalidTransition(format!(
            "callers may only request an abort, not '{target}'"
        )));
    }

    let updated = Job::abort(job_id, &state.db_pool)
        .await?
        .ok_or_else(|| {
            ApiError::InvalidTransition(format!(
                "job {} cannot be aborted from phase '{}'",
                job_id, job.phase
            ))
        })?;

    tracing::info!(job_id = %job_id, owner = %caller.username, "Job aborted");

    Ok(Json(updated.into()))
}

#[derive(Serialize)]
pub struct ResultsResponse {
    pub results: Value,
}

/// Retrieve the results of a completed job (owner only, no admin override)
pub async fn get_results_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(job_id): Path<i64>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let caller = require_user(auth.map(|Extension(u)| u))?;

    let job = Job::find_by_id(JobId::from(job_id), &state.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Job"))?;

    if job.owner_id != caller.user_id {
        return Err(ApiError::Authorization(
            "only the owner may read job results".into(),
        ));
    }

    if job.phase != Phase::Completed {
        return Err(ApiError::Precondition("job not completed".into()));
    }

    // A completed job without results would mean the executor broke its
    // contract; surface it as an internal error rather than a success.
    let results = job
        .results
        .ok_or_else(|| anyhow::anyhow!("completed job {} has no results document", job.job_id))?;

    Ok(Json(ResultsResponse { results }))
}
