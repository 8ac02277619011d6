pub mod auth;
pub mod health;
pub mod jobs;

pub use auth::{create_user_handler, token_handler};
pub use health::health_handler;
pub use jobs::{
    change_phase_handler, control_job_handler, create_job_handler, get_job_handler,
    get_results_handler, list_jobs_handler,
};
