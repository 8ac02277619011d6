pub mod machine;
pub mod models;

pub use machine::{ApprovalStatus, ControlAction, Phase};
pub use models::job::Job;
