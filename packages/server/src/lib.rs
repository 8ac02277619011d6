// Parc - Job Submission & Lifecycle API
//
// This crate provides the backend API for submitting parameterized jobs,
// gating them behind admin approval, and tracking their lifecycle phases.
// Job execution itself happens out-of-process: an external executor with
// store access advances approved jobs and writes results.

pub mod common;
pub mod config;
pub mod domains;
pub mod server;

pub use config::*;
