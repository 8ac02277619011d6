//! Job lifecycle state machine.
//!
//! A job carries two independent axes of state:
//!
//! - `phase` tracks execution progress along a DAG:
//!   pending -> queued -> executing -> completed, with
//!   pending|queued|executing -> aborted. `completed` and `aborted` are
//!   terminal; no transition moves a job backward.
//! - `approval_status` is the administrative gate:
//!   awaiting_approval -> approved | rejected, both terminal. Rejection
//!   forces `phase = aborted`.
//!
//! Approval moves a job to `queued`; everything past that is driven by the
//! external executor writing to the store. The only caller-initiated phase
//! transition is the owner's abort.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution-progress state of a job. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Phase {
    Pending,
    Queued,
    Executing,
    Completed,
    Aborted,
}

impl Phase {
    /// Phases from which an abort (owner-initiated or via rejection) is legal.
    pub fn can_abort(self) -> bool {
        matches!(self, Phase::Pending | Phase::Queued | Phase::Executing)
    }

    /// Terminal phases admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Pending => "pending",
            Phase::Queued => "queued",
            Phase::Executing => "executing",
            Phase::Completed => "completed",
            Phase::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Phase::Pending),
            "queued" => Ok(Phase::Queued),
            "executing" => Ok(Phase::Executing),
            "completed" => Ok(Phase::Completed),
            "aborted" => Ok(Phase::Aborted),
            _ => Err(()),
        }
    }
}

/// Administrative gate, independent of phase. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ApprovalStatus {
    AwaitingApproval,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// A job's approval status leaves `awaiting_approval` exactly once.
    pub fn is_decided(self) -> bool {
        !matches!(self, ApprovalStatus::AwaitingApproval)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::AwaitingApproval => "awaiting_approval",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// Admin decision on a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Approve,
    Reject,
}

impl FromStr for ControlAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ControlAction::Approve),
            "reject" => Ok(ControlAction::Reject),
            _ => Err(()),
        }
    }
}
