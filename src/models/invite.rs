//! Invite model (booked mic events)

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::utils::errors::MicNightError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InviteStatus {
    type Err = MicNightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InviteStatus::Pending),
            "accepted" => Ok(InviteStatus::Accepted),
            "declined" => Ok(InviteStatus::Declined),
            other => Err(MicNightError::CorruptRecord(format!("unknown invite status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteDecision {
    Accept,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub status: InviteStatus,
    pub invited_by: i64,
    pub invited_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invite {
    /// Pending and accepted invites both block a second invite for the same user
    pub fn is_open_or_accepted(&self) -> bool {
        matches!(self.status, InviteStatus::Pending | InviteStatus::Accepted)
    }
}

/// Optional performance details given when accepting an invite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InviteResponseDetails {
    pub performance_name: Option<String>,
    pub performance_type: Option<String>,
    pub notes: Option<String>,
}

/// Invite row to be inserted by a store; always starts out pending
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub event_id: i64,
    pub user_id: i64,
    pub invited_by: i64,
}
