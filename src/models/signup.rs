//! Signup model

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::utils::errors::MicNightError;

/// Who is performing: an account holder or a walk-in added by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Performer {
    Registered { user_id: i64 },
    WalkIn { name: String },
}

impl Performer {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Performer::Registered { user_id } => Some(*user_id),
            Performer::WalkIn { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupStatus {
    Confirmed,
    Cancelled,
    Performing,
    Performed,
}

impl SignupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupStatus::Confirmed => "confirmed",
            SignupStatus::Cancelled => "cancelled",
            SignupStatus::Performing => "performing",
            SignupStatus::Performed => "performed",
        }
    }

    /// Everything except cancelled occupies a slot in the event
    pub fn is_active(&self) -> bool {
        !matches!(self, SignupStatus::Cancelled)
    }
}

impl fmt::Display for SignupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignupStatus {
    type Err = MicNightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(SignupStatus::Confirmed),
            "cancelled" => Ok(SignupStatus::Cancelled),
            "performing" => Ok(SignupStatus::Performing),
            "performed" => Ok(SignupStatus::Performed),
            other => Err(MicNightError::CorruptRecord(format!("unknown signup status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signup {
    pub id: i64,
    pub event_id: i64,
    pub performer: Performer,
    pub performance_name: String,
    pub performance_type: Option<String>,
    pub notes: Option<String>,
    pub status: SignupStatus,
    pub performance_order: Option<i32>,
    pub individual_performance_length: Option<i32>,
    pub is_finished: bool,
    pub finished_at: Option<DateTime<Utc>>,
    pub is_current_performer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Signup {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn belongs_to(&self, user_id: i64) -> bool {
        self.performer.user_id() == Some(user_id)
    }
}

/// Details a performer supplies when signing up
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupRequest {
    pub performance_name: String,
    pub performance_type: Option<String>,
    pub notes: Option<String>,
}

/// Details a host supplies for a walk-in performer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPerformerRequest {
    pub name: String,
    pub performance_name: Option<String>,
    pub performance_type: Option<String>,
    pub notes: Option<String>,
}

/// Signup row to be inserted by a store; always starts out confirmed
#[derive(Debug, Clone)]
pub struct NewSignup {
    pub event_id: i64,
    pub performer: Performer,
    pub performance_name: String,
    pub performance_type: Option<String>,
    pub notes: Option<String>,
}
