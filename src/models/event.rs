//! Event model

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::utils::errors::MicNightError;

/// Lifecycle of an event. Only ever moves forward one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Live,
    Finished,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Live => "live",
            EventStatus::Finished => "finished",
        }
    }

    /// The single status this one may advance to
    pub fn next(&self) -> Option<EventStatus> {
        match self {
            EventStatus::Scheduled => Some(EventStatus::Live),
            EventStatus::Live => Some(EventStatus::Finished),
            EventStatus::Finished => None,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = MicNightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EventStatus::Scheduled),
            "live" => Ok(EventStatus::Live),
            "finished" => Ok(EventStatus::Finished),
            other => Err(MicNightError::CorruptRecord(format!("unknown event status: {}", other))),
        }
    }
}

/// Queue discipline selected for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupListMode {
    SignupOrder,
    RandomOrder,
    Bucket,
    BookedMic,
}

impl SignupListMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupListMode::SignupOrder => "signup_order",
            SignupListMode::RandomOrder => "random_order",
            SignupListMode::Bucket => "bucket",
            SignupListMode::BookedMic => "booked_mic",
        }
    }
}

impl fmt::Display for SignupListMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignupListMode {
    type Err = MicNightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup_order" => Ok(SignupListMode::SignupOrder),
            "random_order" => Ok(SignupListMode::RandomOrder),
            "bucket" => Ok(SignupListMode::Bucket),
            "booked_mic" => Ok(SignupListMode::BookedMic),
            other => Err(MicNightError::CorruptRecord(format!("unknown signup list mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub host_id: i64,
    pub title: String,
    pub status: EventStatus,
    pub signup_list_mode: SignupListMode,
    pub max_performers: i32,
    /// Default slot length in minutes
    pub performance_length: i32,
    /// Bucket mode only
    pub current_performer_id: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub signup_opens: Option<DateTime<Utc>>,
    pub signup_deadline: Option<DateTime<Utc>>,
    /// Bumped by every committed mutation of the event or its queue
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_finished(&self) -> bool {
        self.status == EventStatus::Finished
    }

    /// Whether `now` falls inside the optional signup window (bounds inclusive)
    pub fn signup_window_contains(&self, now: DateTime<Utc>) -> bool {
        let opened = self.signup_opens.map_or(true, |opens| now >= opens);
        let not_closed = self.signup_deadline.map_or(true, |deadline| now <= deadline);
        opened && not_closed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub signup_list_mode: SignupListMode,
    pub max_performers: i32,
    pub performance_length: Option<i32>,
    pub signup_opens: Option<DateTime<Utc>>,
    pub signup_deadline: Option<DateTime<Utc>>,
}

/// Event row to be inserted by a store
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub host_id: i64,
    pub title: String,
    pub signup_list_mode: SignupListMode,
    pub max_performers: i32,
    pub performance_length: i32,
    pub signup_opens: Option<DateTime<Utc>>,
    pub signup_deadline: Option<DateTime<Utc>>,
}
