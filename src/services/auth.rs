//! Principal and permission checks
//!
//! The engine never authenticates anyone. The host application resolves a
//! caller into a [`Principal`] and passes it into every operation; this
//! module only decides what that principal may do to a given event.

use std::collections::HashSet;
use tracing::debug;
use crate::models::{Event, Signup};
use crate::utils::errors::{MicNightError, Result};

/// The caller of an engine operation, as resolved by an external auth layer
pub trait Principal: Send + Sync {
    /// `None` for an anonymous caller
    fn user_id(&self) -> Option<i64>;

    /// Whether the caller hosts or co-hosts the given event
    fn is_host_or_cohost(&self, event_id: i64) -> bool;
}

/// Plain principal value built by the host application per request
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user_id: Option<i64>,
    pub managed_events: HashSet<i64>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            managed_events: HashSet::new(),
        }
    }

    /// Grant host/co-host authority over an event
    pub fn managing(mut self, event_id: i64) -> Self {
        self.managed_events.insert(event_id);
        self
    }
}

impl Principal for AuthContext {
    fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    fn is_host_or_cohost(&self, event_id: i64) -> bool {
        self.managed_events.contains(&event_id)
    }
}

/// Resolve the caller's user id or fail with `Unauthorized`
pub fn require_user(principal: &dyn Principal) -> Result<i64> {
    principal.user_id().ok_or(MicNightError::Unauthorized)
}

/// Whether the caller may manage the event. The host of record always can.
pub fn can_manage(principal: &dyn Principal, event: &Event) -> bool {
    match principal.user_id() {
        Some(user_id) => user_id == event.host_id || principal.is_host_or_cohost(event.id),
        None => false,
    }
}

/// Require host or co-host authority over the event
pub fn require_manager(principal: &dyn Principal, event: &Event) -> Result<i64> {
    let user_id = require_user(principal)?;
    if !can_manage(principal, event) {
        debug!(user_id = user_id, event_id = event.id, "Caller is not a host or co-host");
        return Err(MicNightError::forbidden(format!(
            "user {} does not host event {}",
            user_id, event.id
        )));
    }
    Ok(user_id)
}

/// Require that the caller owns the signup or manages its event
pub fn require_owner_or_manager(principal: &dyn Principal, event: &Event, signup: &Signup) -> Result<i64> {
    let user_id = require_user(principal)?;
    if signup.belongs_to(user_id) || can_manage(principal, event) {
        return Ok(user_id);
    }
    Err(MicNightError::forbidden(format!(
        "user {} may not change signup {}",
        user_id, signup.id
    )))
}
