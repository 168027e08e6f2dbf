//! Queue facts for external collaborators
//!
//! The engine does not deliver email or chat messages. It emits a
//! [`QueueFact`] after each committed change that someone outside may care
//! about, and a [`QueueNotifier`] decides where that goes.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use crate::models::InviteStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fact", rename_all = "snake_case")]
pub enum QueueFact {
    InviteCreated {
        invite_id: i64,
        event_id: i64,
        user_id: i64,
        invited_by: i64,
    },
    InviteResponded {
        invite_id: i64,
        event_id: i64,
        user_id: i64,
        status: InviteStatus,
    },
    EventStarted {
        event_id: i64,
    },
    EventFinished {
        event_id: i64,
    },
    PerformerSelected {
        event_id: i64,
        signup_id: i64,
    },
}

impl QueueFact {
    pub fn event_id(&self) -> i64 {
        match self {
            QueueFact::InviteCreated { event_id, .. }
            | QueueFact::InviteResponded { event_id, .. }
            | QueueFact::EventStarted { event_id }
            | QueueFact::EventFinished { event_id }
            | QueueFact::PerformerSelected { event_id, .. } => *event_id,
        }
    }
}

/// Receiver of committed queue facts. Must not block.
pub trait QueueNotifier: Send + Sync {
    fn notify(&self, fact: QueueFact);
}

/// Records facts in the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl QueueNotifier for TracingNotifier {
    fn notify(&self, fact: QueueFact) {
        match serde_json::to_string(&fact) {
            Ok(payload) => info!(event_id = fact.event_id(), payload = %payload, "Queue fact emitted"),
            Err(e) => warn!(event_id = fact.event_id(), error = %e, "Queue fact could not be serialized"),
        }
    }
}

/// Forwards facts to an unbounded channel, e.g. for a mailer task to drain
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<QueueFact>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueueFact>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl QueueNotifier for ChannelNotifier {
    fn notify(&self, fact: QueueFact) {
        let event_id = fact.event_id();
        if self.sender.send(fact).is_err() {
            warn!(event_id = event_id, "Queue fact dropped, receiver is gone");
        }
    }
}
