//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod signup;
pub mod invite;

// Re-export commonly used models
pub use event::{Event, EventStatus, SignupListMode, CreateEventRequest, NewEvent};
pub use signup::{Signup, SignupStatus, Performer, SignupRequest, ManualPerformerRequest, NewSignup};
pub use invite::{Invite, InviteStatus, InviteDecision, InviteResponseDetails, NewInvite};
