//! Event lifecycle: scheduled -> live -> finished

use chrono::Utc;
use tracing::info;
use crate::database::EventChanges;
use crate::models::{CreateEventRequest, Event, EventStatus, NewEvent};
use crate::services::auth::{self, Principal};
use crate::services::context::EngineContext;
use crate::services::notification::QueueFact;
use crate::services::queue::discipline_for;
use crate::utils::errors::{MicNightError, Result};
use crate::utils::logging::log_event_action;

#[derive(Clone)]
pub struct EventLifecycle {
    ctx: EngineContext,
}

impl EventLifecycle {
    /// Create the lifecycle service over the shared engine context
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Create a scheduled event hosted by the caller
    pub async fn create_event(&self, principal: &dyn Principal, request: CreateEventRequest) -> Result<Event> {
        let host_id = auth::require_user(principal)?;

        if request.title.trim().is_empty() {
            return Err(MicNightError::validation("event title is required"));
        }
        if request.max_performers < 1 {
            return Err(MicNightError::validation("max_performers must be at least 1"));
        }
        let performance_length = request
            .performance_length
            .unwrap_or(self.ctx.config.default_performance_length);
        self.ctx.validate_length(performance_length)?;
        if let (Some(opens), Some(deadline)) = (request.signup_opens, request.signup_deadline) {
            if opens > deadline {
                return Err(MicNightError::validation("signup window opens after its deadline"));
            }
        }

        let event = self
            .ctx
            .store
            .create_event(NewEvent {
                host_id,
                title: request.title.trim().to_string(),
                signup_list_mode: request.signup_list_mode,
                max_performers: request.max_performers,
                performance_length,
                signup_opens: request.signup_opens,
                signup_deadline: request.signup_deadline,
            })
            .await?;

        log_event_action(event.id, "create_event", Some(host_id), Some(event.signup_list_mode.as_str()));
        Ok(event)
    }

    /// Look up an event by id
    pub async fn get_event(&self, event_id: i64) -> Result<Event> {
        self.ctx.load_event(event_id).await
    }

    /// Take a scheduled event live, initializing its queue discipline
    pub async fn start(&self, event_id: i64, principal: &dyn Principal) -> Result<Event> {
        self.ctx
            .retry(event_id, "start_event", || self.try_start(event_id, principal))
            .await
    }

    async fn try_start(&self, event_id: i64, principal: &dyn Principal) -> Result<Event> {
        let mut aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_manager(principal, &aggregate.event)?;
        advance(&mut aggregate.event, EventStatus::Live)?;
        aggregate.event.started_at = Some(Utc::now());

        discipline_for(aggregate.event.signup_list_mode)
            .on_start(&mut aggregate.signups, self.ctx.random.as_ref());

        let committed = self.ctx.commit(aggregate.into_changes()).await?;

        info!(event_id = event_id, mode = %committed.event.signup_list_mode, "Event is live");
        log_event_action(event_id, "start_event", Some(user_id), None);
        self.ctx.emit(QueueFact::EventStarted { event_id });
        Ok(committed.event)
    }

    /// End a live event; its queue is read-only afterwards
    pub async fn finish(&self, event_id: i64, principal: &dyn Principal) -> Result<Event> {
        self.ctx
            .retry(event_id, "finish_event", || self.try_finish(event_id, principal))
            .await
    }

    async fn try_finish(&self, event_id: i64, principal: &dyn Principal) -> Result<Event> {
        let mut event = self.ctx.load_event(event_id).await?;
        let user_id = auth::require_manager(principal, &event)?;
        advance(&mut event, EventStatus::Finished)?;
        event.finished_at = Some(Utc::now());

        let committed = self.ctx.commit(EventChanges::new(event)).await?;

        log_event_action(event_id, "finish_event", Some(user_id), None);
        self.ctx.emit(QueueFact::EventFinished { event_id });
        Ok(committed.event)
    }
}

/// Move the event one step forward, refusing skips and reversals
fn advance(event: &mut Event, to: EventStatus) -> Result<()> {
    if event.status.next() != Some(to) {
        return Err(MicNightError::transition(event.status, to));
    }
    event.status = to;
    Ok(())
}
