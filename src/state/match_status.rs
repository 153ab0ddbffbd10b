use thiserror::Error;

use crate::dao::models::MatchStatus;

/// Events that move a match through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// Wall clock reached the kick-off time.
    Kickoff,
    /// Wall clock reached the end of the match.
    FinalWhistle,
    /// The creator called the match off.
    Cancel,
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the match was in when the event was received.
    pub from: MatchStatus,
    /// Event that cannot be applied from this status.
    pub event: MatchEvent,
}

/// Compute the status a match moves to when `event` happens.
///
/// Only forward moves exist: scheduled matches can kick off, finish (when
/// the whole window elapsed between two checks) or be cancelled; matches in
/// progress can only finish; completed and cancelled are absorbing.
pub fn transition(from: MatchStatus, event: MatchEvent) -> Result<MatchStatus, InvalidTransition> {
    let next = match (from, event) {
        (MatchStatus::Scheduled, MatchEvent::Kickoff) => MatchStatus::InProgress,
        (MatchStatus::Scheduled, MatchEvent::FinalWhistle) => MatchStatus::Completed,
        (MatchStatus::Scheduled, MatchEvent::Cancel) => MatchStatus::Cancelled,
        (MatchStatus::InProgress, MatchEvent::FinalWhistle) => MatchStatus::Completed,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}
