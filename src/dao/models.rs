use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    /// Open for sign-ups; kick-off has not happened yet.
    Scheduled,
    /// Kick-off time has passed and the match is being played.
    InProgress,
    /// The match has ended. Terminal.
    Completed,
    /// The creator called the match off. Terminal.
    Cancelled,
}

impl MatchStatus {
    /// Stable storage/wire representation of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in-progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

/// Who is allowed to discover and join a match. Enforced outside the core.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    /// Listed and open to anyone.
    #[default]
    Public,
    /// Reachable through an invite link.
    Invite,
    /// Visible to its members only.
    Private,
}

impl Visibility {
    /// Stable storage/wire representation of the visibility.
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Invite => "invite",
            Visibility::Private => "private",
        }
    }
}

/// Pitch position a roster member has been assigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// No position picked yet.
    #[default]
    Unassigned,
    /// In goal.
    Goalkeeper,
    /// Back line.
    Defender,
    /// Midfield.
    Midfielder,
    /// Up front.
    Forward,
}

impl Position {
    /// Stable storage/wire representation of the position.
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Unassigned => "unassigned",
            Position::Goalkeeper => "goalkeeper",
            Position::Defender => "defender",
            Position::Midfielder => "midfielder",
            Position::Forward => "forward",
        }
    }
}

/// Confirmed participant of a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntryEntity {
    /// Identifier of the user issued by the authentication provider.
    pub user_id: String,
    /// Whether the user confirmed their participation.
    pub confirmed: bool,
    /// Whether the user's share of the pitch fee was recorded as paid.
    pub has_paid: bool,
    /// Position assigned by the organizer.
    pub position: Position,
}

impl RosterEntryEntity {
    /// Fresh entry for a user entering the roster (directly or by promotion).
    pub fn confirmed(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            confirmed: true,
            has_paid: false,
            position: Position::Unassigned,
        }
    }
}

/// Waiting-list entry for a full match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntryEntity {
    /// Identifier of the queued user.
    pub user_id: String,
    /// When the user joined the queue; defines FIFO order.
    pub joined_at: SystemTime,
}

/// Match aggregate persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Display name of the match.
    pub title: String,
    /// User who organized the match; always part of the roster.
    pub creator_id: String,
    /// Target roster size, creator included.
    pub total_slots: u32,
    /// Cached roster size. Must equal `roster.len()` at rest.
    pub filled_slots: u32,
    /// Confirmed participants.
    pub roster: Vec<RosterEntryEntity>,
    /// Users waiting for a slot, oldest first.
    pub queue: Vec<QueueEntryEntity>,
    /// Current lifecycle status.
    pub status: MatchStatus,
    /// Join gating policy.
    pub visibility: Visibility,
    /// Kick-off instant.
    pub start_time: SystemTime,
    /// Per-match duration override; the configured default applies when absent.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the match document was patched.
    pub updated_at: SystemTime,
}

impl MatchEntity {
    /// Build the initial aggregate: creator on the roster, empty queue, scheduled.
    pub fn new(
        title: String,
        creator_id: String,
        total_slots: u32,
        visibility: Visibility,
        start_time: SystemTime,
        duration_minutes: Option<u32>,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            title,
            roster: vec![RosterEntryEntity::confirmed(creator_id.clone())],
            creator_id,
            total_slots,
            filled_slots: 1,
            queue: Vec::new(),
            status: MatchStatus::Scheduled,
            visibility,
            start_time,
            duration_minutes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the user holds a roster spot.
    pub fn has_member(&self, user_id: &str) -> bool {
        self.roster.iter().any(|entry| entry.user_id == user_id)
    }

    /// Whether the user is waiting in the queue.
    pub fn has_queued(&self, user_id: &str) -> bool {
        self.queue.iter().any(|entry| entry.user_id == user_id)
    }

    /// Slots left according to the cached counter.
    pub fn available_slots(&self) -> u32 {
        self.total_slots.saturating_sub(self.filled_slots)
    }

    /// Match duration, falling back to `default` when the match has no override.
    pub fn duration_or(&self, default: Duration) -> Duration {
        self.duration_minutes
            .map(|minutes| Duration::from_secs(u64::from(minutes) * 60))
            .unwrap_or(default)
    }

    /// Instant the match is expected to end.
    pub fn end_time(&self, default_duration: Duration) -> SystemTime {
        self.start_time + self.duration_or(default_duration)
    }
}

/// Sort order supported by [`MatchQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchSort {
    /// Earliest kick-off first.
    #[default]
    StartTimeAsc,
    /// Latest kick-off first.
    StartTimeDesc,
}

/// Filter and sort parameters for listing matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchQuery {
    /// Restrict to these statuses; `None` returns every match.
    pub statuses: Option<Vec<MatchStatus>>,
    /// Result ordering.
    pub sort: MatchSort,
}

impl MatchQuery {
    /// Every match, earliest kick-off first.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches in one of the given statuses, earliest kick-off first.
    pub fn with_statuses(statuses: Vec<MatchStatus>) -> Self {
        Self {
            statuses: Some(statuses),
            sort: MatchSort::StartTimeAsc,
        }
    }

    /// Whether an entity passes the status filter.
    pub fn matches(&self, entity: &MatchEntity) -> bool {
        self.statuses
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&entity.status))
    }

    /// Sort entities in place according to [`MatchQuery::sort`].
    pub fn sort_entities(&self, entities: &mut [MatchEntity]) {
        match self.sort {
            MatchSort::StartTimeAsc => entities.sort_by_key(|entity| entity.start_time),
            MatchSort::StartTimeDesc => {
                entities.sort_by_key(|entity| std::cmp::Reverse(entity.start_time))
            }
        }
    }
}
