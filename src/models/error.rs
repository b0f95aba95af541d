//! TournamentError and the error taxonomy callers dispatch on.

use crate::models::team::{ApprovalStatus, TeamId};
use crate::models::tournament::TournamentFormat;
use crate::models::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Coarse error category: what a caller (or the HTTP layer) needs to decide how to react.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input: malformed enum, empty name, non-positive capacity.
    Validation,
    /// Acting user may not perform an organizer-only action.
    Authorization,
    /// A lifecycle guard refused the operation.
    State,
    NotFound,
    /// Transient store failure; the only retryable kind.
    Persistence,
}

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TournamentError {
    /// Input failed validation (message says which field).
    Validation(String),
    /// Acting user is not an organizer of this tournament.
    Unauthorized { user_id: UserId },
    /// Tournament is not in a state that allows this action.
    InvalidState,
    /// Team was already approved or rejected.
    AlreadyProcessed { team_id: TeamId, status: ApprovalStatus },
    /// Pending plus approved teams already fill the capacity.
    Full { teams_allowed: u32 },
    /// Registration deadline has passed or registration is no longer open.
    RegistrationClosed,
    /// Tournament was cancelled; nothing may change any more.
    Cancelled,
    /// Fewer than two approved teams.
    InsufficientTeams { approved: usize },
    /// Registration deadline is still in the future.
    RegistrationStillOpen { deadline: DateTime<Utc> },
    /// No pairing scheme exists for this format.
    UnsupportedFormat(TournamentFormat),
    /// Odd team count for a knockout round while byes are refused.
    OddTeamCount(usize),
    /// A team with this name is already registered (case-insensitive).
    DuplicateTeamName,
    /// Fixtures still waiting for a result.
    IncompleteResults { remaining: usize },
    TournamentNotFound,
    TeamNotFound,
    FixtureNotFound,
    /// Store failure before anything was written (lock poisoned, snapshot or commit failed).
    Persistence(String),
    /// The commit may have landed but its acknowledgement was lost.
    CommitUnknown(String),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        use TournamentError::*;
        match self {
            Validation(_) => ErrorKind::Validation,
            Unauthorized { .. } => ErrorKind::Authorization,
            InvalidState
            | AlreadyProcessed { .. }
            | Full { .. }
            | RegistrationClosed
            | Cancelled
            | InsufficientTeams { .. }
            | RegistrationStillOpen { .. }
            | UnsupportedFormat(_)
            | OddTeamCount(_)
            | DuplicateTeamName
            | IncompleteResults { .. } => ErrorKind::State,
            TournamentNotFound | TeamNotFound | FixtureNotFound => ErrorKind::NotFound,
            Persistence(_) | CommitUnknown(_) => ErrorKind::Persistence,
        }
    }

    /// Only store failures are worth retrying; every guard failure is final.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Persistence
    }

    /// True when the failed write is known not to have been applied, so running it again
    /// cannot apply it twice.
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, TournamentError::Persistence(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        TournamentError::Validation(msg.into())
    }
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            TournamentError::Unauthorized { .. } => {
                write!(f, "Only an organizer of this tournament can do that")
            }
            TournamentError::InvalidState => write!(f, "Invalid state for this action"),
            TournamentError::AlreadyProcessed { status, .. } => {
                write!(f, "Team has already been {}", status)
            }
            TournamentError::Full { teams_allowed } => {
                write!(f, "Tournament is full ({} teams allowed)", teams_allowed)
            }
            TournamentError::RegistrationClosed => write!(f, "Registration is closed"),
            TournamentError::Cancelled => write!(f, "Tournament has been cancelled"),
            TournamentError::InsufficientTeams { approved } => write!(
                f,
                "Need at least 2 approved teams to generate fixtures (have {})",
                approved
            ),
            TournamentError::RegistrationStillOpen { deadline } => write!(
                f,
                "Registration is open until {}",
                deadline.format("%Y-%m-%d %H:%M UTC")
            ),
            TournamentError::UnsupportedFormat(format) => {
                write!(f, "Fixture generation is not supported for {} tournaments", format)
            }
            TournamentError::OddTeamCount(n) => {
                write!(f, "Knockout needs an even number of teams (have {})", n)
            }
            TournamentError::DuplicateTeamName => {
                write!(f, "A team with this name is already registered")
            }
            TournamentError::IncompleteResults { remaining } => {
                write!(f, "{} fixture(s) still have no result", remaining)
            }
            TournamentError::TournamentNotFound => write!(f, "Tournament not found"),
            TournamentError::TeamNotFound => write!(f, "Team not found"),
            TournamentError::FixtureNotFound => write!(f, "Fixture not found"),
            TournamentError::Persistence(msg) => write!(f, "Storage error: {}", msg),
            TournamentError::CommitUnknown(msg) => {
                write!(f, "Storage error, the change may have been saved: {}", msg)
            }
        }
    }
}

impl std::error::Error for TournamentError {}

impl From<std::io::Error> for TournamentError {
    fn from(e: std::io::Error) -> Self {
        TournamentError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for TournamentError {
    fn from(e: serde_json::Error) -> Self {
        TournamentError::Persistence(e.to_string())
    }
}
