//! Data structures for the tournament core: tournaments, teams, fixtures, errors.

mod error;
mod fixture;
mod team;
mod tournament;

pub use error::{ErrorKind, TournamentError};
pub use fixture::{Fixture, FixtureId, FixtureSpec, FixtureStatus, GenerationKey};
pub use team::{ApprovalStatus, Contact, NewTeam, Team, TeamId, TeamStatus};
pub use tournament::{
    FinalsFormat, FixtureGenerationStatus, NewTournament, Tournament, TournamentFormat,
    TournamentId, TournamentStatus,
};

/// Identifier of the acting user, supplied by the identity collaborator.
pub type UserId = uuid::Uuid;
