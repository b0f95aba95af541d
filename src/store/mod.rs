//! Persistence: the store traits the core runs against, the bundled local store,
//! write retries, and fixture-set persistence.

pub mod fixtures;
mod local;
mod retry;

pub use local::LocalStore;
pub use retry::RetryPolicy;

use crate::models::{
    ApprovalStatus, Fixture, FixtureId, Team, TeamId, Tournament, TournamentError, TournamentId,
};

/// Filtered reads over the three entity tables.
pub trait StoreRead {
    fn tournament(&self, id: TournamentId) -> Result<Tournament, TournamentError>;
    fn team(&self, id: TeamId) -> Result<Team, TournamentError>;
    fn fixture(&self, id: FixtureId) -> Result<Fixture, TournamentError>;
    /// Teams of a tournament, optionally filtered by approval status, in registration order.
    fn teams(
        &self,
        tournament_id: TournamentId,
        approval_status: Option<ApprovalStatus>,
    ) -> Result<Vec<Team>, TournamentError>;
    /// Fixtures of a tournament ordered by match number.
    fn fixtures(&self, tournament_id: TournamentId) -> Result<Vec<Fixture>, TournamentError>;
}

/// Writes inside a transaction. Nothing is visible to other readers until commit.
pub trait StoreTx: StoreRead {
    fn put_tournament(&mut self, tournament: Tournament) -> Result<(), TournamentError>;
    fn put_team(&mut self, team: Team) -> Result<(), TournamentError>;
    fn put_fixture(&mut self, fixture: Fixture) -> Result<(), TournamentError>;
    /// Insert new rows. Fails without writing anything if an id or a
    /// `(tournament_id, match_number)` pair already exists.
    fn insert_fixtures(&mut self, fixtures: Vec<Fixture>) -> Result<(), TournamentError>;
    /// Remove every fixture of a tournament; returns how many were removed.
    fn delete_fixtures(&mut self, tournament_id: TournamentId) -> Result<usize, TournamentError>;
}

/// A transactional store. Transactions on one store are serializable.
pub trait Store: Send + Sync {
    fn read<T, F>(&self, f: F) -> Result<T, TournamentError>
    where
        F: FnOnce(&dyn StoreRead) -> Result<T, TournamentError>;

    /// Run `f` and commit its writes only if it returns `Ok`. A failed commit surfaces as
    /// `TournamentError::Persistence` and leaves the store unchanged. A commit whose outcome
    /// is not known surfaces as `TournamentError::CommitUnknown`.
    fn transaction<T, F>(&self, f: F) -> Result<T, TournamentError>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, TournamentError>;
}
