//! Fixture-set persistence: one generation event is written as a single unit together with
//! the tournament's generation guard.
//!
//! These functions run inside a caller's transaction; the transaction is what makes them
//! all-or-nothing.

use crate::models::{
    Fixture, FixtureGenerationStatus, FixtureStatus, GenerationKey, Tournament, TournamentError,
    TournamentId,
};
use crate::store::{StoreRead, StoreTx};
use chrono::{DateTime, Utc};

/// Write `fixtures` as the tournament's fixture set and flip the guard `pending -> completed`.
///
/// Fails with `InvalidState` when the guard is not pending or fixture rows already exist, and
/// with `Validation` when the rows do not form one contiguous `1..=n` match sequence for this
/// tournament.
pub fn persist<T: StoreTx + ?Sized>(
    tx: &mut T,
    tournament: &mut Tournament,
    key: GenerationKey,
    fixtures: Vec<Fixture>,
    now: DateTime<Utc>,
) -> Result<Vec<Fixture>, TournamentError> {
    if fixtures.is_empty() {
        return Err(TournamentError::validation("fixture set is empty"));
    }
    if fixtures.iter().any(|f| f.tournament_id != tournament.id) {
        return Err(TournamentError::validation(
            "fixture belongs to another tournament",
        ));
    }
    let mut numbers: Vec<u32> = fixtures.iter().map(|f| f.match_number).collect();
    numbers.sort_unstable();
    if numbers.iter().copied().ne(1..=fixtures.len() as u32) {
        return Err(TournamentError::validation(
            "match numbers must run 1..n without gaps",
        ));
    }
    if !tx.fixtures(tournament.id)?.is_empty() {
        return Err(TournamentError::InvalidState);
    }

    tournament.mark_fixtures_generated(key, now)?;
    tx.put_tournament(tournament.clone())?;
    tx.insert_fixtures(fixtures)?;
    tx.fixtures(tournament.id)
}

/// The committed fixture set, if the generation guard was completed by this same request key.
/// A retry of a request whose commit went through but whose acknowledgement was lost lands
/// here instead of failing the guard.
pub fn replay<R: StoreRead + ?Sized>(
    tx: &R,
    tournament: &Tournament,
    key: GenerationKey,
) -> Result<Option<Vec<Fixture>>, TournamentError> {
    if tournament.fixture_generation_status == FixtureGenerationStatus::Completed
        && tournament.generation_key == Some(key)
    {
        return tx.fixtures(tournament.id).map(Some);
    }
    Ok(None)
}

/// Administrative reset: delete the fixture set and reopen the guard.
pub fn reset<T: StoreTx + ?Sized>(
    tx: &mut T,
    tournament: &mut Tournament,
) -> Result<usize, TournamentError> {
    tournament.reset_fixture_generation()?;
    let removed = tx.delete_fixtures(tournament.id)?;
    tx.put_tournament(tournament.clone())?;
    Ok(removed)
}

/// Mark every still-scheduled fixture of a tournament cancelled.
pub fn cancel_scheduled<T: StoreTx + ?Sized>(
    tx: &mut T,
    tournament_id: TournamentId,
) -> Result<usize, TournamentError> {
    let mut cancelled = 0;
    for mut fixture in tx.fixtures(tournament_id)? {
        if fixture.status == FixtureStatus::Scheduled {
            fixture.status = FixtureStatus::Cancelled;
            tx.put_fixture(fixture)?;
            cancelled += 1;
        }
    }
    Ok(cancelled)
}
