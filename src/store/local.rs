//! LocalStore: in-memory tables behind a mutex, optionally snapshotted to a JSON file.

use crate::models::{
    ApprovalStatus, Fixture, FixtureId, Team, TeamId, Tournament, TournamentError, TournamentId,
};
use crate::store::{Store, StoreRead, StoreTx};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// The full data set. Transactions work on a copy and swap it in on commit.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub tournaments: BTreeMap<TournamentId, Tournament>,
    pub teams: BTreeMap<TeamId, Team>,
    pub fixtures: BTreeMap<FixtureId, Fixture>,
}

impl StoreRead for Tables {
    fn tournament(&self, id: TournamentId) -> Result<Tournament, TournamentError> {
        self.tournaments
            .get(&id)
            .cloned()
            .ok_or(TournamentError::TournamentNotFound)
    }

    fn team(&self, id: TeamId) -> Result<Team, TournamentError> {
        self.teams.get(&id).cloned().ok_or(TournamentError::TeamNotFound)
    }

    fn fixture(&self, id: FixtureId) -> Result<Fixture, TournamentError> {
        self.fixtures
            .get(&id)
            .cloned()
            .ok_or(TournamentError::FixtureNotFound)
    }

    fn teams(
        &self,
        tournament_id: TournamentId,
        approval_status: Option<ApprovalStatus>,
    ) -> Result<Vec<Team>, TournamentError> {
        let mut teams: Vec<Team> = self
            .teams
            .values()
            .filter(|t| t.tournament_id == tournament_id)
            .filter(|t| approval_status.map_or(true, |s| t.approval_status == s))
            .cloned()
            .collect();
        teams.sort_by_key(|t| (t.created_at, t.registration_number));
        Ok(teams)
    }

    fn fixtures(&self, tournament_id: TournamentId) -> Result<Vec<Fixture>, TournamentError> {
        let mut fixtures: Vec<Fixture> = self
            .fixtures
            .values()
            .filter(|f| f.tournament_id == tournament_id)
            .cloned()
            .collect();
        fixtures.sort_by_key(|f| f.match_number);
        Ok(fixtures)
    }
}

impl StoreTx for Tables {
    fn put_tournament(&mut self, tournament: Tournament) -> Result<(), TournamentError> {
        self.tournaments.insert(tournament.id, tournament);
        Ok(())
    }

    fn put_team(&mut self, team: Team) -> Result<(), TournamentError> {
        if !self.tournaments.contains_key(&team.tournament_id) {
            return Err(TournamentError::TournamentNotFound);
        }
        self.teams.insert(team.id, team);
        Ok(())
    }

    fn put_fixture(&mut self, fixture: Fixture) -> Result<(), TournamentError> {
        if !self.fixtures.contains_key(&fixture.id) {
            return Err(TournamentError::FixtureNotFound);
        }
        self.fixtures.insert(fixture.id, fixture);
        Ok(())
    }

    fn insert_fixtures(&mut self, fixtures: Vec<Fixture>) -> Result<(), TournamentError> {
        let mut taken: HashSet<(TournamentId, u32)> = self
            .fixtures
            .values()
            .map(|f| (f.tournament_id, f.match_number))
            .collect();
        for f in &fixtures {
            if self.fixtures.contains_key(&f.id) || !taken.insert((f.tournament_id, f.match_number))
            {
                return Err(TournamentError::Validation(format!(
                    "fixture match number {} already exists",
                    f.match_number
                )));
            }
        }
        self.fixtures.extend(fixtures.into_iter().map(|f| (f.id, f)));
        Ok(())
    }

    fn delete_fixtures(&mut self, tournament_id: TournamentId) -> Result<usize, TournamentError> {
        let before = self.fixtures.len();
        self.fixtures.retain(|_, f| f.tournament_id != tournament_id);
        Ok(before - self.fixtures.len())
    }
}

/// The bundled store. Every transaction holds the lock from first read to commit, so
/// transactions are serializable.
#[derive(Debug, Default)]
pub struct LocalStore {
    tables: Mutex<Tables>,
    snapshot_path: Option<PathBuf>,
    failing_commits: AtomicUsize,
    lost_acks: AtomicUsize,
}

impl LocalStore {
    /// Empty store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store backed by a JSON snapshot file. Loads the file if it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TournamentError> {
        let path = path.into();
        let tables = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let tables: Tables = serde_json::from_slice(&bytes)?;
            log::info!(
                "Loaded {} tournament(s) from {}",
                tables.tournaments.len(),
                path.display()
            );
            tables
        } else {
            Tables::default()
        };
        Ok(Self {
            tables: Mutex::new(tables),
            snapshot_path: Some(path),
            ..Self::default()
        })
    }

    /// Make the next `n` commits fail before anything is written.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` commits succeed but report a failure, as when the acknowledgement of a
    /// remote write is lost.
    pub fn lose_next_acks(&self, n: usize) {
        self.lost_acks.store(n, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, TournamentError> {
        self.tables
            .lock()
            .map_err(|_| TournamentError::Persistence("store lock poisoned".to_string()))
    }

    fn write_snapshot(path: &Path, tables: &Tables) -> Result<(), TournamentError> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(tables)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Decrement `counter` if positive; true when it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl Store for LocalStore {
    fn read<T, F>(&self, f: F) -> Result<T, TournamentError>
    where
        F: FnOnce(&dyn StoreRead) -> Result<T, TournamentError>,
    {
        let guard = self.lock()?;
        f(&*guard)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, TournamentError>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, TournamentError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let out = f(&mut working)?;

        if take_one(&self.failing_commits) {
            return Err(TournamentError::Persistence("commit failed".to_string()));
        }
        if let Some(path) = &self.snapshot_path {
            Self::write_snapshot(path, &working)?;
        }
        *guard = working;
        if take_one(&self.lost_acks) {
            return Err(TournamentError::CommitUnknown(
                "commit acknowledgement lost".to_string(),
            ));
        }
        Ok(out)
    }
}
