//! Tournament lifecycle: create, generate fixtures, start, record results, complete, cancel.
//!
//! Every state change runs in one store transaction, so the status flip and the rows it
//! describes commit together or not at all.

use crate::logic::pairing::generate_for_format;
use crate::logic::registry::approved_roster;
use crate::logic::schedule::{apply_schedule, ScheduleOptions};
use crate::models::{
    Fixture, FixtureId, FixtureStatus, GenerationKey, NewTournament, TeamId, Tournament,
    TournamentError, TournamentFormat, TournamentId, TournamentStatus,
};
use crate::service::{Actor, TournamentService};
use crate::store::{fixtures, Store};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to generate the fixture set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Overrides the tournament's format; recorded on the tournament when it differs.
    #[serde(default)]
    pub format: Option<TournamentFormat>,
    /// Retries of the same request must reuse the key.
    #[serde(default = "Uuid::new_v4")]
    pub key: GenerationKey,
    #[serde(default)]
    pub schedule: ScheduleOptions,
}

impl GenerationRequest {
    pub fn new(format: Option<TournamentFormat>) -> Self {
        Self {
            format,
            key: Uuid::new_v4(),
            schedule: ScheduleOptions::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: ScheduleOptions) -> Self {
        self.schedule = schedule;
        self
    }

    /// Parse a JSON request body. An empty body means "use the tournament's settings"; a body
    /// that does not parse is a validation error, never a silent fallback.
    pub fn from_body(body: &[u8]) -> Result<Self, TournamentError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new(None));
        }
        serde_json::from_slice(body)
            .map_err(|e| TournamentError::validation(format!("generation request: {}", e)))
    }
}

/// What a successful generation produced.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationOutcome {
    pub tournament: Tournament,
    pub fixtures: Vec<Fixture>,
    /// Team that sat out the knockout round, if any.
    pub bye: Option<TeamId>,
    /// True when this request had already been committed and the stored set was returned.
    pub replayed: bool,
}

fn bye_team(roster: &[TeamId], fixtures: &[Fixture]) -> Option<TeamId> {
    fixtures
        .iter()
        .find(|f| f.team_2_id.is_none())
        .map(|f| f.team_1_id)
        .or_else(|| {
            roster
                .iter()
                .copied()
                .find(|id| !fixtures.iter().any(|f| f.involves(*id)))
        })
}

impl<S: Store> TournamentService<S> {
    /// Create a tournament in (registration_open, pending), organized by `actor`.
    pub fn create_tournament(
        &self,
        actor: Actor,
        input: NewTournament,
    ) -> Result<Tournament, TournamentError> {
        let tournament = Tournament::new(actor.user_id, input, self.now())?;
        self.write("create tournament", |tx| {
            tx.put_tournament(tournament.clone())
        })?;
        log::info!(
            "Tournament {} '{}' created ({}, {} teams allowed)",
            tournament.id,
            tournament.name,
            tournament.format,
            tournament.teams_allowed
        );
        Ok(tournament)
    }

    /// Cancel with a reason. Terminal: every later mutation fails with `Cancelled`.
    /// Scheduled fixtures are cancelled in the same transaction.
    pub fn cancel_tournament(
        &self,
        actor: Actor,
        tournament_id: TournamentId,
        reason: &str,
    ) -> Result<Tournament, TournamentError> {
        let now = self.now();
        let (tournament, cancelled_fixtures) = self.write("cancel tournament", |tx| {
            let mut tournament = tx.tournament(tournament_id)?;
            self.authorize(&tournament, actor)?;
            tournament.cancel(reason, now)?;
            tx.put_tournament(tournament.clone())?;
            let cancelled_fixtures = fixtures::cancel_scheduled(tx, tournament_id)?;
            Ok((tournament, cancelled_fixtures))
        })?;
        log::info!(
            "Tournament {} cancelled ({} fixture(s) called off): {}",
            tournament_id,
            cancelled_fixtures,
            reason.trim()
        );
        Ok(tournament)
    }

    /// Generate and persist the fixture set, exactly once.
    ///
    /// Guards, in order: organizer, `Cancelled`, `InvalidState` (already generated),
    /// `InsufficientTeams`, `RegistrationStillOpen`, `UnsupportedFormat`. The guard check and the
    /// fixture write share one transaction, so two concurrent requests cannot both pass.
    pub fn request_fixture_generation(
        &self,
        actor: Actor,
        tournament_id: TournamentId,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, TournamentError> {
        let now = self.now();
        let bye_policy = self.bye_policy();
        let outcome = self.write_idempotent("generate fixtures", |tx| {
            let mut tournament = tx.tournament(tournament_id)?;
            self.authorize(&tournament, actor)?;
            tournament.ensure_not_cancelled()?;

            let roster: Vec<TeamId> = approved_roster(&*tx, tournament_id)?
                .iter()
                .map(|t| t.id)
                .collect();
            if let Some(persisted) = fixtures::replay(&*tx, &tournament, request.key)? {
                return Ok(GenerationOutcome {
                    bye: bye_team(&roster, &persisted),
                    tournament,
                    fixtures: persisted,
                    replayed: true,
                });
            }

            tournament.check_generation_allowed()?;
            if roster.len() < 2 {
                return Err(TournamentError::InsufficientTeams {
                    approved: roster.len(),
                });
            }
            tournament.check_registration_closed(now)?;

            let format = request.format.unwrap_or(tournament.format);
            let pairings = generate_for_format(format, &roster, bye_policy)?;
            let mut rows: Vec<Fixture> = pairings
                .fixtures
                .iter()
                .map(|spec| Fixture::from_spec(tournament_id, *spec))
                .collect();
            apply_schedule(&mut rows, &request.schedule, tournament.venue.as_deref())?;

            tournament.format = format;
            if request.schedule.finals_format.is_some() {
                tournament.finals_format = request.schedule.finals_format;
            }
            let persisted = fixtures::persist(tx, &mut tournament, request.key, rows, now)?;
            Ok(GenerationOutcome {
                tournament,
                fixtures: persisted,
                bye: pairings.bye,
                replayed: false,
            })
        })?;
        if outcome.replayed {
            log::info!(
                "Fixture generation for tournament {} replayed (key {})",
                tournament_id,
                request.key
            );
        } else {
            log::info!(
                "Generated {} fixture(s) for tournament {} ({})",
                outcome.fixtures.len(),
                tournament_id,
                outcome.tournament.format
            );
        }
        Ok(outcome)
    }

    /// Administrative reset: delete the fixture set and reopen generation. Only before play.
    pub fn reset_fixtures(
        &self,
        actor: Actor,
        tournament_id: TournamentId,
    ) -> Result<usize, TournamentError> {
        let removed = self.write("reset fixtures", |tx| {
            let mut tournament = tx.tournament(tournament_id)?;
            self.authorize(&tournament, actor)?;
            fixtures::reset(tx, &mut tournament)
        })?;
        log::warn!(
            "Fixtures of tournament {} reset ({} removed)",
            tournament_id,
            removed
        );
        Ok(removed)
    }

    /// fixtures_generated -> active.
    pub fn start_tournament(
        &self,
        actor: Actor,
        tournament_id: TournamentId,
    ) -> Result<Tournament, TournamentError> {
        let tournament = self.write("start tournament", |tx| {
            let mut tournament = tx.tournament(tournament_id)?;
            self.authorize(&tournament, actor)?;
            tournament.start()?;
            tx.put_tournament(tournament.clone())?;
            Ok(tournament)
        })?;
        log::info!("Tournament {} started", tournament_id);
        Ok(tournament)
    }

    /// Record the score of a scheduled fixture. Draws are refused in knockout tournaments.
    pub fn record_fixture_result(
        &self,
        actor: Actor,
        fixture_id: FixtureId,
        team_1_score: u32,
        team_2_score: u32,
    ) -> Result<Fixture, TournamentError> {
        self.write("record result", |tx| {
            let mut fixture = tx.fixture(fixture_id)?;
            let tournament = tx.tournament(fixture.tournament_id)?;
            self.authorize(&tournament, actor)?;
            tournament.ensure_not_cancelled()?;
            if tournament.tournament_status != TournamentStatus::Active {
                return Err(TournamentError::InvalidState);
            }
            let allow_draw = tournament.format != TournamentFormat::Knockout;
            fixture.record_result(team_1_score, team_2_score, allow_draw)?;
            tx.put_fixture(fixture.clone())?;
            Ok(fixture)
        })
    }

    /// active -> completed, once no fixture is still scheduled.
    pub fn complete_tournament(
        &self,
        actor: Actor,
        tournament_id: TournamentId,
    ) -> Result<Tournament, TournamentError> {
        let tournament = self.write("complete tournament", |tx| {
            let mut tournament = tx.tournament(tournament_id)?;
            self.authorize(&tournament, actor)?;
            tournament.complete()?;
            let remaining = tx
                .fixtures(tournament_id)?
                .iter()
                .filter(|f| f.status == FixtureStatus::Scheduled)
                .count();
            if remaining > 0 {
                return Err(TournamentError::IncompleteResults { remaining });
            }
            tx.put_tournament(tournament.clone())?;
            Ok(tournament)
        })?;
        log::info!("Tournament {} completed", tournament_id);
        Ok(tournament)
    }
}
