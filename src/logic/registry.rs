//! Team registration and the organizer approval workflow.

use crate::models::{ApprovalStatus, NewTeam, Team, TeamId, TournamentError, TournamentId};
use crate::service::{Actor, TournamentService};
use crate::store::{Store, StoreRead, StoreTx};

/// Approved, registered teams in pairing order: `created_at` ascending, ties broken by
/// registration number. The store's own ordering is not relied on.
pub(crate) fn approved_roster<R: StoreRead + ?Sized>(
    store: &R,
    tournament_id: TournamentId,
) -> Result<Vec<Team>, TournamentError> {
    let mut teams: Vec<Team> = store
        .teams(tournament_id, Some(ApprovalStatus::Approved))?
        .into_iter()
        .filter(Team::is_approved)
        .collect();
    teams.sort_by_key(|t| (t.created_at, t.registration_number));
    Ok(teams)
}

impl<S: Store> TournamentService<S> {
    /// Register a team. It starts pending and holds a place until rejected or withdrawn.
    pub fn register_team(
        &self,
        tournament_id: TournamentId,
        input: NewTeam,
    ) -> Result<Team, TournamentError> {
        let now = self.now();
        let team = self.write("register team", |tx| {
            let tournament = tx.tournament(tournament_id)?;
            tournament.ensure_registration_open(now)?;

            let existing = tx.teams(tournament_id, None)?;
            let places_taken = existing.iter().filter(|t| t.holds_place()).count();
            if places_taken >= tournament.teams_allowed as usize {
                return Err(TournamentError::Full {
                    teams_allowed: tournament.teams_allowed,
                });
            }

            let team = Team::new(
                tournament_id,
                &input.team_name,
                input.contact.clone(),
                existing.len() as u32 + 1,
                now,
            )?;
            let duplicate = existing
                .iter()
                .filter(|t| t.holds_place())
                .any(|t| t.team_name.eq_ignore_ascii_case(&team.team_name));
            if duplicate {
                return Err(TournamentError::DuplicateTeamName);
            }
            tx.put_team(team.clone())?;
            Ok(team)
        })?;
        log::info!(
            "Team '{}' registered for tournament {} (#{})",
            team.team_name,
            tournament_id,
            team.registration_number
        );
        Ok(team)
    }

    /// Organizer approves a pending team. The first decision wins; a second one gets
    /// `AlreadyProcessed`.
    pub fn approve_team(&self, actor: Actor, team_id: TeamId) -> Result<Team, TournamentError> {
        let now = self.now();
        let team = self.decide(actor, team_id, |team| team.approve(now))?;
        log::info!("Team {} approved for tournament {}", team.id, team.tournament_id);
        Ok(team)
    }

    /// Organizer rejects a pending team with a reason.
    pub fn reject_team(
        &self,
        actor: Actor,
        team_id: TeamId,
        reason: &str,
    ) -> Result<Team, TournamentError> {
        let now = self.now();
        let team = self.decide(actor, team_id, |team| team.reject(reason, now))?;
        log::info!("Team {} rejected for tournament {}", team.id, team.tournament_id);
        Ok(team)
    }

    /// Organizer withdraws a team; it stops holding a place and is never paired.
    pub fn withdraw_team(&self, actor: Actor, team_id: TeamId) -> Result<Team, TournamentError> {
        let team = self.decide(actor, team_id, Team::withdraw)?;
        log::info!("Team {} withdrawn from tournament {}", team.id, team.tournament_id);
        Ok(team)
    }

    fn decide<F>(&self, actor: Actor, team_id: TeamId, apply: F) -> Result<Team, TournamentError>
    where
        F: Fn(&mut Team) -> Result<(), TournamentError>,
    {
        self.write("update team", |tx: &mut dyn StoreTx| {
            let mut team = tx.team(team_id)?;
            let tournament = tx.tournament(team.tournament_id)?;
            self.authorize(&tournament, actor)?;
            tournament.ensure_roster_editable()?;
            apply(&mut team)?;
            tx.put_team(team.clone())?;
            Ok(team)
        })
    }

    /// All teams of a tournament in registration order, optionally filtered by approval status.
    pub fn list_teams(
        &self,
        tournament_id: TournamentId,
        approval_status: Option<ApprovalStatus>,
    ) -> Result<Vec<Team>, TournamentError> {
        self.store().read(|r| {
            r.tournament(tournament_id)?;
            r.teams(tournament_id, approval_status)
        })
    }

    /// Approved teams in the order pairing consumes them. Stable for the same data.
    pub fn list_approved_teams(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Team>, TournamentError> {
        self.store().read(|r| {
            r.tournament(tournament_id)?;
            approved_roster(r, tournament_id)
        })
    }
}
